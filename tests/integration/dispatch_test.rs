//! End-to-end dispatch tests.
//!
//! Runs commands through the dispatcher with the in-process evaluator and
//! grid runner.

use cellcmd::command::{bind, classify, CommandShape};
use cellcmd::error::CellCmdError;
use cellcmd::exec::{
    ArithmeticEvaluator, Context, Cursor, Dispatcher, ExpressionEvaluator, Output,
    SimpleGridRunner, SqlExecutor,
};
use cellcmd::value::Value;
use std::cell::Cell;

/// SQL stand-in whose cursor refuses a second fetch.
struct CursorSql;

struct OnceCursor {
    fetched: bool,
}

impl Cursor for OnceCursor {
    fn fetch_all(&mut self) -> cellcmd::error::Result<Vec<Value>> {
        if self.fetched {
            return Err(CellCmdError::cursor("fetched twice"));
        }
        self.fetched = true;
        Ok(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    }
}

impl SqlExecutor for CursorSql {
    fn execute(
        &self,
        _sql: &str,
        _args: Option<&[Value]>,
        _ctx: &mut Context,
    ) -> cellcmd::error::Result<Output> {
        Ok(Output::Cursor(Box::new(OnceCursor { fetched: false })))
    }
}

/// Counts evaluations so suppressed commands can be checked for side effects.
struct CountingEvaluator {
    calls: Cell<usize>,
}

impl ExpressionEvaluator for CountingEvaluator {
    fn evaluate(
        &self,
        expr: &str,
        args: &[Value],
        locals: Option<&std::collections::HashMap<String, Value>>,
        ctx: &mut Context,
    ) -> cellcmd::error::Result<Value> {
        self.calls.set(self.calls.get() + 1);
        ArithmeticEvaluator.evaluate(expr, args, locals, ctx)
    }
}

fn run(text: &str, args: &[Value]) -> cellcmd::error::Result<Option<Value>> {
    let evaluator = ArithmeticEvaluator;
    let runner = SimpleGridRunner::new(&evaluator);
    let dispatcher = Dispatcher::new(&CursorSql, &evaluator, &runner);
    dispatcher.execute(text, args, &mut Context::new())
}

#[test]
fn test_single_expression() {
    assert_eq!(run("=1+2", &[]).unwrap(), Some(Value::Int(3)));
    assert_eq!(run("2*3", &[]).unwrap(), Some(Value::Int(6)));
}

#[test]
fn test_expression_with_args() {
    assert_eq!(
        run("=?1*?2", &[Value::Int(6), Value::Int(7)]).unwrap(),
        Some(Value::Int(42))
    );
}

#[test]
fn test_suppressed_returns_nothing_but_evaluates() {
    let evaluator = CountingEvaluator {
        calls: Cell::new(0),
    };
    let runner = SimpleGridRunner::new(&evaluator);
    let dispatcher = Dispatcher::new(&CursorSql, &evaluator, &runner);
    let value = dispatcher
        .execute(">1+2", &[], &mut Context::new())
        .unwrap();
    assert_eq!(value, None);
    assert_eq!(evaluator.calls.get(), 1);
}

#[test]
fn test_blank_is_noop() {
    assert_eq!(run("", &[]).unwrap(), None);
    assert_eq!(run(" \t ", &[]).unwrap(), None);
}

#[test]
fn test_grid_fallback_to_only_calculable_cell() {
    // A1 is the only calculable cell; the rest of the 2x2 grid is blank.
    let value = run("==6*7\t\n\t", &[]).unwrap();
    assert_eq!(value, Some(Value::Int(42)));
}

#[test]
fn test_grid_fallback_scans_last_row_first() {
    let value = run("=1\t=2\n=3\t", &[]).unwrap();
    assert_eq!(value, Some(Value::Int(3)));
}

#[test]
fn test_grid_explicit_result_wins() {
    let value = run("=5\t=A1*2\nreturn B1+1\t=0", &[]).unwrap();
    assert_eq!(value, Some(Value::Int(11)));
}

#[test]
fn test_grid_first_of_several_results() {
    let value = run("=result 1\nresult 2", &[]).unwrap();
    assert_eq!(value, Some(Value::Int(1)));
}

#[test]
fn test_grid_args_visible_and_popped() {
    let evaluator = ArithmeticEvaluator;
    let runner = SimpleGridRunner::new(&evaluator);
    let dispatcher = Dispatcher::new(&CursorSql, &evaluator, &runner);
    let mut ctx = Context::new();

    let value = dispatcher
        .execute("==?1+1\t=A1*?2", &[Value::Int(1), Value::Int(10)], &mut ctx)
        .unwrap();
    assert_eq!(value, Some(Value::Int(20)));
    assert_eq!(ctx.args().depth(), 0);
}

#[test]
fn test_grid_error_propagates_and_pops() {
    let evaluator = ArithmeticEvaluator;
    let runner = SimpleGridRunner::new(&evaluator);
    let dispatcher = Dispatcher::new(&CursorSql, &evaluator, &runner);
    let mut ctx = Context::new();

    let err = dispatcher
        .execute("=1\t=1/0", &[Value::Int(1)], &mut ctx)
        .unwrap_err();
    assert_eq!(err, CellCmdError::expression("division by zero"));
    assert_eq!(ctx.args().depth(), 0);
}

#[test]
fn test_expression_error_is_unchanged() {
    let err = run("=1+", &[]).unwrap_err();
    assert!(matches!(err, CellCmdError::Expression(_)));
}

#[test]
fn test_integer_overflow_is_an_expression_error() {
    let err = run("=(0-9223372036854775807-1)/-1", &[]).unwrap_err();
    assert!(matches!(err, CellCmdError::Expression(_)));
}

#[test]
fn test_sql_cursor_is_materialised_exactly_once() {
    let value = run("select * from numbers", &[]).unwrap();
    assert_eq!(
        value,
        Some(Value::Sequence(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3)
        ]))
    );
}

#[test]
fn test_classification_properties() {
    assert_eq!(classify("select 1").unwrap().shape, CommandShape::RawSql);
    assert_eq!(
        classify("selecta").unwrap().shape,
        CommandShape::SingleExpression
    );
    assert_eq!(
        classify("with x as (select 1) select * from x").unwrap().shape,
        CommandShape::RawSql
    );
    assert_eq!(
        classify("=a+b").unwrap().shape,
        CommandShape::SingleExpression
    );
    assert_eq!(classify("=a\tb\nc").unwrap().shape, CommandShape::GridScript);
}

#[test]
fn test_bind_never_exceeds_placeholders() {
    assert_eq!(
        bind("update t set x=?", &[Value::Int(5)]),
        "update t set x=?;?1\treturn A1"
    );
    // Documented quirk: surplus arguments are dropped silently.
    assert_eq!(
        bind("update t set x=?", &[Value::Int(5), Value::Int(6)]),
        "update t set x=?;?1\treturn A1"
    );
}
