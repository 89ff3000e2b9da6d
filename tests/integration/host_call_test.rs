//! Host-document call tests.

use cellcmd::db::SqliteExecutor;
use cellcmd::exec::{ArithmeticEvaluator, Context, Dispatcher, SimpleGridRunner, SqlExecutor};
use cellcmd::value::Value;

fn call(params: &[Value]) -> cellcmd::error::Result<Option<Value>> {
    let sql = SqliteExecutor::in_memory()?;
    call_with(&sql, params, &mut Context::new())
}

fn call_with(
    sql: &SqliteExecutor,
    params: &[Value],
    ctx: &mut Context,
) -> cellcmd::error::Result<Option<Value>> {
    let evaluator = ArithmeticEvaluator;
    let runner = SimpleGridRunner::new(&evaluator).with_sql(sql);
    let dispatcher = Dispatcher::new(sql, &evaluator, &runner);
    dispatcher.execute_host_call(params, ctx)
}

#[test]
fn test_empty_params_is_no_value() {
    assert_eq!(call(&[]).unwrap(), None);
}

#[test]
fn test_expression_with_trailing_args() {
    let value = call(&[Value::from("=?1*2"), Value::Int(21)]).unwrap();
    assert_eq!(value, Some(Value::Int(42)));
}

#[test]
fn test_continued_script() {
    let value = call(&[
        Value::from("=1+\\"),
        Value::from("2+\\"),
        Value::from("3"),
    ])
    .unwrap();
    assert_eq!(value, Some(Value::Int(6)));
}

#[test]
fn test_call_form_is_not_supported_by_inprocess_evaluator() {
    let err = call(&[Value::from("report(1)")]).unwrap_err();
    assert!(matches!(
        err,
        cellcmd::error::CellCmdError::Expression(_)
    ));
}

#[test]
fn test_multi_cell_script_with_args() {
    let value = call(&[Value::from("=?1\treturn A1+?2"), Value::Int(1), Value::Int(2)]).unwrap();
    assert_eq!(value, Some(Value::Int(3)));
}

#[test]
fn test_note_script_is_no_value() {
    assert_eq!(call(&[Value::from("/remark")]).unwrap(), None);
}

#[test]
fn test_sql_script_is_materialised() {
    let sql = SqliteExecutor::in_memory().unwrap();
    let mut ctx = Context::new();
    sql.execute("create table t (n integer)", None, &mut ctx)
        .unwrap();
    sql.execute("insert into t values (1), (2)", None, &mut ctx)
        .unwrap();

    let value = call_with(&sql, &[Value::from("$select n from t order by n")], &mut ctx).unwrap();
    assert_eq!(
        value,
        Some(Value::Sequence(vec![
            Value::Sequence(vec![Value::Int(1)]),
            Value::Sequence(vec![Value::Int(2)]),
        ]))
    );
}
