//! In-process expression evaluator and grid runner.
//!
//! Small stand-ins for a full scripting engine, good enough to drive the
//! dispatcher from the command line and in tests.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::context::{Context, DataSourceScope};
use super::dispatcher::{ExpressionEvaluator, GridOutcome, GridRunner, SqlExecutor};
use super::output::{normalize, Output, ResultSets};
use crate::command::{closing_paren, TARGET_MARKER};
use crate::error::{CellCmdError, Result};
use crate::grid::{cell_name, CellKind, GridProgram};
use crate::value::Value;

/// Arithmetic over integers, floats and strings.
///
/// Supports `+ - * /`, parentheses, unary minus, double-quoted strings
/// (`+` concatenates), `true`/`false`/`null`, `?N` argument references and
/// names looked up in the local bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticEvaluator;

impl ExpressionEvaluator for ArithmeticEvaluator {
    fn evaluate(
        &self,
        expr: &str,
        args: &[Value],
        locals: Option<&HashMap<String, Value>>,
        ctx: &mut Context,
    ) -> Result<Value> {
        let mut parser = ExprParser {
            chars: expr.chars().collect(),
            pos: 0,
            args,
            locals,
            ctx,
        };
        let value = parser.expr()?;
        parser.skip_ws();
        if let Some(c) = parser.peek() {
            return Err(CellCmdError::expression(format!(
                "unexpected '{c}' at offset {} in '{expr}'",
                parser.pos
            )));
        }
        Ok(value)
    }
}

struct ExprParser<'a> {
    chars: Vec<char>,
    pos: usize,
    args: &'a [Value],
    locals: Option<&'a HashMap<String, Value>>,
    ctx: &'a Context,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Value> {
        let mut left = self.term()?;
        loop {
            if self.eat('+') {
                left = add(left, self.term()?)?;
            } else if self.eat('-') {
                left = arith(left, self.term()?, '-')?;
            } else {
                return Ok(left);
            }
        }
    }

    fn term(&mut self) -> Result<Value> {
        let mut left = self.unary()?;
        loop {
            if self.eat('*') {
                left = arith(left, self.unary()?, '*')?;
            } else if self.eat('/') {
                left = arith(left, self.unary()?, '/')?;
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<Value> {
        if self.eat('-') {
            return match self.unary()? {
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| CellCmdError::expression(format!("integer overflow in -{i}"))),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(CellCmdError::expression(format!("cannot negate {other}"))),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            None => Err(CellCmdError::expression("unexpected end of expression")),
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if !self.eat(')') {
                    return Err(CellCmdError::expression("missing ')'"));
                }
                Ok(value)
            }
            Some('"') => self.string(),
            Some('?') => {
                self.pos += 1;
                let digits = self.take_while(|c| c.is_ascii_digit());
                let index: usize = digits
                    .parse()
                    .map_err(|_| CellCmdError::expression("expected argument number after '?'"))?;
                self.arg(index)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
                self.name(&name)
            }
            Some(c) => Err(CellCmdError::expression(format!(
                "unexpected '{c}' at offset {}",
                self.pos
            ))),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn number(&mut self) -> Result<Value> {
        let text = self.take_while(|c| c.is_ascii_digit() || c == '.');
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| CellCmdError::expression(format!("invalid number '{text}'")))
    }

    fn string(&mut self) -> Result<Value> {
        self.pos += 1;
        let mut s = String::new();
        loop {
            match self.peek() {
                None => return Err(CellCmdError::expression("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        s.push(c);
                        self.pos += 1;
                    }
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(Value::String(s));
                }
                Some(c) => {
                    s.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// `?N` reads the explicit args first, then the innermost stack frame.
    fn arg(&self, index: usize) -> Result<Value> {
        let from_args = index.checked_sub(1).and_then(|i| self.args.get(i));
        from_args
            .or_else(|| self.ctx.args().get(index))
            .cloned()
            .ok_or_else(|| CellCmdError::expression(format!("argument ?{index} is not bound")))
    }

    fn name(&self, name: &str) -> Result<Value> {
        match name {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" => return Ok(Value::Null),
            _ => {}
        }
        self.locals
            .and_then(|locals| locals.get(name))
            .cloned()
            .ok_or_else(|| CellCmdError::expression(format!("unknown name '{name}'")))
    }
}

fn add(left: Value, right: Value) -> Result<Value> {
    match (left, right) {
        (Value::String(a), b) => Ok(Value::String(a + &b.to_display_string())),
        (a, Value::String(b)) => Ok(Value::String(a.to_display_string() + &b)),
        (a, b) => arith(a, b, '+'),
    }
}

fn arith(left: Value, right: Value, op: char) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(a, b, op),
        (Value::Int(a), Value::Float(b)) => float_op(a as f64, b, op),
        (Value::Float(a), Value::Int(b)) => float_op(a, b as f64, op),
        (Value::Float(a), Value::Float(b)) => float_op(a, b, op),
        (a, b) => Err(CellCmdError::expression(format!(
            "cannot apply '{op}' to {a} and {b}"
        ))),
    }
}

fn int_op(a: i64, b: i64, op: char) -> Result<Value> {
    let overflow = || CellCmdError::expression(format!("integer overflow in {a} {op} {b}"));
    match op {
        '+' => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        '-' => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        '*' => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        _ => {
            if b == 0 {
                return Err(CellCmdError::expression("division by zero"));
            }
            match a.checked_rem(b).ok_or_else(overflow)? {
                0 => a.checked_div(b).map(Value::Int).ok_or_else(overflow),
                _ => Ok(Value::Float(a as f64 / b as f64)),
            }
        }
    }
}

fn float_op(a: f64, b: f64, op: char) -> Result<Value> {
    match op {
        '+' => Ok(Value::Float(a + b)),
        '-' => Ok(Value::Float(a - b)),
        '*' => Ok(Value::Float(a * b)),
        _ if b == 0.0 => Err(CellCmdError::expression("division by zero")),
        _ => Ok(Value::Float(a / b)),
    }
}

/// Runs a grid row by row, left to right.
///
/// Constants and calculable cells store their value under the cell name so
/// later cells can refer to them. Command cells understand:
///
/// - `return <expr>`: yield a result and stop
/// - `result <expr>`: yield a result and keep going
/// - `$(name)sql;arg,..` or `$sql;arg,..`: run SQL, storing its value in the
///   cell
pub struct SimpleGridRunner<'a> {
    evaluator: &'a dyn ExpressionEvaluator,
    sql: Option<&'a dyn SqlExecutor>,
}

impl<'a> SimpleGridRunner<'a> {
    pub fn new(evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self {
            evaluator,
            sql: None,
        }
    }

    /// Enables SQL command cells.
    pub fn with_sql(mut self, sql: &'a dyn SqlExecutor) -> Self {
        self.sql = Some(sql);
        self
    }

    fn run_command(
        &self,
        text: &str,
        name: &str,
        state: &mut RunState,
        ctx: &mut Context,
    ) -> Result<Step> {
        let text = text.trim();
        if text.starts_with(TARGET_MARKER) {
            let value = self.run_sql_cell(text, name, state, ctx)?;
            state.values.insert(name.to_string(), value);
            return Ok(Step::Continue);
        }

        let (keyword, rest) = text
            .split_once(char::is_whitespace)
            .map_or((text, ""), |(k, r)| (k, r.trim()));

        match keyword {
            "return" if rest.is_empty() => Ok(Step::Stop),
            "return" => {
                let value = self.eval(rest, state, ctx)?;
                state.results.push_back(Output::Value(value));
                Ok(Step::Stop)
            }
            "result" => {
                let value = self.eval(rest, state, ctx)?;
                state.results.push_back(Output::Value(value));
                Ok(Step::Continue)
            }
            other => Err(CellCmdError::grid(format!(
                "unsupported command '{other}' in {name}"
            ))),
        }
    }

    fn run_sql_cell(
        &self,
        text: &str,
        name: &str,
        state: &RunState,
        ctx: &mut Context,
    ) -> Result<Value> {
        let Some(sql) = self.sql else {
            return Err(CellCmdError::grid(format!(
                "{name}: no SQL executor for '{text}'"
            )));
        };

        let rest = text.trim_start_matches(TARGET_MARKER).trim_start();
        let (target, body) = match rest.strip_prefix('(') {
            Some(inner) => {
                let close = closing_paren(inner)
                    .ok_or_else(|| CellCmdError::grid(format!("{name}: unterminated '$('")))?;
                (inner[..close].trim(), inner[close + 1..].trim())
            }
            None => ("", rest),
        };

        let (statement, arg_clause) = match body.rsplit_once(';') {
            Some((statement, clause)) => (statement.trim(), clause.trim()),
            None => (body, ""),
        };

        let mut args = Vec::new();
        for expr in arg_clause.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            args.push(self.eval(expr, state, ctx)?);
        }
        let args = if args.is_empty() {
            None
        } else {
            Some(args.as_slice())
        };

        debug!(cell = name, target, "Running SQL cell");
        let output = if target.is_empty() {
            sql.execute(statement, args, ctx)?
        } else {
            let mut scope = DataSourceScope::enter(ctx, target);
            sql.execute(statement, args, &mut scope)?
        };
        Ok(normalize(Some(output))?.unwrap_or_default())
    }

    fn eval(&self, expr: &str, state: &RunState, ctx: &mut Context) -> Result<Value> {
        let args = ctx.current_args().to_vec();
        self.evaluator
            .evaluate(expr, &args, Some(&state.values), ctx)
    }
}

impl GridRunner for SimpleGridRunner<'_> {
    fn run(&self, program: &GridProgram, ctx: &mut Context) -> Result<Box<dyn GridOutcome>> {
        let mut state = RunState::default();

        'rows: for (r, row) in program.rows().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let name = cell_name(r + 1, c + 1);
                match cell.kind {
                    CellKind::Blank | CellKind::Note | CellKind::NoteBlock => {}
                    CellKind::Constant => {
                        state
                            .values
                            .insert(name, Value::parse_literal(&cell.text));
                    }
                    CellKind::Calculable | CellKind::CalculableBlock => {
                        let value = self.eval(&cell.text, &state, ctx)?;
                        state.values.insert(name, value);
                    }
                    CellKind::Executable | CellKind::ExecutableBlock => {
                        self.eval(&cell.text, &state, ctx)?;
                    }
                    CellKind::Command => {
                        if let Step::Stop = self.run_command(&cell.text, &name, &mut state, ctx)? {
                            break 'rows;
                        }
                    }
                }
            }
        }

        Ok(Box::new(state))
    }
}

enum Step {
    Continue,
    Stop,
}

/// Cell values and queued results of one run.
#[derive(Default)]
struct RunState {
    values: HashMap<String, Value>,
    results: VecDeque<Output>,
}

impl ResultSets for RunState {
    fn has_next_result(&self) -> bool {
        !self.results.is_empty()
    }

    fn next_result(&mut self) -> Result<Option<Output>> {
        Ok(self.results.pop_front())
    }
}

impl GridOutcome for RunState {
    fn cell_value(&self, row: usize, col: usize) -> Option<Value> {
        self.values.get(&cell_name(row, col)).cloned()
    }
}
