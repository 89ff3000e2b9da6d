//! Routing of classified commands to their execution strategy.
//!
//! Each [`CommandShape`] maps to exactly one of three collaborators: the SQL
//! executor, the expression evaluator or the grid runner. Collaborator errors
//! are passed through untouched.

use std::collections::HashMap;

use tracing::debug;

use super::context::{ArgScope, Context, DataSourceScope};
use super::output::{normalize, Output, ResultSets};
use crate::command::{bind, Command, CommandClassifier, CommandShape, ScriptForm, TARGET_MARKER};
use crate::error::Result;
use crate::grid::{GridParser, GridProgram, TextGridParser};
use crate::value::Value;

/// Runs SQL against the context's active data source.
pub trait SqlExecutor {
    /// `args` is `None` when the caller supplied no arguments.
    fn execute(&self, sql: &str, args: Option<&[Value]>, ctx: &mut Context) -> Result<Output>;
}

/// Evaluates a single expression.
pub trait ExpressionEvaluator {
    fn evaluate(
        &self,
        expr: &str,
        args: &[Value],
        locals: Option<&HashMap<String, Value>>,
        ctx: &mut Context,
    ) -> Result<Value>;
}

/// What a finished grid run leaves behind.
///
/// Explicit results are drawn down through [`ResultSets`]; computed cell
/// values stay readable afterwards.
pub trait GridOutcome: ResultSets {
    /// The computed value of the cell at 1-based `(row, col)`.
    fn cell_value(&self, row: usize, col: usize) -> Option<Value>;
}

/// Runs a grid program to completion.
pub trait GridRunner {
    fn run(&self, program: &GridProgram, ctx: &mut Context) -> Result<Box<dyn GridOutcome>>;
}

/// Classifies command text and routes it to a collaborator.
pub struct Dispatcher<'a> {
    classifier: CommandClassifier,
    sql: &'a dyn SqlExecutor,
    evaluator: &'a dyn ExpressionEvaluator,
    parser: &'a dyn GridParser,
    runner: &'a dyn GridRunner,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher using the console escape convention and the
    /// native grid text parser.
    pub fn new(
        sql: &'a dyn SqlExecutor,
        evaluator: &'a dyn ExpressionEvaluator,
        runner: &'a dyn GridRunner,
    ) -> Self {
        Self {
            classifier: CommandClassifier::new(),
            sql,
            evaluator,
            parser: &TextGridParser,
            runner,
        }
    }

    pub fn with_classifier(mut self, classifier: CommandClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_parser(mut self, parser: &'a dyn GridParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn classifier(&self) -> &CommandClassifier {
        &self.classifier
    }

    pub(crate) fn parser(&self) -> &dyn GridParser {
        self.parser
    }

    /// Classifies, runs and normalises `text`.
    ///
    /// Blank input and `>` commands return `Ok(None)`.
    pub fn execute(&self, text: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>> {
        self.execute_with(&self.classifier, text, args, ctx)
    }

    /// Like [`execute`](Self::execute) but hands back the raw output, which
    /// may still be a cursor or a result-set sequence.
    pub fn execute_raw(
        &self,
        text: &str,
        args: &[Value],
        ctx: &mut Context,
    ) -> Result<Option<Output>> {
        match self.classifier.classify(text) {
            Some(command) => self.dispatch(&command, args, ctx),
            None => Ok(None),
        }
    }

    pub(crate) fn execute_with(
        &self,
        classifier: &CommandClassifier,
        text: &str,
        args: &[Value],
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let Some(command) = classifier.classify(text) else {
            debug!("Blank command, nothing to run");
            return Ok(None);
        };
        normalize(self.dispatch(&command, args, ctx)?)
    }

    /// Runs an already classified command.
    pub fn dispatch(
        &self,
        command: &Command,
        args: &[Value],
        ctx: &mut Context,
    ) -> Result<Option<Output>> {
        debug!(
            shape = %command.shape,
            data_source = ?command.shape.target(),
            args = args.len(),
            "Dispatching command"
        );

        match &command.shape {
            CommandShape::SuppressedExpression | CommandShape::SingleExpression => {
                let value = self.evaluator.evaluate(&command.text, args, None, ctx)?;
                if command.shape.discards_value() {
                    return Ok(None);
                }
                Ok(Some(Output::Value(value)))
            }
            CommandShape::GridScript => self.run_grid(&command.text, args, ctx),
            CommandShape::RawSql => self.run_sql(&command.text, args, ctx).map(Some),
            CommandShape::DbPrefixedSql { target } => {
                let mut scope = DataSourceScope::enter(ctx, target);
                self.run_sql(&command.text, args, &mut scope).map(Some)
            }
            CommandShape::DbPrefixedScript { target, form } => {
                let mut scope = DataSourceScope::enter(ctx, target);
                match form {
                    ScriptForm::Grid => self.run_grid(&command.text, args, &mut scope),
                    ScriptForm::Single => {
                        let full = format!("{TARGET_MARKER}({target}){}", command.text);
                        let bound = bind(&full, args);
                        self.run_grid(&bound, args, &mut scope)
                    }
                }
            }
        }
    }

    fn run_sql(&self, sql: &str, args: &[Value], ctx: &mut Context) -> Result<Output> {
        let sql = sql.trim();
        let args = if args.is_empty() { None } else { Some(args) };
        self.sql.execute(sql, args, ctx)
    }

    /// Parses and runs a grid script with `args` pushed for the duration.
    ///
    /// The first explicit result wins. Without one, the value of the last
    /// calculable cell is returned, scanning rows bottom-up and each row
    /// right to left.
    fn run_grid(&self, text: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Output>> {
        let program = self.parser.parse(text)?;
        let mut scope = ArgScope::push(ctx, args);
        let mut outcome = self.runner.run(&program, &mut scope)?;

        if outcome.has_next_result() {
            return outcome.next_result();
        }

        let Some((row, col)) = program.last_calculable() else {
            debug!("Grid produced no result and has no calculable cell");
            return Ok(None);
        };
        Ok(outcome.cell_value(row, col).map(Output::Value))
    }
}
