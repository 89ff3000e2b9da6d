//! Command execution: context, dispatch and result normalisation.

pub mod context;
pub mod dispatcher;
pub mod host;
pub mod mock;
pub mod output;

pub use context::{ArgScope, ArgumentStack, Context, DataSourceScope};
pub use dispatcher::{Dispatcher, ExpressionEvaluator, GridOutcome, GridRunner, SqlExecutor};
pub use host::{host_script_to_program, split_host_params};
pub use mock::{ArithmeticEvaluator, SimpleGridRunner};
pub use output::{normalize, Cursor, Output, ResultSets};
