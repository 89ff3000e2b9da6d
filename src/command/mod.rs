//! Command text handling: unescaping, classification and argument binding.
//!
//! Everything here is a pure function of its input. Nothing is executed.

pub mod binder;
pub mod classify;
pub mod unescape;

pub use binder::{bind, RETURN_DIRECTIVE};
pub use classify::{
    classify, closing_paren, is_command, is_grid, is_sql, Command, CommandClassifier, CommandShape,
    ScriptForm, COLUMN_SEPARATOR, EXPRESSION_MARKER, ROW_SEPARATOR, SUPPRESS_MARKER, TARGET_MARKER,
};
pub use unescape::{unescape, EscapeStyle, Unescaper};
