//! Error types for cellcmd.
//!
//! Collaborators (SQL executor, expression evaluator, grid runner, cursors)
//! report failures through [`CellCmdError`]; the dispatcher passes them back
//! to the caller untouched.

use thiserror::Error;

/// Main error type for cellcmd operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellCmdError {
    /// SQL execution errors (syntax errors, unknown data source, driver failures).
    #[error("SQL error: {0}")]
    Sql(String),

    /// Expression evaluation errors (malformed expression, bad argument reference).
    #[error("Expression error: {0}")]
    Expression(String),

    /// Grid program errors (unparseable program, unsupported command cell).
    #[error("Grid error: {0}")]
    Grid(String),

    /// Cursor materialization errors.
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// Configuration errors (invalid config file, bad data source URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CellCmdError {
    /// Creates a SQL error with the given message.
    pub fn sql(msg: impl Into<String>) -> Self {
        Self::Sql(msg.into())
    }

    /// Creates an expression error with the given message.
    pub fn expression(msg: impl Into<String>) -> Self {
        Self::Expression(msg.into())
    }

    /// Creates a grid error with the given message.
    pub fn grid(msg: impl Into<String>) -> Self {
        Self::Grid(msg.into())
    }

    /// Creates a cursor error with the given message.
    pub fn cursor(msg: impl Into<String>) -> Self {
        Self::Cursor(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Sql(_) => "SQL Error",
            Self::Expression(_) => "Expression Error",
            Self::Grid(_) => "Grid Error",
            Self::Cursor(_) => "Cursor Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using CellCmdError.
pub type Result<T> = std::result::Result<T, CellCmdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_sql() {
        let err = CellCmdError::sql("no such table: orders");
        assert_eq!(err.to_string(), "SQL error: no such table: orders");
        assert_eq!(err.category(), "SQL Error");
    }

    #[test]
    fn test_error_display_expression() {
        let err = CellCmdError::expression("unexpected token ')'");
        assert_eq!(err.to_string(), "Expression error: unexpected token ')'");
        assert_eq!(err.category(), "Expression Error");
    }

    #[test]
    fn test_error_display_grid() {
        let err = CellCmdError::grid("unsupported command cell B2");
        assert_eq!(err.to_string(), "Grid error: unsupported command cell B2");
        assert_eq!(err.category(), "Grid Error");
    }

    #[test]
    fn test_error_display_cursor() {
        let err = CellCmdError::cursor("cursor already consumed");
        assert_eq!(err.to_string(), "Cursor error: cursor already consumed");
        assert_eq!(err.category(), "Cursor Error");
    }

    #[test]
    fn test_error_display_config() {
        let err = CellCmdError::config("missing field 'url' in data_sources.sales");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing field 'url' in data_sources.sales"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_internal() {
        let err = CellCmdError::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
        assert_eq!(err.category(), "Internal Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CellCmdError>();
    }
}
