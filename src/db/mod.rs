//! Database layer for cellcmd.
//!
//! SQL commands reach a database only through the
//! [`SqlExecutor`](crate::exec::SqlExecutor) trait; this module provides the
//! sqlite implementation used by the command line.

mod sqlite;

pub use sqlite::{returns_rows, SqliteExecutor};
