//! SQLite-backed SQL executor.
//!
//! Runs statements through `sqlx` pools keyed by data source name. The
//! dispatcher is synchronous, so each executor owns a small tokio runtime and
//! blocks on it; do not call it from inside another runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, TypeInfo, ValueRef};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::command::is_sql;
use crate::config::{Config, DataSourceConfig};
use crate::error::{CellCmdError, Result};
use crate::exec::{Context, Cursor, Output, SqlExecutor};
use crate::value::Value;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// `SqlExecutor` over one or more sqlite data sources.
pub struct SqliteExecutor {
    runtime: Arc<Runtime>,
    pools: HashMap<String, SqlitePool>,
    default_source: String,
}

impl SqliteExecutor {
    /// Connects every data source in the configuration.
    pub fn connect(config: &Config) -> Result<Self> {
        Self::connect_sources(&config.default_data_source, &config.data_sources)
    }

    /// Connects the given data sources; `default_source` is used when the
    /// context names none.
    pub fn connect_sources(
        default_source: &str,
        sources: &HashMap<String, DataSourceConfig>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| CellCmdError::internal(format!("Failed to start runtime: {e}")))?;

        let mut pools = HashMap::with_capacity(sources.len());
        for (name, source) in sources {
            debug!(data_source = %name, url = %source.url, "Connecting data source");
            let pool = runtime
                .block_on(
                    SqlitePoolOptions::new()
                        .max_connections(source.max_connections)
                        // In-memory databases live only as long as their connection.
                        .idle_timeout(None)
                        .max_lifetime(None)
                        .connect(&source.url),
                )
                .map_err(|e| {
                    CellCmdError::sql(format!("Cannot open data source '{name}': {e}"))
                })?;
            pools.insert(name.clone(), pool);
        }

        Ok(Self {
            runtime: Arc::new(runtime),
            pools,
            default_source: default_source.to_string(),
        })
    }

    /// A single in-memory data source named `default`.
    pub fn in_memory() -> Result<Self> {
        let mut sources = HashMap::new();
        sources.insert("default".to_string(), DataSourceConfig::from_url("sqlite::memory:")?);
        Self::connect_sources("default", &sources)
    }

    fn pool_for(&self, ctx: &Context) -> Result<&SqlitePool> {
        let name = ctx.data_source().unwrap_or(&self.default_source);
        self.pools
            .get(name)
            .ok_or_else(|| CellCmdError::sql(format!("Unknown data source '{name}'")))
    }
}

impl SqlExecutor for SqliteExecutor {
    fn execute(&self, sql: &str, args: Option<&[Value]>, ctx: &mut Context) -> Result<Output> {
        let pool = self.pool_for(ctx)?.clone();
        let args = args.map(<[Value]>::to_vec).unwrap_or_default();

        if returns_rows(sql) {
            debug!(sql, "Opening cursor");
            return Ok(Output::Cursor(Box::new(SqlCursor {
                runtime: Arc::clone(&self.runtime),
                pool,
                sql: sql.to_string(),
                args,
                consumed: false,
            })));
        }

        debug!(sql, "Executing statement");
        let result = self.runtime.block_on(async {
            let query = bind_all(sqlx::query(sql), &args);
            tokio::time::timeout(
                Duration::from_secs(QUERY_TIMEOUT_SECS),
                query.execute(&pool),
            )
            .await
        });
        let done = result
            .map_err(|_| timeout_error())?
            .map_err(|e| CellCmdError::sql(format_query_error(e)))?;

        Ok(Output::Value(Value::Int(done.rows_affected() as i64)))
    }
}

/// A query that runs when first fetched.
struct SqlCursor {
    runtime: Arc<Runtime>,
    pool: SqlitePool,
    sql: String,
    args: Vec<Value>,
    consumed: bool,
}

impl Cursor for SqlCursor {
    /// Each row becomes a sequence of its column values.
    fn fetch_all(&mut self) -> Result<Vec<Value>> {
        if self.consumed {
            return Err(CellCmdError::cursor("cursor already consumed"));
        }
        self.consumed = true;

        let result = self.runtime.block_on(async {
            let query = bind_all(sqlx::query(&self.sql), &self.args);
            tokio::time::timeout(
                Duration::from_secs(QUERY_TIMEOUT_SECS),
                query
                    .fetch(&self.pool)
                    .map_ok(|row| convert_row(&row))
                    .try_collect::<Vec<Value>>(),
            )
            .await
        });

        result
            .map_err(|_| timeout_error())?
            .map_err(|e| CellCmdError::cursor(format_query_error(e)))
    }
}

/// Returns true if the statement produces rows.
///
/// Uses the SQLite dialect parser; text it cannot parse falls back to the
/// `select`/`with` keyword test.
pub fn returns_rows(sql: &str) -> bool {
    match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) if !statements.is_empty() => statements
            .iter()
            .all(|statement| matches!(statement, Statement::Query(_))),
        _ => is_sql(sql),
    }
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_all<'q>(mut query: SqliteQuery<'q>, args: &[Value]) -> SqliteQuery<'q> {
    for arg in args {
        query = bind_value(query, arg);
    }
    query
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Sequence(_) => query.bind(value.to_display_string()),
    }
}

fn convert_row(row: &SqliteRow) -> Value {
    Value::Sequence((0..row.len()).map(|i| convert_value(row, i)).collect())
}

fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" => row.try_get::<i64, _>(index).map(Value::Int),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(index).map(Value::Float),
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}

fn timeout_error() -> CellCmdError {
    CellCmdError::sql(format!(
        "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
    ))
}

/// Formats a driver error, keeping the database's own message when present.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => {
            let mut result = String::from("ERROR: ");
            result.push_str(db_error.message());
            if let Some(code) = db_error.code() {
                result.push_str(" (code ");
                result.push_str(&code);
                result.push(')');
            }
            result
        }
        None => error.to_string(),
    }
}
