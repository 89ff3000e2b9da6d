//! SQL execution through the dispatcher against in-memory sqlite databases.

use std::collections::HashMap;

use cellcmd::config::{Config, DataSourceConfig};
use cellcmd::db::SqliteExecutor;
use cellcmd::error::CellCmdError;
use cellcmd::exec::{ArithmeticEvaluator, Context, Dispatcher, SimpleGridRunner};
use cellcmd::value::Value;

/// Two independent in-memory data sources, `main` (default) and `sales`.
fn two_sources() -> SqliteExecutor {
    let toml = r#"
default_data_source = "main"

[data_sources.main]
url = "sqlite::memory:"

[data_sources.sales]
url = "sqlite::memory:"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    SqliteExecutor::connect(&config).unwrap()
}

fn run(
    sql: &SqliteExecutor,
    text: &str,
    args: &[Value],
    ctx: &mut Context,
) -> cellcmd::error::Result<Option<Value>> {
    let evaluator = ArithmeticEvaluator;
    let runner = SimpleGridRunner::new(&evaluator).with_sql(sql);
    Dispatcher::new(sql, &evaluator, &runner).execute(text, args, ctx)
}

fn rows(values: &[&[i64]]) -> Option<Value> {
    Some(Value::Sequence(
        values
            .iter()
            .map(|row| Value::Sequence(row.iter().copied().map(Value::Int).collect()))
            .collect(),
    ))
}

#[test]
fn test_raw_sql_select() {
    let sql = two_sources();
    let mut ctx = Context::new();
    let value = run(&sql, "select 1, 2", &[], &mut ctx).unwrap();
    assert_eq!(value, rows(&[&[1, 2]]));
}

#[test]
fn test_raw_sql_with_args() {
    let sql = two_sources();
    let mut ctx = Context::new();
    let value = run(&sql, "select ? + ?", &[Value::Int(2), Value::Int(3)], &mut ctx).unwrap();
    assert_eq!(value, rows(&[&[5]]));
}

#[test]
fn test_empty_target_runs_statement() {
    let sql = two_sources();
    let mut ctx = Context::new();
    let value = run(&sql, "$() create table t (n integer)", &[], &mut ctx).unwrap();
    assert_eq!(value, Some(Value::Int(0)));
}

#[test]
fn test_db_prefixed_sql_targets_named_source() {
    let sql = two_sources();
    let mut ctx = Context::new();

    let mut sales = Context::with_data_source("sales");
    run(&sql, "$() create table orders (id integer)", &[], &mut sales).unwrap();
    run(&sql, "$() insert into orders values (7)", &[], &mut sales).unwrap();

    let value = run(&sql, "$(sales) select id from orders", &[], &mut ctx).unwrap();
    assert_eq!(value, rows(&[&[7]]));
    assert_eq!(ctx.data_source(), None);

    // The default source has no such table.
    let err = run(&sql, "select id from orders", &[], &mut ctx).unwrap_err();
    assert!(matches!(err, CellCmdError::Cursor(_)));
}

#[test]
fn test_db_prefixed_script_binds_args() {
    let sql = two_sources();
    let mut sales = Context::with_data_source("sales");
    run(&sql, "$() create table t (x integer)", &[], &mut sales).unwrap();
    run(&sql, "$() insert into t values (1), (2)", &[], &mut sales).unwrap();

    let mut ctx = Context::new();
    let updated = run(
        &sql,
        "$(sales)update t set x=? where x=?",
        &[Value::Int(10), Value::Int(1)],
        &mut ctx,
    )
    .unwrap();
    assert_eq!(updated, Some(Value::Int(1)));
    assert_eq!(ctx.args().depth(), 0);
    assert_eq!(ctx.data_source(), None);

    let value = run(&sql, "$(sales) select x from t order by x", &[], &mut ctx).unwrap();
    assert_eq!(value, rows(&[&[2], &[10]]));
}

#[test]
fn test_grid_sql_cell_under_target() {
    let sql = two_sources();
    let mut sales = Context::with_data_source("sales");
    run(&sql, "$() create table t (x integer)", &[], &mut sales).unwrap();
    run(&sql, "$() insert into t values (4)", &[], &mut sales).unwrap();

    let mut ctx = Context::new();
    let value = run(
        &sql,
        "=$(sales)select x * ? from t;?1\treturn A1",
        &[Value::Int(3)],
        &mut ctx,
    )
    .unwrap();
    assert_eq!(value, rows(&[&[12]]));
}

#[test]
fn test_unknown_target() {
    let sql = two_sources();
    let err = run(&sql, "$(nowhere) select 1", &[], &mut Context::new()).unwrap_err();
    assert_eq!(err, CellCmdError::sql("Unknown data source 'nowhere'"));
}

#[test]
fn test_connect_rejects_bad_source() {
    let mut sources = HashMap::new();
    sources.insert(
        "broken".to_string(),
        DataSourceConfig {
            url: "sqlite:///nonexistent-dir/for/cellcmd/test.db".to_string(),
            max_connections: 1,
        },
    );
    assert!(SqliteExecutor::connect_sources("broken", &sources).is_err());
}

#[test]
fn test_file_source_persists_across_executors() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("data.db").display());
    let mut sources = HashMap::new();
    sources.insert("disk".to_string(), DataSourceConfig::from_url(&url).unwrap());

    {
        let sql = SqliteExecutor::connect_sources("disk", &sources).unwrap();
        let mut ctx = Context::new();
        run(&sql, "$() create table kept (n integer)", &[], &mut ctx).unwrap();
        run(&sql, "$() insert into kept values (9)", &[], &mut ctx).unwrap();
    }

    let sql = SqliteExecutor::connect_sources("disk", &sources).unwrap();
    let value = run(&sql, "select n from kept", &[], &mut Context::new()).unwrap();
    assert_eq!(value, rows(&[&[9]]));
}
