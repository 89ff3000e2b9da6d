//! Grid serializer round-trip tests.
//!
//! A program converted to command text must classify back into the shape
//! that runs it.

use cellcmd::command::{classify, CommandShape};
use cellcmd::exec::{ArithmeticEvaluator, Context, Dispatcher, SimpleGridRunner};
use cellcmd::grid::{to_command, to_text, Cell, CellKind, GridParser, GridProgram, TextGridParser};
use cellcmd::value::Value;

fn execute(text: &str) -> Option<Value> {
    let evaluator = ArithmeticEvaluator;
    let runner = SimpleGridRunner::new(&evaluator);
    let sql = cellcmd::db::SqliteExecutor::in_memory().unwrap();
    let dispatcher = Dispatcher::new(&sql, &evaluator, &runner);
    dispatcher.execute(text, &[], &mut Context::new()).unwrap()
}

#[test]
fn test_single_calculable_round_trip() {
    let program = GridProgram::single(Cell::calculable("1+2"));
    let command = to_command(&program).unwrap();
    assert_eq!(command, "=1+2");

    let classified = classify(&command).unwrap();
    assert_eq!(classified.shape, CommandShape::SingleExpression);
    assert_eq!(execute(&command), Some(Value::Int(3)));
}

#[test]
fn test_constant_grid_round_trip() {
    let program = GridProgram::from_constants(&[vec!["1", "2"], vec!["3", "4"]]);
    let command = to_command(&program).unwrap();
    assert_eq!(command, "=1\t2\n3\t4");

    let classified = classify(&command).unwrap();
    assert_eq!(classified.shape, CommandShape::GridScript);

    let reparsed = TextGridParser.parse(&classified.text).unwrap();
    assert_eq!(reparsed, program);
}

#[test]
fn test_mixed_grid_text_round_trip() {
    let text = "=1\t/note\n>>1+1\t\nreturn A1\t==A1*2";
    let program = TextGridParser.parse(text).unwrap();
    assert_eq!(program.cell(2, 1).map(|c| c.kind), Some(CellKind::ExecutableBlock));
    assert_eq!(to_text(&program), text);

    let command = to_command(&program).unwrap();
    assert_eq!(classify(&command).unwrap().shape, CommandShape::GridScript);
    assert_eq!(execute(&command), Some(Value::Int(1)));
}

#[test]
fn test_single_sql_cell_round_trip() {
    let program = TextGridParser.parse("$(sales)select * from orders").unwrap();
    let command = to_command(&program).unwrap();
    assert_eq!(command, "$(sales)select * from orders");
    assert_eq!(
        classify(&command).unwrap().shape,
        CommandShape::DbPrefixedSql {
            target: "sales".to_string()
        }
    );
}

#[test]
fn test_single_executable_round_trip() {
    let program = GridProgram::single(Cell::executable("1+1"));
    let command = to_command(&program).unwrap();
    assert_eq!(
        classify(&command).unwrap().shape,
        CommandShape::SuppressedExpression
    );
    assert_eq!(execute(&command), None);
}

#[test]
fn test_note_has_no_command() {
    let program = TextGridParser.parse("/just a note").unwrap();
    assert_eq!(to_command(&program), None);
}
