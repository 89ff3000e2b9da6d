//! Conversion of a grid program back into dispatcher command text.
//!
//! A single cell is ambiguous between a whole statement and an expression, so
//! a 1x1 program is converted by looking at the cell's kind. Any larger
//! program is always a script block and becomes `=` followed by its grid text.

use super::{Cell, CellKind, GridProgram};
use crate::command::{COLUMN_SEPARATOR, EXPRESSION_MARKER, ROW_SEPARATOR, SUPPRESS_MARKER};

/// Helper invoked for `name(args)` cells: runs the named script with the
/// given arguments.
pub const SCRIPT_CALL_FUNCTION: &str = "jdbccall";

/// Converts a program into the command text the classifier consumes.
///
/// Returns `None` when there is nothing to execute (a single note or blank
/// cell, or an empty program).
pub fn to_command(program: &GridProgram) -> Option<String> {
    if program.row_count() == 0 || program.col_count() == 0 {
        return None;
    }

    if !program.is_single_cell() {
        return Some(format!("{EXPRESSION_MARKER}{}", to_text(program)));
    }

    let cell = program.cell(1, 1)?;
    match cell.kind {
        CellKind::Constant | CellKind::Command => Some(single_statement(cell)),
        CellKind::Note | CellKind::NoteBlock | CellKind::Blank => None,
        CellKind::Calculable | CellKind::CalculableBlock => {
            Some(format!("{EXPRESSION_MARKER}{}", cell.text))
        }
        CellKind::Executable | CellKind::ExecutableBlock => {
            Some(format!("{SUPPRESS_MARKER}{}", cell.text))
        }
    }
}

/// Renders the program in native grid text: rows separated by line breaks,
/// columns by tabs, each cell with its kind marker.
///
/// Constants are written as-is; see [`Cell::constant`] for the text that
/// does not survive a re-parse.
pub fn to_text(program: &GridProgram) -> String {
    program
        .rows()
        .map(|row| {
            row.iter()
                .map(Cell::source)
                .collect::<Vec<_>>()
                .join(&COLUMN_SEPARATOR.to_string())
        })
        .collect::<Vec<_>>()
        .join(&ROW_SEPARATOR.to_string())
}

fn single_statement(cell: &Cell) -> String {
    let text = cell.text.trim();

    // `$...` is already a complete command.
    if text.starts_with('$') {
        return cell.text.clone();
    }

    // `name(args)` runs a script file.
    if let Some(open) = text.find('(') {
        if open > 0 && text.ends_with(')') {
            let name = &text[..open];
            let args = &text[open + 1..text.len() - 1];
            let args = if args.is_empty() {
                String::new()
            } else {
                format!(",{args}")
            };
            return format!("{SCRIPT_CALL_FUNCTION}({}{args})", quote(name));
        }
    }

    format!("{EXPRESSION_MARKER}{}", cell.text)
}

/// Wraps `s` in double quotes, escaping backslashes and quotes.
fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
