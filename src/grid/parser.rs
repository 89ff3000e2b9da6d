//! Parsing of native grid text into a [`GridProgram`].
//!
//! Rows are separated by line breaks, columns by horizontal tabs. The kind of
//! each cell is inferred from how its text starts:
//!
//! - empty → blank
//! - `//` → note block, `/` → note
//! - `==` → calculable block, `=` → calculable
//! - `>>` → executable block, `>` → executable
//! - a command keyword or a `$(` selector → command
//! - anything else → constant

use super::{Cell, CellKind, GridProgram};
use crate::command::{is_command, COLUMN_SEPARATOR, ROW_SEPARATOR};
use crate::error::Result;

/// Turns grid text into a program.
pub trait GridParser {
    fn parse(&self, text: &str) -> Result<GridProgram>;
}

/// Parser for the native tab/newline grid text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextGridParser;

impl GridParser for TextGridParser {
    fn parse(&self, text: &str) -> Result<GridProgram> {
        let rows = text
            .split(ROW_SEPARATOR)
            .map(|line| {
                line.strip_suffix('\r')
                    .unwrap_or(line)
                    .split(COLUMN_SEPARATOR)
                    .map(parse_cell)
                    .collect()
            })
            .collect();
        Ok(GridProgram::from_rows(rows))
    }
}

/// Infers a cell's kind from its source text.
pub fn parse_cell(source: &str) -> Cell {
    const MARKERS: &[(&str, CellKind)] = &[
        ("//", CellKind::NoteBlock),
        ("/", CellKind::Note),
        ("==", CellKind::CalculableBlock),
        ("=", CellKind::Calculable),
        (">>", CellKind::ExecutableBlock),
        (">", CellKind::Executable),
    ];

    if source.is_empty() {
        return Cell::blank();
    }

    for (marker, kind) in MARKERS {
        if let Some(rest) = source.strip_prefix(marker) {
            return Cell::new(*kind, rest);
        }
    }

    if is_command(source) {
        Cell::command(source)
    } else {
        Cell::constant(source)
    }
}
