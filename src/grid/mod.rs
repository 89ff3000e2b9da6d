//! Grid programs: rectangular arrays of typed cells forming one script.
//!
//! Cells are addressed 1-based by `(row, col)`; `A1` names row 1, column 1.

pub mod parser;
pub mod serializer;

pub use parser::{GridParser, TextGridParser};
pub use serializer::{to_command, to_text, SCRIPT_CALL_FUNCTION};

use serde::{Deserialize, Serialize};

/// The type tag of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// A literal value.
    Constant,
    /// A structured command (`if`, `for`, `return`, `$(db)sql`, ...).
    Command,
    /// A single-cell note.
    Note,
    /// A note covering a block.
    NoteBlock,
    /// An empty cell.
    Blank,
    /// An expression whose value is kept in the cell.
    Calculable,
    /// A calculable block.
    CalculableBlock,
    /// An expression evaluated for its effect.
    Executable,
    /// An executable block.
    ExecutableBlock,
}

impl CellKind {
    /// Returns true for cells whose value can be read back after a run.
    pub fn is_calculable(&self) -> bool {
        matches!(self, Self::Calculable | Self::CalculableBlock)
    }

    /// The marker that introduces this kind in grid text.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Constant | Self::Command | Self::Blank => "",
            Self::Note => "/",
            Self::NoteBlock => "//",
            Self::Calculable => "=",
            Self::CalculableBlock => "==",
            Self::Executable => ">",
            Self::ExecutableBlock => ">>",
        }
    }
}

/// A single grid cell: a kind plus its payload without the kind marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub text: String,
}

impl Cell {
    /// Creates a cell of the given kind.
    pub fn new(kind: CellKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn blank() -> Self {
        Self::new(CellKind::Blank, "")
    }

    /// Grid text has no escape for constants, so `text` must not start with a
    /// kind marker (`=`, `/`, `>`), a command keyword or `$(`. Such a constant
    /// reads back as that other kind.
    pub fn constant(text: impl Into<String>) -> Self {
        Self::new(CellKind::Constant, text)
    }

    pub fn command(text: impl Into<String>) -> Self {
        Self::new(CellKind::Command, text)
    }

    pub fn calculable(text: impl Into<String>) -> Self {
        Self::new(CellKind::Calculable, text)
    }

    pub fn executable(text: impl Into<String>) -> Self {
        Self::new(CellKind::Executable, text)
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self::new(CellKind::Note, text)
    }

    /// The cell as written in grid text, marker included.
    pub fn source(&self) -> String {
        if self.kind == CellKind::Blank {
            return String::new();
        }
        format!("{}{}", self.kind.marker(), self.text)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

/// A rectangular grid program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridProgram {
    rows: Vec<Vec<Cell>>,
    col_count: usize,
}

impl GridProgram {
    /// Builds a program from rows, padding short rows with blank cells.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize_with(col_count, Cell::blank);
                row
            })
            .collect();
        Self { rows, col_count }
    }

    /// Builds an all-constant program from text values.
    pub fn from_constants<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|s| Cell::constant(s.as_ref())).collect())
                .collect(),
        )
    }

    /// A 1x1 program.
    pub fn single(cell: Cell) -> Self {
        Self::from_rows(vec![vec![cell]])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Returns the cell at 1-based `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row.checked_sub(1)?)?.get(col.checked_sub(1)?)
    }

    /// Iterates rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Returns true if the program is exactly one row by one column.
    pub fn is_single_cell(&self) -> bool {
        self.row_count() == 1 && self.col_count() == 1
    }

    /// Finds the last calculable cell scanning from the last row up and from
    /// right to left within a row.
    pub fn last_calculable(&self) -> Option<(usize, usize)> {
        for r in (1..=self.row_count()).rev() {
            for c in (1..=self.col_count()).rev() {
                if self.cell(r, c).is_some_and(|cell| cell.kind.is_calculable()) {
                    return Some((r, c));
                }
            }
        }
        None
    }
}

/// Returns the A1-style name of 1-based `(row, col)`.
pub fn cell_name(row: usize, col: usize) -> String {
    let mut letters = String::new();
    let mut n = col.saturating_sub(1);
    loop {
        letters.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    format!("{letters}{row}")
}
