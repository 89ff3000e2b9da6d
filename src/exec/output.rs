//! Raw execution outputs and their normalisation.
//!
//! Collaborators may hand back a plain value, a sequence of result-sets, or
//! an open cursor. [`normalize`] collapses all of them to a plain value so
//! that nothing lazy or stateful leaves the dispatcher.

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::value::Value;

/// A lazy, stateful result handle.
pub trait Cursor {
    /// Drains every remaining row into memory.
    fn fetch_all(&mut self) -> Result<Vec<Value>>;
}

/// A sequence of outputs produced one after another.
pub trait ResultSets {
    fn has_next_result(&self) -> bool;

    /// Takes the next output, or `None` once the sequence is exhausted.
    fn next_result(&mut self) -> Result<Option<Output>>;
}

/// What a collaborator returned, before normalisation.
pub enum Output {
    Value(Value),
    ResultSets(Box<dyn ResultSets>),
    Cursor(Box<dyn Cursor>),
}

impl Output {
    /// Returns the plain value, if this output is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Output::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Value(value)
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Output::ResultSets(_) => f.write_str("ResultSets(..)"),
            Output::Cursor(_) => f.write_str("Cursor(..)"),
        }
    }
}

/// Collapses a raw output into a value.
///
/// Result-sets yield their first element, normalised in turn; an empty
/// sequence yields no value. Cursors are fetched completely. Fetch errors are
/// returned as-is and no partial rows are kept.
pub fn normalize(raw: Option<Output>) -> Result<Option<Value>> {
    match raw {
        None => Ok(None),
        Some(Output::Value(value)) => Ok(Some(value)),
        Some(Output::ResultSets(mut sets)) => {
            if !sets.has_next_result() {
                debug!("Result-set sequence is empty");
                return Ok(None);
            }
            normalize(sets.next_result()?)
        }
        Some(Output::Cursor(mut cursor)) => {
            let rows = cursor.fetch_all()?;
            debug!(rows = rows.len(), "Materialised cursor");
            Ok(Some(Value::Sequence(rows)))
        }
    }
}
