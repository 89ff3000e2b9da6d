//! Positional argument binding for `$(name)` script commands.
//!
//! This is a textual rewrite, not a prepared-statement binding. Argument
//! values never enter the text, only `?N` references to them, but the
//! statement text itself is trusted as-is.

use tracing::debug;

use crate::value::Value;

/// Separates a statement from its argument clause.
pub const STATEMENT_TERMINATOR: char = ';';

/// Trailing directive telling the grid runner to yield the first cell's value.
pub const RETURN_DIRECTIVE: &str = "\treturn A1";

/// Rewrites `sql` so that its `?` placeholders are bound to positional args.
///
/// - With no args no binding clause is added.
/// - One trailing `;` is removed before binding.
/// - If the text still contains a `;`, the clause after it is taken to be an
///   explicit binding and left alone.
/// - Otherwise `;?1,?2,..,?n` is appended where
///   `n = min(args.len(), number of '?' in the text)`. Surplus args are
///   dropped without complaint.
///
/// The return directive is appended in every case.
pub fn bind(sql: &str, args: &[Value]) -> String {
    let mut cmd = sql.to_string();

    if !args.is_empty() {
        if let Some(stripped) = cmd.strip_suffix(STATEMENT_TERMINATOR) {
            cmd = stripped.trim().to_string();
        }

        if !cmd.contains(STATEMENT_TERMINATOR) {
            let placeholders = cmd.matches('?').count();
            let n = args.len().min(placeholders);
            if n < args.len() {
                debug!(
                    "Binding {} of {} args ({} placeholders)",
                    n,
                    args.len(),
                    placeholders
                );
            }
            for i in 1..=n {
                cmd.push(if i == 1 { STATEMENT_TERMINATOR } else { ',' });
                cmd.push('?');
                cmd.push_str(&i.to_string());
            }
        }
    }

    cmd.push_str(RETURN_DIRECTIVE);
    cmd
}
