//! Entry point for scripts called from a host document.
//!
//! A host formula passes the script and its arguments as one flat parameter
//! list. Long scripts may be split across several parameters, each piece but
//! the last ending in a `\` continuation mark.

use tracing::debug;

use super::context::Context;
use super::dispatcher::Dispatcher;
use crate::command::{CommandClassifier, Unescaper};
use crate::error::Result;
use crate::grid::{to_command, GridParser, GridProgram};
use crate::value::Value;

/// Marks a script parameter that continues in the next parameter.
pub const CONTINUATION_MARK: char = '\\';

/// Splits host parameters into the script text and its positional args.
pub fn split_host_params(params: &[Value]) -> (String, Vec<Value>) {
    let mut script = String::new();
    let mut rest = params.iter();

    for param in rest.by_ref() {
        let piece = param.to_display_string();
        match piece.strip_suffix(CONTINUATION_MARK) {
            Some(head) => script.push_str(head),
            None => {
                script.push_str(&piece);
                break;
            }
        }
    }

    (script, rest.cloned().collect())
}

/// Parses host script text into a program.
///
/// With `escape` set, the surrounding quotes and the host's doubled-quote
/// escapes are removed first. Blank text yields `None`.
pub fn host_script_to_program(
    parser: &dyn GridParser,
    text: &str,
    escape: bool,
) -> Result<Option<GridProgram>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let text = if escape {
        Unescaper::host_document().unescape(text)
    } else {
        text.to_string()
    };
    parser.parse(&text).map(Some)
}

impl Dispatcher<'_> {
    /// Runs a host-document call.
    ///
    /// The script is parsed as a grid, converted back to command text and
    /// executed without further unescaping. The result is normalised.
    pub fn execute_host_call(&self, params: &[Value], ctx: &mut Context) -> Result<Option<Value>> {
        debug!(params = params.len(), "Host call");
        if params.is_empty() {
            return Ok(None);
        }

        let (script, args) = split_host_params(params);
        let Some(program) = host_script_to_program(self.parser(), &script, false)? else {
            return Ok(None);
        };
        let Some(command) = to_command(&program) else {
            debug!("Host script has nothing to execute");
            return Ok(None);
        };

        debug!(command = %command, args = args.len(), "Host script converted");
        self.execute_with(&CommandClassifier::without_escape(), &command, &args, ctx)
    }
}
