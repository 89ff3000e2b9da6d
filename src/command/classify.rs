//! Command classification.
//!
//! Maps raw command text to one of a fixed set of execution forms. Routing
//! grammar, checked in this order:
//!
//! | Prefix / shape      | Meaning                                                   |
//! |---------------------|-----------------------------------------------------------|
//! | `>text`             | evaluate, discard result                                  |
//! | `=text`             | evaluate; grid if it holds `\t`/`\n` or a command keyword |
//! | `select…`, `with…`  | SQL (optionally after `$` and leading `(`)                |
//! | `$(name) body`      | SQL against `name` if body is SQL, else a script          |
//! | plain text          | single expression                                         |
//!
//! Classification never fails: anything unrecognised is a single expression
//! and the evaluator reports what is wrong with it.

use serde::Serialize;
use std::fmt;

use super::unescape::Unescaper;

/// Marks a command whose value is discarded.
pub const SUPPRESS_MARKER: char = '>';

/// Marks an expression or grid script.
pub const EXPRESSION_MARKER: char = '=';

/// Introduces a data source selector or a bare SQL statement.
pub const TARGET_MARKER: char = '$';

/// Separates grid rows.
pub const ROW_SEPARATOR: char = '\n';

/// Separates grid columns.
pub const COLUMN_SEPARATOR: char = '\t';

const KEY_SELECT: &str = "select";
const KEY_WITH: &str = "with";

/// Keywords that make a single line a structured (grid) command.
const COMMAND_KEYWORDS: &[&str] = &[
    "if", "else", "elseif", "for", "next", "break", "goto", "func", "return", "end", "result",
    "clear", "fork", "reduce",
];

/// How the body of a `$(name)` script is to be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptForm {
    /// A single expression.
    Single,
    /// A multi-cell or keyword-driven grid script.
    Grid,
}

/// The execution form a command was classified into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CommandShape {
    /// `>expr`: evaluated, nothing returned.
    SuppressedExpression,
    /// `=` followed by a multi-row/column block or a command keyword.
    GridScript,
    /// A single expression.
    SingleExpression,
    /// SQL on the active data source.
    RawSql,
    /// SQL on the named data source.
    DbPrefixedSql { target: String },
    /// A non-SQL script run with `target` as the active data source.
    DbPrefixedScript { target: String, form: ScriptForm },
}

impl CommandShape {
    /// Returns true if the caller gets no value back for this shape.
    pub fn discards_value(&self) -> bool {
        matches!(self, Self::SuppressedExpression)
    }

    /// Returns the selected data source, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::DbPrefixedSql { target } | Self::DbPrefixedScript { target, .. } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for CommandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuppressedExpression => write!(f, "SuppressedExpression"),
            Self::GridScript => write!(f, "GridScript"),
            Self::SingleExpression => write!(f, "SingleExpression"),
            Self::RawSql => write!(f, "RawSql"),
            Self::DbPrefixedSql { target } => write!(f, "DbPrefixedSql({target})"),
            Self::DbPrefixedScript { target, form } => {
                write!(f, "DbPrefixedScript({target}, {form:?})")
            }
        }
    }
}

/// A classified command: its shape plus the text left after stripping markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// The execution form.
    #[serde(flatten)]
    pub shape: CommandShape,
    /// Command text with routing markers and quoting removed.
    pub text: String,
}

impl Command {
    fn new(shape: CommandShape, text: impl Into<String>) -> Self {
        Self {
            shape,
            text: text.into(),
        }
    }
}

/// Classifies raw command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandClassifier {
    unescaper: Option<Unescaper>,
}

impl CommandClassifier {
    /// Creates a classifier that unescapes with the console convention.
    pub fn new() -> Self {
        Self::default().with_unescaper(Unescaper::console())
    }

    /// Creates a classifier for text that was already unescaped upstream.
    pub fn without_escape() -> Self {
        Self { unescaper: None }
    }

    /// Uses the given unescaper.
    pub fn with_unescaper(self, unescaper: Unescaper) -> Self {
        Self {
            unescaper: Some(unescaper),
        }
    }

    /// Returns true if quoting is removed during classification.
    pub fn escapes(&self) -> bool {
        self.unescaper.is_some()
    }

    /// Classifies `text`. Returns `None` for blank input.
    ///
    /// Leading and trailing whitespace of non-blank input is preserved since
    /// it may carry row or column separators.
    pub fn classify(&self, text: &str) -> Option<Command> {
        if text.trim().is_empty() {
            return None;
        }

        if text.starts_with(SUPPRESS_MARKER) {
            let cmd = self.unescape(text);
            let body = cmd.strip_prefix(SUPPRESS_MARKER).unwrap_or(&cmd);
            return Some(Command::new(CommandShape::SuppressedExpression, body));
        }

        if let Some(rest) = text.strip_prefix(EXPRESSION_MARKER) {
            // Grid detection runs on the text as written.
            let grid = is_grid(rest) || is_command(rest);
            let body = self.unescape(rest);
            if grid {
                return Some(Command::new(CommandShape::GridScript, body));
            }
            let body = body
                .strip_prefix([EXPRESSION_MARKER, SUPPRESS_MARKER])
                .unwrap_or(&body);
            return Some(Command::new(CommandShape::SingleExpression, body));
        }

        let cmd = self.unescape(text);

        if is_sql(&cmd) {
            let sql = match cmd.strip_prefix(TARGET_MARKER) {
                Some(rest) => rest.trim(),
                None => cmd.as_str(),
            };
            return Some(Command::new(CommandShape::RawSql, sql));
        }

        if let Some(command) = classify_targeted(&cmd) {
            return Some(command);
        }

        Some(Command::new(CommandShape::SingleExpression, cmd))
    }

    fn unescape(&self, text: &str) -> String {
        match &self.unescaper {
            Some(unescaper) => unescaper.unescape(text),
            None => text.to_string(),
        }
    }
}

/// Classifies `text` with the default (console-escaping) classifier.
pub fn classify(text: &str) -> Option<Command> {
    CommandClassifier::new().classify(text)
}

/// Handles `$(name) body` and `$() body`.
fn classify_targeted(cmd: &str) -> Option<Command> {
    let rest = cmd.strip_prefix(TARGET_MARKER)?.trim();
    let rest = rest.strip_prefix('(')?.trim();

    if let Some(body) = rest.strip_prefix(')') {
        return Some(Command::new(CommandShape::RawSql, body.trim()));
    }

    // An unterminated selector is left for the evaluator to reject.
    let close = closing_paren(rest)?;
    let target = rest[..close].trim().to_string();
    let body = rest[close + 1..].trim();

    if is_sql(body) {
        return Some(Command::new(CommandShape::DbPrefixedSql { target }, body));
    }

    let form = if is_grid(body) || is_command(body) {
        ScriptForm::Grid
    } else {
        ScriptForm::Single
    };
    Some(Command::new(
        CommandShape::DbPrefixedScript { target, form },
        body,
    ))
}

/// Returns the byte offset of the `)` that closes a group already opened
/// just before `text`, skipping nested groups.
pub fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Returns true if the text is a `select` or `with` statement.
///
/// A leading `$` and any number of leading `(` are skipped. The keyword test is
/// case-insensitive and the keyword must be followed by whitespace and at
/// least one more character.
pub fn is_sql(text: &str) -> bool {
    let sql = match text.strip_prefix(TARGET_MARKER) {
        Some(rest) => rest.trim(),
        None => text.trim(),
    };
    let sql = sql.trim_start_matches('(').trim();

    [KEY_SELECT, KEY_WITH]
        .iter()
        .any(|keyword| keyword_followed_by_space(sql, keyword))
}

fn keyword_followed_by_space(sql: &str, keyword: &str) -> bool {
    let Some(head) = sql.get(..keyword.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    let mut rest = sql[keyword.len()..].chars();
    match (rest.next(), rest.next()) {
        (Some(first), Some(_)) => first.is_whitespace(),
        _ => false,
    }
}

/// Returns true if the text holds an embedded row or column separator.
pub fn is_grid(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    text.contains(ROW_SEPARATOR) || text.contains(COLUMN_SEPARATOR)
}

/// Returns true if the text is a structured command: it starts with a command
/// keyword followed by whitespace or end of text, or with a `$(` selector.
pub fn is_command(text: &str) -> bool {
    if text.starts_with("$(") {
        return true;
    }
    COMMAND_KEYWORDS.iter().any(|keyword| {
        text.strip_prefix(keyword)
            .is_some_and(|rest| rest.chars().next().map_or(true, char::is_whitespace))
    })
}
