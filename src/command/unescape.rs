//! Removal of host-level quoting from raw command text.
//!
//! Two conventions are supported:
//! - Backslash escapes inside the quotes (`"say \"hi\"\tnow"`), used by the
//!   interactive console and driver callers
//! - Doubled quotes (`"say ""hi"""`), used by host documents such as
//!   spreadsheets
//!
//! Text that is not wrapped in the quote character is returned unchanged.

use serde::{Deserialize, Serialize};

/// How an escaped character is written inside a quoted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeStyle {
    /// `\` introduces an escape (`\n`, `\t`, `\"`, ...).
    #[default]
    Backslash,
    /// The quote character is escaped by doubling it.
    Doubled,
}

/// Strips one layer of quoting and escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unescaper {
    quote: char,
    style: EscapeStyle,
}

impl Default for Unescaper {
    fn default() -> Self {
        Self::console()
    }
}

impl Unescaper {
    /// Creates an unescaper for the given quote character and escape style.
    pub const fn new(quote: char, style: EscapeStyle) -> Self {
        Self { quote, style }
    }

    /// Console/driver convention: `"` quotes with backslash escapes.
    pub const fn console() -> Self {
        Self::new('"', EscapeStyle::Backslash)
    }

    /// Host document convention: `"` quotes escaped by doubling.
    pub const fn host_document() -> Self {
        Self::new('"', EscapeStyle::Doubled)
    }

    /// Removes the surrounding quotes and one layer of escapes.
    ///
    /// Text that does not both start and end with the quote character is
    /// returned as-is.
    pub fn unescape(&self, text: &str) -> String {
        let Some(inner) = self.strip_quotes(text) else {
            return text.to_string();
        };

        match self.style {
            EscapeStyle::Backslash => remove_backslash_escapes(inner),
            EscapeStyle::Doubled => remove_doubled_quotes(inner, self.quote),
        }
    }

    fn strip_quotes<'a>(&self, text: &'a str) -> Option<&'a str> {
        let q = self.quote.len_utf8();
        if text.len() < 2 * q {
            return None;
        }
        text.strip_prefix(self.quote)?.strip_suffix(self.quote)
    }
}

/// Removes one layer of escaping using the console convention (`"` quotes,
/// backslash escapes).
pub fn unescape(text: &str) -> String {
    Unescaper::console().unescape(text)
}

fn remove_backslash_escapes(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some(other) => {
                // Unknown escape, keep as-is
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

fn remove_doubled_quotes(inner: &str, quote: char) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        result.push(c);
        if c == quote && chars.peek() == Some(&quote) {
            chars.next();
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquoted_text_is_unchanged() {
        assert_eq!(unescape("1+2"), "1+2");
        assert_eq!(unescape("a\\tb"), "a\\tb");
        assert_eq!(unescape(""), "");
    }

    #[test]
    fn test_lone_quote_is_unchanged() {
        assert_eq!(unescape("\""), "\"");
        assert_eq!(unescape("\"abc"), "\"abc");
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(unescape(r#""a\tb\nc""#), "a\tb\nc");
        assert_eq!(unescape(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unescape(r#""c:\\temp""#), "c:\\temp");
    }

    #[test]
    fn test_unknown_escape_is_kept() {
        assert_eq!(unescape(r#""a\qb""#), "a\\qb");
    }

    #[test]
    fn test_empty_quoted_string() {
        assert_eq!(unescape("\"\""), "");
    }

    #[test]
    fn test_doubled_quotes() {
        let host = Unescaper::host_document();
        assert_eq!(host.unescape(r#""say ""hi""""#), "say \"hi\"");
        // Backslashes carry no meaning in host documents
        assert_eq!(host.unescape(r#""a\tb""#), "a\\tb");
    }

    #[test]
    fn test_custom_quote_char() {
        let single = Unescaper::new('\'', EscapeStyle::Doubled);
        assert_eq!(single.unescape("'it''s'"), "it's");
        assert_eq!(single.unescape("\"it\""), "\"it\"");
    }
}
