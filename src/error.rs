//! Parse diagnostics.

use crate::loc::Loc;
use thiserror::Error;

/// Length of the source excerpt captured into a diagnostic.
const EXCERPT_LEN: usize = 30;

/// The failure kinds the grammar can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("bad element name")]
    BadElementName,

    #[error("unterminated start tag")]
    UnterminatedStartTag,

    #[error("element missing close tag")]
    MissingCloseTag,

    #[error("mismatched open and close tags")]
    MismatchedCloseTag,

    #[error("malformed close tag")]
    MalformedCloseTag,

    #[error("unrecognized content in begin tag")]
    UnrecognizedContentInBeginTag,

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated parentheses")]
    UnterminatedParens,

    #[error("unterminated multi-line comment")]
    UnterminatedBlockComment,

    #[error("unterminated html comment")]
    UnterminatedHtmlComment,

    #[error("unexpected value for JSX property")]
    UnexpectedJsxPropertyValue,

    #[error("missing expression in insert")]
    MissingInsertExpression,
}

/// A fatal parse failure: what went wrong, where, and a short excerpt of
/// the source starting at that position. Parsing aborts on the first
/// error; no partial AST is returned.
#[derive(Debug, Clone, Error)]
#[error("{kind} at line {line}, col {col}: \"{excerpt}\"")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
    pub col: u32,
    pub excerpt: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, loc: Loc, source: &str) -> Self {
        let start = (loc.pos as usize).min(source.len());
        let excerpt = source
            .get(start..)
            .unwrap_or("")
            .chars()
            .take(EXCERPT_LEN)
            .collect();
        Self { kind, line: loc.line, col: loc.col, excerpt }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_capture() {
        let source = "0123456789012345678901234567890123456789";
        let err = ParseError::new(ParseErrorKind::UnterminatedString, Loc::new(0, 5, 5), source);
        assert_eq!(err.excerpt.len(), 30);
        assert!(err.excerpt.starts_with("567"));
    }

    #[test]
    fn test_excerpt_at_end() {
        let err = ParseError::new(ParseErrorKind::MissingCloseTag, Loc::new(0, 3, 3), "abc");
        assert_eq!(err.excerpt, "");
    }

    #[test]
    fn test_display() {
        let err = ParseError::new(ParseErrorKind::MismatchedCloseTag, Loc::new(2, 4, 20), "x".repeat(40).as_str());
        let msg = err.to_string();
        assert!(msg.contains("mismatched open and close tags"));
        assert!(msg.contains("line 2"));
    }
}
