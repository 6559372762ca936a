//! Tokenizer for JavaScript-with-markup source.
//!
//! The tokenizer slices the input into a flat stream of markup
//! punctuation and opaque text runs. It is context-free: `<` is emitted
//! as a tag opener whenever a tag-name character follows, and the parser
//! decides from context whether it actually opens an element or is plain
//! less-than inside code.

/// A token: its kind plus the exact source text it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    /// Create a new token.
    #[inline]
    pub const fn new(kind: TokenKind, text: &'a str) -> Self {
        Self { kind, text }
    }
}

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<` followed by a tag-name character
    TagStart,
    /// `</` followed by a tag-name character
    TagClose,
    /// `>`
    TagEnd,
    /// `/>`
    TagSelfClose,
    /// `<!--`
    HtmlCommentStart,
    /// `-->`
    HtmlCommentEnd,
    /// `//`
    LineComment,
    /// `/*`
    BlockCommentStart,
    /// `*/`
    BlockCommentEnd,
    /// `{...`
    JsxSpreadStart,
    At,          // @
    Equals,      // =
    LParen,      // (
    RParen,      // )
    LBracket,    // [
    RBracket,    // ]
    LBrace,      // {
    RBrace,      // }
    DoubleQuote, // "
    SingleQuote, // '
    Newline,     // \n
    /// A maximal run of characters not starting any other token.
    Text,
    /// End of input (synthesized by the parser, never produced here).
    Eof,
}

/// Slice `source` into tokens. Every byte of the input is covered by
/// exactly one token; concatenating the token texts reproduces the input.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if let Some((kind, len)) = match_at(bytes, pos) {
            tokens.push(Token::new(kind, &source[pos..pos + len]));
            pos += len;
        } else {
            // Opaque text: run until the next recognized token begins.
            let start = pos;
            pos += 1;
            while pos < bytes.len() && match_at(bytes, pos).is_none() {
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Text, &source[start..pos]));
        }
    }

    tokens
}

/// Match the longest token beginning at `pos`, if any.
fn match_at(bytes: &[u8], pos: usize) -> Option<(TokenKind, usize)> {
    use TokenKind::*;

    let rest = &bytes[pos..];
    match rest[0] {
        b'<' => {
            if rest.starts_with(b"<!--") {
                Some((HtmlCommentStart, 4))
            } else if rest.starts_with(b"</") && starts_name(rest.get(2)) {
                Some((TagClose, 2))
            } else if starts_name(rest.get(1)) {
                Some((TagStart, 1))
            } else {
                None
            }
        }
        b'>' => Some((TagEnd, 1)),
        b'/' => {
            if rest.starts_with(b"/>") {
                Some((TagSelfClose, 2))
            } else if rest.starts_with(b"//") {
                Some((LineComment, 2))
            } else if rest.starts_with(b"/*") {
                Some((BlockCommentStart, 2))
            } else {
                None
            }
        }
        b'*' => rest.starts_with(b"*/").then_some((BlockCommentEnd, 2)),
        b'-' => rest.starts_with(b"-->").then_some((HtmlCommentEnd, 3)),
        b'{' => {
            if rest.starts_with(b"{...") {
                Some((JsxSpreadStart, 4))
            } else {
                Some((LBrace, 1))
            }
        }
        b'}' => Some((RBrace, 1)),
        b'@' => Some((At, 1)),
        b'=' => Some((Equals, 1)),
        b'(' => Some((LParen, 1)),
        b')' => Some((RParen, 1)),
        b'[' => Some((LBracket, 1)),
        b']' => Some((RBracket, 1)),
        b'"' => Some((DoubleQuote, 1)),
        b'\'' => Some((SingleQuote, 1)),
        b'\n' => Some((Newline, 1)),
        _ => None,
    }
}

#[inline]
fn starts_name(b: Option<&u8>) -> bool {
    b.is_some_and(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source).iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_covers_input() {
        let source = "let x = <div a=\"1\" @m>hi {y}</div>; // done\n";
        let joined: String = tokenize(source).iter().map(|t| t.text).collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn test_tag_tokens() {
        assert_eq!(
            kinds("<div></div>"),
            vec![
                TokenKind::TagStart,
                TokenKind::Text,
                TokenKind::TagEnd,
                TokenKind::TagClose,
                TokenKind::Text,
                TokenKind::TagEnd,
            ]
        );
    }

    #[test]
    fn test_self_close() {
        assert_eq!(
            kinds("<br/>"),
            vec![TokenKind::TagStart, TokenKind::Text, TokenKind::TagSelfClose]
        );
    }

    #[test]
    fn test_less_than_is_text() {
        // `<` not followed by a name character stays inside the text run
        assert_eq!(texts("a < b"), vec!["a < b"]);
        assert_eq!(texts("a <= b"), vec!["a <", "=", " b"]);
    }

    #[test]
    fn test_jsx_spread_start() {
        assert_eq!(
            kinds("{...props}"),
            vec![TokenKind::JsxSpreadStart, TokenKind::Text, TokenKind::RBrace]
        );
    }

    #[test]
    fn test_comment_markers() {
        assert_eq!(
            kinds("// x\n/* y */"),
            vec![
                TokenKind::LineComment,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::BlockCommentStart,
                TokenKind::Text,
                TokenKind::BlockCommentEnd,
            ]
        );
    }

    #[test]
    fn test_html_comment_markers() {
        assert_eq!(
            kinds("<!-- hi -->"),
            vec![TokenKind::HtmlCommentStart, TokenKind::Text, TokenKind::HtmlCommentEnd]
        );
    }

    #[test]
    fn test_division_stays_text() {
        assert_eq!(texts("a / b"), vec!["a / b"]);
    }

    #[test]
    fn test_decrement_arrow_hazard() {
        // `-->` is always tokenized; the parser re-joins it in code context
        assert_eq!(
            kinds("i-->0"),
            vec![TokenKind::Text, TokenKind::HtmlCommentEnd, TokenKind::Text]
        );
    }

    #[test]
    fn test_quotes_and_punctuation() {
        assert_eq!(
            kinds("\"a\" 'b' (c) [d] {e}"),
            vec![
                TokenKind::DoubleQuote,
                TokenKind::Text,
                TokenKind::DoubleQuote,
                TokenKind::Text,
                TokenKind::SingleQuote,
                TokenKind::Text,
                TokenKind::SingleQuote,
                TokenKind::Text,
                TokenKind::LParen,
                TokenKind::Text,
                TokenKind::RParen,
                TokenKind::Text,
                TokenKind::LBracket,
                TokenKind::Text,
                TokenKind::RBracket,
                TokenKind::Text,
                TokenKind::LBrace,
                TokenKind::Text,
                TokenKind::RBrace,
            ]
        );
    }
}
