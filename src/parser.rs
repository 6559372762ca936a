//! Recursive-descent parser over the token stream.
//!
//! The parser walks the flat token stream with a mutable cursor and a
//! tracked `Loc`. Ordinary code is accumulated verbatim into text
//! buffers; markup is parsed into `Element` nodes; embedded code inside
//! property values and inserts is consumed with balanced brackets and
//! opaque strings/comments, recursing back into markup on `<`.
//!
//! Two surface dialects share the grammar: the native dialect uses
//! `@expr` for mixins and inserts, the JSX dialect uses `{...expr}` and
//! `{expr}`.

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};
use crate::loc::Loc;
use crate::token::{Token, TokenKind};

/// Characters that end top-level embedded code in the native dialect.
#[inline]
fn is_code_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '<' | '>' | '/' | ',' | ';' | ')' | ']' | '}')
}

/// Byte length of the identifier prefix of `s`:
/// `[A-Za-z][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+)*`.
fn identifier_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'-';
    let mut i = 1;
    while i < bytes.len() && is_word(bytes[i]) {
        i += 1;
    }
    while i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && is_word(bytes[j]) {
            j += 1;
        }
        if j == i + 1 {
            break;
        }
        i = j;
    }
    Some(i)
}

/// True when `text` ends with an odd run of backslashes, i.e. a quote
/// token following it is escaped.
fn ends_in_escape(text: &str) -> bool {
    text.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Parse tokenized source into a `CodeTopLevel`.
pub fn parse<'a>(source: &'a str, tokens: Vec<Token<'a>>, jsx: bool) -> Result<CodeTopLevel, ParseError> {
    Parser::new(source, tokens, jsx).code_top_level()
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    cursor: usize,
    /// Remaining text of the current token. Identifier and whitespace
    /// splits shorten this in place; punctuation tokens are never split.
    tok: &'a str,
    loc: Loc,
    jsx: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token<'a>>, jsx: bool) -> Self {
        let tok = tokens.first().map_or("", |t| t.text);
        Self { source, tokens, cursor: 0, tok, loc: Loc::default(), jsx }
    }

    // =========================================================================
    // Token handling
    // =========================================================================

    fn eof(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Kind of the current token, `Eof` past the end.
    fn kind(&self) -> TokenKind {
        self.tokens.get(self.cursor).map_or(TokenKind::Eof, |t| t.kind)
    }

    /// Move the cursor to the next token without touching `loc`.
    fn advance_token(&mut self) {
        self.cursor += 1;
        self.tok = self.tokens.get(self.cursor).map_or("", |t| t.text);
    }

    /// Consume the rest of the current token.
    fn next(&mut self) {
        self.loc.advance(self.tok);
        self.advance_token();
    }

    /// Consume the first `len` bytes of the current token and return them.
    fn consume_prefix(&mut self, len: usize) -> &'a str {
        let (head, rest) = self.tok.split_at(len);
        self.loc.advance(head);
        if rest.is_empty() {
            self.advance_token();
        } else {
            self.tok = rest;
        }
        head
    }

    /// Split an identifier off the front of the current token, if one
    /// starts there.
    fn split_identifier(&mut self) -> Option<&'a str> {
        if self.kind() != TokenKind::Text {
            return None;
        }
        let len = identifier_len(self.tok)?;
        Some(self.consume_prefix(len))
    }

    fn at_identifier(&self) -> bool {
        self.kind() == TokenKind::Text && identifier_len(self.tok).is_some()
    }

    /// Skip newline tokens and leading whitespace of text tokens.
    fn skip_whitespace(&mut self) {
        loop {
            match self.kind() {
                TokenKind::Newline => self.next(),
                TokenKind::Text => {
                    let ws = self.tok.len() - self.tok.trim_start().len();
                    if ws == 0 {
                        break;
                    }
                    let whole_token = ws == self.tok.len();
                    self.consume_prefix(ws);
                    if !whole_token {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.loc, self.source)
    }

    fn err_at(&self, kind: ParseErrorKind, loc: Loc) -> ParseError {
        ParseError::new(kind, loc, self.source)
    }

    // =========================================================================
    // Productions
    // =========================================================================

    /// Top level: code text interleaved with elements.
    pub fn code_top_level(&mut self) -> Result<CodeTopLevel, ParseError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut loc = self.loc;

        while !self.eof() {
            match self.kind() {
                TokenKind::TagStart => {
                    flush_text(&mut text, loc, &mut segments);
                    segments.push(CodeSegment::Element(self.element()?));
                    loc = self.loc;
                }
                TokenKind::SingleQuote | TokenKind::DoubleQuote => {
                    let s = self.quoted_string()?;
                    text.push_str(&s);
                }
                TokenKind::LineComment => {
                    let s = self.code_single_line_comment();
                    text.push_str(&s);
                }
                TokenKind::BlockCommentStart => {
                    let s = self.code_multi_line_comment()?;
                    text.push_str(&s);
                }
                _ => {
                    text.push_str(self.tok);
                    self.next();
                }
            }
        }
        flush_text(&mut text, loc, &mut segments);

        Ok(CodeTopLevel { segments })
    }

    /// An element: `<tag prop… >content</tag>` or `<tag prop… />`.
    fn element(&mut self) -> Result<Element, ParseError> {
        let start = self.loc;
        if self.kind() != TokenKind::TagStart {
            return Err(self.err(ParseErrorKind::BadElementName));
        }
        self.next(); // pass '<'

        let tag = match self.split_identifier() {
            Some(t) => t.to_string(),
            None => return Err(self.err_at(ParseErrorKind::BadElementName, start)),
        };

        let mut properties = Vec::new();
        let mut content = Vec::new();

        // start-tag properties
        self.skip_whitespace();
        while !self.eof() && self.kind() != TokenKind::TagEnd && self.kind() != TokenKind::TagSelfClose {
            if self.at_identifier() {
                properties.push(self.property()?);
            } else if !self.jsx && self.kind() == TokenKind::At {
                properties.push(self.mixin()?);
            } else if self.jsx && self.kind() == TokenKind::JsxSpreadStart {
                properties.push(self.jsx_mixin()?);
            } else {
                return Err(self.err(ParseErrorKind::UnrecognizedContentInBeginTag));
            }
            self.skip_whitespace();
        }
        if self.eof() {
            return Err(self.err_at(ParseErrorKind::UnterminatedStartTag, start));
        }

        let has_content = self.kind() == TokenKind::TagEnd;
        self.next(); // pass '>' or '/>'

        if has_content {
            let mut text = String::new();
            while !self.eof() && self.kind() != TokenKind::TagClose {
                match self.kind() {
                    TokenKind::TagStart => {
                        flush_child_text(&mut text, &mut content);
                        content.push(Child::Element(self.element()?));
                    }
                    TokenKind::HtmlCommentStart => {
                        flush_child_text(&mut text, &mut content);
                        content.push(Child::Comment(self.html_comment()?));
                    }
                    TokenKind::At if !self.jsx => {
                        flush_child_text(&mut text, &mut content);
                        content.push(self.insert()?);
                    }
                    TokenKind::LBrace if self.jsx => {
                        flush_child_text(&mut text, &mut content);
                        content.push(self.jsx_insert()?);
                    }
                    _ => {
                        text.push_str(self.tok);
                        self.next();
                    }
                }
            }
            flush_child_text(&mut text, &mut content);

            if self.eof() {
                return Err(self.err_at(ParseErrorKind::MissingCloseTag, start));
            }
            self.next(); // pass '</'
            match self.split_identifier() {
                Some(close) if close == tag => {}
                _ => return Err(self.err_at(ParseErrorKind::MismatchedCloseTag, start)),
            }
            self.skip_whitespace();
            if self.kind() != TokenKind::TagEnd {
                return Err(self.err(ParseErrorKind::MalformedCloseTag));
            }
            self.next(); // pass '>'
        }

        Ok(Element::new(tag, properties, content, start))
    }

    /// `name = "literal"` or `name = expr` / `name = {expr}`.
    fn property(&mut self) -> Result<Property, ParseError> {
        let loc = self.loc;
        let name = match self.split_identifier() {
            Some(n) => n.to_string(),
            None => return Err(self.err(ParseErrorKind::UnrecognizedContentInBeginTag)),
        };

        self.skip_whitespace();
        if self.kind() != TokenKind::Equals {
            return Err(self.err(ParseErrorKind::UnrecognizedContentInBeginTag));
        }
        self.next(); // pass '='
        self.skip_whitespace();

        if matches!(self.kind(), TokenKind::SingleQuote | TokenKind::DoubleQuote) {
            let value = self.quoted_string()?;
            Ok(Property::Static(StaticProperty { name, value }))
        } else if self.jsx {
            if self.kind() != TokenKind::LBrace {
                return Err(self.err(ParseErrorKind::UnexpectedJsxPropertyValue));
            }
            let code = self.jsx_embedded_code()?;
            if name == "style" {
                Ok(Property::Style(StyleProperty { code, loc }))
            } else {
                Ok(Property::Dynamic(DynamicProperty { name, code, loc }))
            }
        } else {
            let code = self.embedded_code(ParseErrorKind::UnrecognizedContentInBeginTag)?;
            Ok(Property::Dynamic(DynamicProperty { name, code, loc }))
        }
    }

    /// Native mixin: `@expr`.
    fn mixin(&mut self) -> Result<Property, ParseError> {
        let loc = self.loc;
        self.next(); // pass '@'
        let code = self.embedded_code(ParseErrorKind::UnrecognizedContentInBeginTag)?;
        Ok(Property::Mixin(Mixin { code, loc }))
    }

    /// JSX mixin: `{...expr}`.
    fn jsx_mixin(&mut self) -> Result<Property, ParseError> {
        let loc = self.loc;
        let code = self.jsx_embedded_code()?;
        Ok(Property::Mixin(Mixin { code, loc }))
    }

    /// Native insert: `@expr` in child position.
    fn insert(&mut self) -> Result<Child, ParseError> {
        let loc = self.loc;
        self.next(); // pass '@'
        let code = self.embedded_code(ParseErrorKind::MissingInsertExpression)?;
        Ok(Child::Insert(Insert { code, loc }))
    }

    /// JSX insert: `{expr}` in child position.
    fn jsx_insert(&mut self) -> Result<Child, ParseError> {
        let loc = self.loc;
        let code = self.jsx_embedded_code()?;
        Ok(Child::Insert(Insert { code, loc }))
    }

    /// Native embedded code: reads until a top-level terminator
    /// character, consuming balanced brackets and quoted strings whole.
    /// `empty_kind` is reported when nothing is consumed, so the
    /// diagnostic names the production that needed an expression.
    fn embedded_code(&mut self, empty_kind: ParseErrorKind) -> Result<EmbeddedCode, ParseError> {
        let start = self.loc;
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut loc = self.loc;

        while !self.eof() && !self.at_code_terminator() {
            match self.kind() {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::JsxSpreadStart => {
                    self.balanced_parens(&mut segments, &mut text, &mut loc)?;
                }
                TokenKind::SingleQuote | TokenKind::DoubleQuote => {
                    let s = self.quoted_string()?;
                    text.push_str(&s);
                }
                _ => {
                    let len = self
                        .tok
                        .char_indices()
                        .find(|&(_, c)| is_code_terminator(c))
                        .map_or(self.tok.len(), |(i, _)| i);
                    let head = self.consume_prefix(len);
                    text.push_str(head);
                }
            }
        }
        if !text.is_empty() {
            segments.push(CodeSegment::CodeText(CodeText::new(text, loc)));
        }
        if segments.is_empty() {
            return Err(self.err_at(empty_kind, start));
        }

        Ok(EmbeddedCode::new(segments))
    }

    fn at_code_terminator(&self) -> bool {
        self.tok.chars().next().is_some_and(is_code_terminator)
    }

    /// JSX embedded code: one balanced brace group. The opening `{` or
    /// `{...` and closing `}` are stripped from the text, the first
    /// segment's location adjusted to match.
    fn jsx_embedded_code(&mut self) -> Result<EmbeddedCode, ParseError> {
        let prefix_len = self.tok.len(); // '{' or '{...'
        let mut segments = Vec::new();
        let mut last = String::new();
        let mut loc = self.loc;

        self.balanced_parens(&mut segments, &mut last, &mut loc)?;

        // drop the closing '}'
        last.pop();
        segments.push(CodeSegment::CodeText(CodeText::new(last, loc)));

        // strip the opening brace from the first segment
        if let Some(CodeSegment::CodeText(first)) = segments.first_mut() {
            first.text.drain(..prefix_len.min(first.text.len()));
            first.loc.col += prefix_len as u32;
            first.loc.pos += prefix_len as u32;
        }

        Ok(EmbeddedCode::new(segments))
    }

    /// Consume one balanced bracket group, including nested groups,
    /// opaque strings and comments, and nested elements (flushed into
    /// `segments` as they occur). On return, `text` has accumulated the
    /// group's source including both delimiters.
    fn balanced_parens(
        &mut self,
        segments: &mut Vec<CodeSegment>,
        text: &mut String,
        loc: &mut Loc,
    ) -> Result<(), ParseError> {
        let start = self.loc;
        let closer = match self.kind() {
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBracket => TokenKind::RBracket,
            TokenKind::LBrace | TokenKind::JsxSpreadStart => TokenKind::RBrace,
            _ => return Err(self.err(ParseErrorKind::UnterminatedParens)),
        };
        text.push_str(self.tok);
        self.next(); // pass opener

        while !self.eof() && self.kind() != closer {
            match self.kind() {
                TokenKind::SingleQuote | TokenKind::DoubleQuote => {
                    let s = self.quoted_string()?;
                    text.push_str(&s);
                }
                TokenKind::LineComment => {
                    let s = self.code_single_line_comment();
                    text.push_str(&s);
                }
                TokenKind::BlockCommentStart => {
                    let s = self.code_multi_line_comment()?;
                    text.push_str(&s);
                }
                TokenKind::TagStart => {
                    if !text.is_empty() {
                        segments.push(CodeSegment::CodeText(CodeText::new(std::mem::take(text), *loc)));
                    }
                    segments.push(CodeSegment::Element(self.element()?));
                    *loc = self.loc;
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::JsxSpreadStart => {
                    self.balanced_parens(segments, text, loc)?;
                }
                _ => {
                    text.push_str(self.tok);
                    self.next();
                }
            }
        }
        if self.eof() {
            return Err(self.err_at(ParseErrorKind::UnterminatedParens, start));
        }
        text.push_str(self.tok);
        self.next(); // pass closer

        Ok(())
    }

    /// A quoted string, verbatim including quotes, with escaped
    /// terminators handled.
    fn quoted_string(&mut self) -> Result<String, ParseError> {
        let start = self.loc;
        let quote = self.kind();
        let mut text = String::from(self.tok);
        self.next();

        while !self.eof() && (self.kind() != quote || ends_in_escape(&text)) {
            text.push_str(self.tok);
            self.next();
        }
        if self.eof() {
            return Err(self.err_at(ParseErrorKind::UnterminatedString, start));
        }
        text.push_str(self.tok);
        self.next();

        Ok(text)
    }

    /// `// …` up to (not including) the newline.
    fn code_single_line_comment(&mut self) -> String {
        let mut text = String::new();
        while !self.eof() && self.kind() != TokenKind::Newline {
            text.push_str(self.tok);
            self.next();
        }
        text
    }

    /// `/* … */`, verbatim including delimiters.
    fn code_multi_line_comment(&mut self) -> Result<String, ParseError> {
        let start = self.loc;
        let mut text = String::new();
        while !self.eof() && self.kind() != TokenKind::BlockCommentEnd {
            text.push_str(self.tok);
            self.next();
        }
        if self.eof() {
            return Err(self.err_at(ParseErrorKind::UnterminatedBlockComment, start));
        }
        text.push_str(self.tok);
        self.next();
        Ok(text)
    }

    /// `<!-- … -->`, delimiters excluded from the node text.
    fn html_comment(&mut self) -> Result<Comment, ParseError> {
        let start = self.loc;
        self.next(); // pass '<!--'
        let mut text = String::new();
        while !self.eof() && self.kind() != TokenKind::HtmlCommentEnd {
            text.push_str(self.tok);
            self.next();
        }
        if self.eof() {
            return Err(self.err_at(ParseErrorKind::UnterminatedHtmlComment, start));
        }
        self.next(); // pass '-->'
        Ok(Comment { text })
    }
}

fn flush_text(text: &mut String, loc: Loc, segments: &mut Vec<CodeSegment>) {
    if !text.is_empty() {
        segments.push(CodeSegment::CodeText(CodeText::new(std::mem::take(text), loc)));
    }
}

fn flush_child_text(text: &mut String, content: &mut Vec<Child>) {
    if !text.is_empty() {
        content.push(Child::Text(Text { text: std::mem::take(text) }));
    }
}
