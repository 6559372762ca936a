//! AST node types for code-with-markup documents.
//!
//! The tree is a closed set of tagged variants: code text interleaved
//! with elements, elements carrying properties and children, and
//! embedded code that may itself contain nested elements.

use crate::loc::Loc;

/// The root of a parsed document: code segments interleaved with markup.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeTopLevel {
    pub segments: Vec<CodeSegment>,
}

/// A segment of top-level or embedded code.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeSegment {
    CodeText(CodeText),
    Element(Element),
}

/// A fragment of plain base-language source plus its starting location.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeText {
    pub text: String,
    pub loc: Loc,
}

impl CodeText {
    pub fn new(text: impl Into<String>, loc: Loc) -> Self {
        Self { text: text.into(), loc }
    }
}

/// Code inside a property value or inline insert. Segments may include
/// nested elements when markup appears inside balanced brackets.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCode {
    pub segments: Vec<CodeSegment>,
}

impl EmbeddedCode {
    pub fn new(segments: Vec<CodeSegment>) -> Self {
        Self { segments }
    }

    /// The concatenation of all plain-code segment texts.
    pub fn code_text(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            if let CodeSegment::CodeText(t) = seg {
                out.push_str(&t.text);
            }
        }
        out
    }
}

/// How an element's tag classifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A DOM element built via `createElement`.
    Html,
    /// An uppercase-tagged component invoked as a function.
    Component,
    /// A tag found only in SVG; treated as `Html` downstream, the
    /// variant records the inference for AST consumers.
    SvgInferred,
}

impl ElementKind {
    /// Derive the kind from a tag name.
    pub fn from_tag(tag: &str) -> Self {
        if tag.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            ElementKind::Component
        } else if SVG_ONLY_TAGS.contains(&tag) {
            ElementKind::SvgInferred
        } else {
            ElementKind::Html
        }
    }

    /// True for kinds emitted through the DOM-building path.
    #[inline]
    pub fn is_html(self) -> bool {
        matches!(self, ElementKind::Html | ElementKind::SvgInferred)
    }
}

/// Tags that exist only in SVG documents.
const SVG_ONLY_TAGS: &[&str] = &[
    "svg", "g", "defs", "desc", "metadata", "symbol", "use", "switch", "path",
    "rect", "circle", "ellipse", "line", "polyline", "polygon", "textPath",
    "tspan", "stop", "linearGradient", "radialGradient", "pattern", "clipPath",
    "mask", "filter", "marker", "foreignObject", "view",
];

/// A markup element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub kind: ElementKind,
    pub properties: Vec<Property>,
    pub content: Vec<Child>,
    pub loc: Loc,
}

impl Element {
    /// Create an element, deriving its kind from the tag.
    pub fn new(tag: impl Into<String>, properties: Vec<Property>, content: Vec<Child>, loc: Loc) -> Self {
        let tag = tag.into();
        let kind = ElementKind::from_tag(&tag);
        Self { tag, kind, properties, content, loc }
    }
}

/// A property in an element's start tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Static(StaticProperty),
    Dynamic(DynamicProperty),
    Style(StyleProperty),
    Mixin(Mixin),
}

impl Property {
    /// The property name, for variants that carry one. Style and Mixin
    /// properties are anonymous and exempt from uniqueness.
    pub fn name(&self) -> Option<&str> {
        match self {
            Property::Static(p) => Some(&p.name),
            Property::Dynamic(p) => Some(&p.name),
            Property::Style(_) | Property::Mixin(_) => None,
        }
    }

    /// The embedded code payload, for variants that carry one.
    pub fn code_mut(&mut self) -> Option<&mut EmbeddedCode> {
        match self {
            Property::Static(_) => None,
            Property::Dynamic(p) => Some(&mut p.code),
            Property::Style(p) => Some(&mut p.code),
            Property::Mixin(p) => Some(&mut p.code),
        }
    }

    #[inline]
    pub fn is_mixin(&self) -> bool {
        matches!(self, Property::Mixin(_))
    }
}

/// `name="literal"` — the value is a JavaScript string literal, verbatim
/// including its quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticProperty {
    pub name: String,
    pub value: String,
}

/// `name=expr` (native) or `name={expr}` (JSX).
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicProperty {
    pub name: String,
    pub code: EmbeddedCode,
    pub loc: Loc,
}

/// `style={expr}` in the JSX dialect; may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProperty {
    pub code: EmbeddedCode,
    pub loc: Loc,
}

/// `@expr` (native) or `{...expr}` (JSX): a bag of properties spread
/// onto the element at runtime. May repeat; order-significant.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixin {
    pub code: EmbeddedCode,
    pub loc: Loc,
}

/// A child inside an element's content.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Element(Element),
    Text(Text),
    Comment(Comment),
    Insert(Insert),
}

/// Literal text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
}

/// `<!-- ... -->` content, delimiters excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
}

/// `@expr` (native) or `{expr}` (JSX) in child position: the value is
/// inserted between text-node anchors at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub code: EmbeddedCode,
    pub loc: Loc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(ElementKind::from_tag("div"), ElementKind::Html);
        assert_eq!(ElementKind::from_tag("Foo"), ElementKind::Component);
        assert_eq!(ElementKind::from_tag("Foo.Bar"), ElementKind::Component);
        assert_eq!(ElementKind::from_tag("svg"), ElementKind::SvgInferred);
        assert_eq!(ElementKind::from_tag("circle"), ElementKind::SvgInferred);
        assert!(ElementKind::from_tag("svg").is_html());
    }

    #[test]
    fn test_embedded_code_text_concat() {
        let code = EmbeddedCode::new(vec![
            CodeSegment::CodeText(CodeText::new("a + ", Loc::default())),
            CodeSegment::CodeText(CodeText::new("b", Loc::default())),
        ]);
        assert_eq!(code.code_text(), "a + b");
    }
}
