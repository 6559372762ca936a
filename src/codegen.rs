//! JavaScript code generation.
//!
//! Code text is emitted verbatim. Each element becomes one of three
//! forms: a bare `createRootElement` call for a static leaf, a
//! subcomponent invocation for uppercase tags, or an IIFE that declares
//! identifiers, wires properties (wrapping them in a reactive
//! computation when any look dynamic), and builds children in document
//! order. When source maps are requested, emitted chunks are prefixed
//! with location marks that the sourcemap stage later strips.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::ast::*;
use crate::loc::Loc;
use crate::sourcemap;
use crate::{Options, SourceMapMode};

/// An expression that "looks like" a bare value rather than a reactive
/// computation: no call parentheses at all, or a lone function head.
/// This is a policy heuristic, not a semantic guarantee.
static LONE_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:function[\s(]|\([^()]*\)\s*=>|[A-Za-z_$][A-Za-z0-9_$]*\s*=>)").unwrap()
});

pub(crate) fn no_apparent_signals(code: &str) -> bool {
    !code.contains('(') || LONE_FUNCTION.is_match(code)
}

/// Generate output for a whole document. The returned string carries
/// location marks when `opts.sourcemap` is enabled.
pub(crate) fn gen_code(root: &CodeTopLevel, opts: &Options) -> String {
    gen_segments(&root.segments, opts)
}

fn gen_segments(segments: &[CodeSegment], opts: &Options) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            CodeSegment::CodeText(t) => {
                let chunk = mark_block_locs(&t.text, t.loc, opts);
                out.push_str(&chunk);
            }
            CodeSegment::Element(el) => {
                let code = gen_element(el, &out, opts);
                out.push_str(&code);
            }
        }
    }
    out
}

fn gen_embedded(code: &EmbeddedCode, opts: &Options) -> String {
    gen_segments(&code.segments, opts)
}

fn gen_element(el: &Element, prior: &str, opts: &Options) -> String {
    if el.kind == ElementKind::Component {
        gen_subcomponent(el, opts)
    } else if el.properties.is_empty() && el.content.is_empty() {
        // static leaf: no IIFE needed
        mark_loc(format!("Surplus.createRootElement(\"{}\")", el.tag), el.loc, opts)
    } else {
        gen_dom_expression(el, prior, opts)
    }
}

// =============================================================================
// Subcomponents
// =============================================================================

enum PropGroup {
    Object(Vec<String>),
    Mixin(String),
}

/// `<Foo a="1" {...m} b={y}>…</Foo>` becomes
/// `Surplus.subcomponent(Foo, [{ a: '1', children: […] }, m, { b: y }])`,
/// or `Foo({ … })` when a single object group suffices.
fn gen_subcomponent(el: &Element, opts: &Options) -> String {
    let mut groups: Vec<PropGroup> = Vec::new();
    for prop in &el.properties {
        match prop {
            Property::Static(p) => push_pair(&mut groups, format!("{}: {}", p.name, single_quoted(&p.value))),
            Property::Dynamic(p) => push_pair(&mut groups, format!("{}: {}", p.name, gen_embedded(&p.code, opts))),
            Property::Style(p) => push_pair(&mut groups, format!("style: {}", gen_embedded(&p.code, opts))),
            Property::Mixin(m) => groups.push(PropGroup::Mixin(gen_embedded(&m.code, opts))),
        }
    }

    let mut entries: Vec<String> = Vec::new();
    let mut acc = String::new();
    for child in &el.content {
        let entry = match child {
            Child::Element(c) => Some(gen_element(c, &acc, opts)),
            Child::Text(t) => Some(code_str(&t.text)),
            Child::Insert(ins) => Some(gen_embedded(&ins.code, opts)),
            // comments carry no value in a component's children array
            Child::Comment(_) => None,
        };
        if let Some(entry) = entry {
            acc.push_str(&entry);
            entries.push(entry);
        }
    }
    let children_pair = format!("children: [{}]", entries.join(", "));

    // children always live in the first object group
    match groups.first_mut() {
        Some(PropGroup::Object(pairs)) => pairs.push(children_pair),
        _ => groups.insert(0, PropGroup::Object(vec![children_pair])),
    }

    let rendered: Vec<String> = groups
        .iter()
        .map(|g| match g {
            PropGroup::Object(pairs) => format!("{{ {} }}", pairs.join(", ")),
            PropGroup::Mixin(code) => code.clone(),
        })
        .collect();

    let code = if rendered.len() == 1 {
        format!("{}({})", el.tag, rendered[0])
    } else {
        format!("Surplus.subcomponent({}, [{}])", el.tag, rendered.join(", "))
    };
    mark_loc(code, el.loc, opts)
}

fn push_pair(groups: &mut Vec<PropGroup>, pair: String) {
    match groups.last_mut() {
        Some(PropGroup::Object(pairs)) => pairs.push(pair),
        _ => groups.push(PropGroup::Object(vec![pair])),
    }
}

// =============================================================================
// DOM expressions (IIFE form)
// =============================================================================

fn gen_dom_expression(el: &Element, prior: &str, opts: &Options) -> String {
    let base = infer_indent(prior);
    let nl = format!("\r\n{base}");
    let inl = format!("{nl}    ");
    let iinl = format!("{inl}    ");

    let mut b = DomBuilder {
        opts,
        ids: Vec::new(),
        used: FxHashSet::default(),
        statements: Vec::new(),
        inl,
        iinl,
    };
    b.build_element(el, None, 0);

    let mut code = String::from("(function () {");
    code.push_str(&b.inl);
    code.push_str("var ");
    code.push_str(&b.ids.join(", "));
    code.push(';');
    for stmt in &b.statements {
        code.push_str(&b.inl);
        code.push_str(stmt);
    }
    code.push_str(&b.inl);
    code.push_str("return __;");
    code.push_str(&nl);
    code.push_str("})()");
    mark_loc(code, el.loc, opts)
}

struct DomBuilder<'a> {
    opts: &'a Options,
    ids: Vec<String>,
    used: FxHashSet<String>,
    statements: Vec<String>,
    inl: String,
    iinl: String,
}

impl DomBuilder<'_> {
    fn build_element(&mut self, el: &Element, parent: Option<&str>, index: usize) {
        let id = match parent {
            None => self.fresh_root(),
            Some(p) => self.fresh(p, &el.tag, index),
        };
        let create = match parent {
            None => format!("{} = Surplus.createRootElement('{}');", id, el.tag),
            Some(p) => format!("{} = Surplus.createElement('{}', {});", id, el.tag, p),
        };
        self.statements.push(mark_loc(create, el.loc, self.opts));

        let mixin_count = el.properties.iter().filter(|p| p.is_mixin()).count();
        let dynamic = mixin_count > 0
            || el.properties.iter().any(|p| match p {
                Property::Dynamic(d) => !no_apparent_signals(&d.code.code_text()),
                Property::Style(s) => !no_apparent_signals(&s.code.code_text()),
                Property::Static(_) | Property::Mixin(_) => false,
            });
        trace!(tag = %el.tag, dynamic, mixins = mixin_count, "building element");

        let mut prop_stmts: Vec<String> = Vec::new();
        let mut mixins_seen = 0;
        let last_index = el.properties.len().saturating_sub(1);
        for (i, prop) in el.properties.iter().enumerate() {
            match prop {
                Property::Static(p) => {
                    prop_stmts.push(format!("{}.{} = {};", id, p.name, single_quoted(&p.value)));
                }
                Property::Dynamic(p) if p.name == "ref" => {
                    prop_stmts.push(format!("{} = {};", gen_embedded(&p.code, self.opts), id));
                }
                Property::Dynamic(p) => {
                    let stmt = format!("{}.{} = {};", id, p.name, gen_embedded(&p.code, self.opts));
                    prop_stmts.push(mark_loc(stmt, p.loc, self.opts));
                }
                Property::Style(p) => {
                    let stmt = format!("{}.style = {};", id, gen_embedded(&p.code, self.opts));
                    prop_stmts.push(mark_loc(stmt, p.loc, self.opts));
                }
                Property::Mixin(m) => {
                    mixins_seen += 1;
                    let expr = gen_embedded(&m.code, self.opts);
                    let stmt = if mixins_seen == mixin_count {
                        if i == last_index {
                            // last mixin, nothing after it: S returns the spread state
                            format!("Surplus.spread({}, {}, __state);", expr, id)
                        } else {
                            format!("__state = Surplus.spread({}, {}, __state);", expr, id)
                        }
                    } else {
                        let state = self.fresh(&id, "mixin", i);
                        format!("{} = Surplus.spread({}, {}, {});", state, expr, id, state)
                    };
                    prop_stmts.push(mark_loc(stmt, m.loc, self.opts));
                }
            }
        }

        if dynamic && !prop_stmts.is_empty() {
            let state_var = (mixin_count > 0).then_some("__state");
            let returns = state_var.is_some();
            let comp = self.computation(prop_stmts, state_var, None, returns);
            self.statements.push(comp);
        } else {
            self.statements.append(&mut prop_stmts);
        }

        for (n, child) in el.content.iter().enumerate() {
            match child {
                Child::Element(c) if c.kind == ElementKind::Component => {
                    // components return values; anchor them like inserts
                    let expr = gen_subcomponent(c, self.opts);
                    self.build_insert(&id, n, expr, c.loc);
                }
                Child::Element(c) => self.build_element(c, Some(&id), n),
                Child::Text(t) => {
                    self.statements.push(format!("Surplus.createTextNode({}, {});", code_str(&t.text), id));
                }
                Child::Comment(c) => {
                    self.statements.push(format!("Surplus.createComment({}, {});", code_str(&c.text), id));
                }
                Child::Insert(ins) => {
                    let expr = gen_embedded(&ins.code, self.opts);
                    self.build_insert(&id, n, expr, ins.loc);
                }
            }
        }
    }

    fn build_insert(&mut self, parent: &str, index: usize, expr: String, loc: Loc) {
        let id = self.fresh(parent, "insert", index);
        self.statements.push(format!("{} = Surplus.createTextNode('', {});", id, parent));
        let body = vec![format!("Surplus.insert(range, {});", expr)];
        let seed = format!("{{ start: {}, end: {} }}", id, id);
        let comp = self.computation(body, Some("range"), Some(&seed), false);
        self.statements.push(mark_loc(comp, loc, self.opts));
    }

    fn computation(&self, mut body: Vec<String>, state_var: Option<&str>, seed: Option<&str>, returns: bool) -> String {
        if returns {
            if let Some(last) = body.last_mut() {
                last.insert_str(0, "return ");
            }
        }
        let mut code = format!("Surplus.S(function ({}) {{", state_var.unwrap_or(""));
        for stmt in &body {
            code.push_str(&self.iinl);
            code.push_str(stmt);
        }
        code.push_str(&self.inl);
        code.push('}');
        if let Some(seed) = seed {
            code.push_str(", ");
            code.push_str(seed);
        }
        code.push_str(");");
        code
    }

    fn fresh_root(&mut self) -> String {
        let id = "__".to_string();
        self.used.insert(id.clone());
        self.ids.push(id.clone());
        id
    }

    /// Child identifier: parent + `_` + tag + 1-based index, with the
    /// joining underscore dropped after a trailing one (`__` + `div1`
    /// gives `__div1`, not `___div1`).
    fn fresh(&mut self, parent: &str, tag: &str, index: usize) -> String {
        let tag: String = tag.chars().filter(char::is_ascii_alphanumeric).collect();
        let mut id = if parent.ends_with('_') {
            format!("{}{}{}", parent, tag, index + 1)
        } else {
            format!("{}_{}{}", parent, tag, index + 1)
        };
        while !self.used.insert(id.clone()) {
            id.push('_');
        }
        self.ids.push(id.clone());
        id
    }
}

// =============================================================================
// String helpers
// =============================================================================

/// Encode text as a single-quoted JavaScript string literal. Newlines
/// become backslash line continuations.
pub(crate) fn code_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\r' if chars.peek() == Some(&'\n') => {} // \r\n folds into one continuation
            '\n' => {
                out.push('\\');
                out.push('\n');
            }
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Re-quote a double-quoted literal with single quotes when that cannot
/// change its value; anything trickier is emitted verbatim.
fn single_quoted(literal: &str) -> String {
    if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
        let body = &literal[1..literal.len() - 1];
        if !body.contains(['\\', '\'', '"']) {
            return format!("'{}'", body);
        }
    }
    literal.to_string()
}

/// The leading whitespace of the last line of previously generated code.
fn infer_indent(prior: &str) -> &str {
    let last_line = match prior.rfind('\n') {
        Some(i) => &prior[i + 1..],
        None => prior,
    };
    let end = last_line.bytes().take_while(|&b| b == b' ' || b == b'\t').count();
    &last_line[..end]
}

// =============================================================================
// Location marks
// =============================================================================

fn mark_loc(code: String, loc: Loc, opts: &Options) -> String {
    if opts.sourcemap == SourceMapMode::None {
        code
    } else {
        let mut out = sourcemap::location_mark(loc.line, loc.col);
        out.push_str(&code);
        out
    }
}

/// Mark a possibly multi-line chunk: the first line at `loc`, every
/// following non-empty line at column 0 of its own source line.
fn mark_block_locs(text: &str, loc: Loc, opts: &Options) -> String {
    if opts.sourcemap == SourceMapMode::None || text.is_empty() {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut out = sourcemap::location_mark(loc.line, loc.col);
    out.push_str(lines.next().unwrap_or(""));
    for (i, line) in lines.enumerate() {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&sourcemap::location_mark(loc.line + 1 + i as u32, 0));
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, transform};
    use crate::token::tokenize;

    fn gen(source: &str, jsx: bool) -> String {
        let mut top = parser::parse(source, tokenize(source), jsx).expect("parse failed");
        transform::normalize(&mut top, jsx);
        gen_code(&top, &Options { jsx, ..Options::default() })
    }

    #[test]
    fn test_code_str_escapes() {
        assert_eq!(code_str("hi"), "'hi'");
        assert_eq!(code_str("a'b"), r"'a\'b'");
        assert_eq!(code_str(r"a\b"), r"'a\\b'");
        assert_eq!(code_str("a\nb"), "'a\\\nb'");
        assert_eq!(code_str("a\r\nb"), "'a\\\nb'");
    }

    #[test]
    fn test_single_quoted() {
        assert_eq!(single_quoted("\"a\""), "'a'");
        assert_eq!(single_quoted("'a'"), "'a'");
        assert_eq!(single_quoted("\"don't\""), "\"don't\"");
        assert_eq!(single_quoted("\"a\\nb\""), "\"a\\nb\"");
    }

    #[test]
    fn test_no_apparent_signals() {
        assert!(no_apparent_signals("f"));
        assert!(no_apparent_signals("a.b.c"));
        assert!(!no_apparent_signals("f()"));
        assert!(!no_apparent_signals("count() + 1"));
        assert!(no_apparent_signals("function (x) { return x; }"));
        assert!(no_apparent_signals("(a, b) => a + b"));
        assert!(no_apparent_signals("x => x(1)"));
    }

    #[test]
    fn test_infer_indent() {
        assert_eq!(infer_indent(""), "");
        assert_eq!(infer_indent("let x = "), "");
        assert_eq!(infer_indent("foo();\n    let x = "), "    ");
        assert_eq!(infer_indent("foo();\n\t\tbar "), "\t\t");
    }

    #[test]
    fn test_static_leaf() {
        assert_eq!(
            gen("let x = <div></div>;", true),
            "let x = Surplus.createRootElement(\"div\");"
        );
    }

    #[test]
    fn test_static_element_inlines_properties() {
        let out = gen("let x = <div class=\"a\">hi</div>;", true);
        assert!(out.contains("__ = Surplus.createRootElement('div');"));
        assert!(out.contains("__.className = 'a';"));
        assert!(out.contains("__.textContent = 'hi';"));
        assert!(out.contains("return __;"));
        assert!(!out.contains("Surplus.S("));
    }

    #[test]
    fn test_dynamic_property_wrapped() {
        let out = gen("let x = <a href=url()></a>;", false);
        assert!(out.contains("Surplus.S(function () {"));
        assert!(out.contains("__.href = url();"));
    }

    #[test]
    fn test_ref_property() {
        let out = gen("let x = <div ref={r}>{y}</div>;", true);
        assert!(out.contains("r = __;"));
    }

    #[test]
    fn test_nested_identifier_scheme() {
        let out = gen("let x = <div><span>a</span><span>b</span></div>;", true);
        assert!(out.contains("var __, __span1, __span2;"));
        assert!(out.contains("__span1 = Surplus.createElement('span', __);"));
        assert!(out.contains("__span2 = Surplus.createElement('span', __);"));
    }

    #[test]
    fn test_mixin_threads_state() {
        let out = gen("let x = <div @a @b id=\"z\"></div>;", false);
        // earlier mixin keeps its own slot, last mixin rides the S state
        assert!(out.contains("__mixin1 = Surplus.spread(a, __, __mixin1);"));
        assert!(out.contains("__state = Surplus.spread(b, __, __state);"));
        assert!(out.contains("Surplus.S(function (__state) {"));
        assert!(out.contains("return __.id = 'z';"));
    }

    #[test]
    fn test_final_mixin_drops_assignment() {
        let out = gen("let x = <div @m></div>;", false);
        assert!(out.contains("return Surplus.spread(m, __, __state);"));
        assert!(!out.contains("__state = Surplus.spread"));
    }

    #[test]
    fn test_subcomponent_single_group() {
        let out = gen("let x = <Foo a=\"1\"/>;", true);
        assert_eq!(out, "let x = Foo({ a: '1', children: [] });");
    }

    #[test]
    fn test_subcomponent_groups() {
        let out = gen("let x = <Foo a=\"1\" {...m} b={y}/>;", true);
        assert_eq!(
            out,
            "let x = Surplus.subcomponent(Foo, [{ a: '1', children: [] }, m, { b: y }]);"
        );
    }

    #[test]
    fn test_subcomponent_leading_mixin_gets_group() {
        let out = gen("let x = <Foo {...m}/>;", true);
        assert_eq!(out, "let x = Surplus.subcomponent(Foo, [{ children: [] }, m]);");
    }

    #[test]
    fn test_subcomponent_children() {
        let out = gen("let x = <Foo>hi</Foo>;", true);
        assert_eq!(out, "let x = Foo({ children: ['hi'] });");
    }

    #[test]
    fn test_component_child_anchored_as_insert() {
        let out = gen("let x = <div><Foo/></div>;", true);
        assert!(out.contains("__insert1 = Surplus.createTextNode('', __);"));
        assert!(out.contains("Surplus.insert(range, Foo({ children: [] }));"));
    }

    #[test]
    fn test_comment_child() {
        let out = gen("let x = <div a=\"1\"><!-- note --></div>;", true);
        assert!(out.contains("Surplus.createComment(' note ', __);"));
    }

    #[test]
    fn test_iife_line_endings_and_indent() {
        let out = gen("    let x = <div a=\"1\">t</div>;", true);
        assert!(out.starts_with("    let x = (function () {\r\n        var __;"));
        assert!(out.ends_with("\r\n    })();"));
    }

    #[test]
    fn test_no_marks_without_sourcemap() {
        let out = gen("let x = <div a=\"1\">t</div>;", true);
        assert!(!out.contains('\u{0}'));
    }
}
