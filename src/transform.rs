//! AST normalization between parse and code generation.
//!
//! The pipeline, applied outermost-first at each node in a single walk:
//!
//! 1. remove whitespace-only text nodes (native: only those containing a
//!    newline, and not inside `<pre>`; JSX: any whitespace-only text)
//! 2. collapse whitespace runs in text, except inside `<pre>` (native only)
//! 3. translate HTML entities in text (native only)
//! 4. translate JSX property names (`on*` events, attribute aliases)
//! 5. promote text-only content to a `textContent` static property
//! 6. remove duplicate properties, keeping the last occurrence
//!
//! Each pass touches only the node shapes it names; everything else is
//! carried through unchanged, so applying the pipeline twice is a no-op.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use rustc_hash::FxHashSet;

use crate::ast::*;
use crate::codegen::code_str;
use crate::entities::entity_from_name;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:#(\d+)|#x([0-9a-fA-F]+)|([a-zA-Z][a-zA-Z0-9]*));").unwrap());

/// Normalize a parsed tree in place.
pub fn normalize(root: &mut CodeTopLevel, jsx: bool) {
    visit_segments(&mut root.segments, jsx);
}

fn visit_segments(segments: &mut [CodeSegment], jsx: bool) {
    for seg in segments {
        if let CodeSegment::Element(el) = seg {
            visit_element(el, jsx);
        }
    }
}

fn visit_element(el: &mut Element, jsx: bool) {
    remove_whitespace_text_nodes(el, jsx);
    if !jsx {
        collapse_extra_whitespace(el);
        translate_entities(el);
    }
    if el.kind.is_html() {
        translate_jsx_property_names(el, jsx);
        promote_text_only_content(el);
    }
    remove_duplicate_properties(el);

    for child in &mut el.content {
        match child {
            Child::Element(nested) => visit_element(nested, jsx),
            Child::Insert(ins) => visit_segments(&mut ins.code.segments, jsx),
            Child::Text(_) | Child::Comment(_) => {}
        }
    }
    for prop in &mut el.properties {
        if let Some(code) = prop.code_mut() {
            visit_segments(&mut code.segments, jsx);
        }
    }
}

/// Pass 1: drop whitespace-only text children. The native dialect drops
/// only runs containing a newline and leaves `<pre>` content alone; the
/// JSX dialect drops any whitespace-only text.
fn remove_whitespace_text_nodes(el: &mut Element, jsx: bool) {
    if !jsx && el.tag == "pre" {
        return;
    }
    el.content.retain(|child| match child {
        Child::Text(t) => {
            let blank = t.text.trim().is_empty();
            if jsx {
                !blank
            } else {
                !(blank && t.text.contains('\n'))
            }
        }
        _ => true,
    });
}

/// Pass 2: collapse runs of two or more whitespace characters in text
/// children to a single space. Native dialect only; `<pre>` exempt.
fn collapse_extra_whitespace(el: &mut Element) {
    if el.tag == "pre" {
        return;
    }
    for child in &mut el.content {
        if let Child::Text(t) = child {
            if let std::borrow::Cow::Owned(collapsed) = WHITESPACE_RUN.replace_all(&t.text, " ") {
                t.text = collapsed;
            }
        }
    }
}

/// Pass 3: translate numeric and named HTML entities in text children.
/// Unknown names pass through verbatim.
fn translate_entities(el: &mut Element) {
    for child in &mut el.content {
        if let Child::Text(t) = child {
            if let std::borrow::Cow::Owned(translated) = ENTITY.replace_all(&t.text, entity_replacement) {
                t.text = translated;
            }
        }
    }
}

fn entity_replacement(caps: &Captures) -> String {
    let decoded = if let Some(dec) = caps.get(1) {
        dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
    } else if let Some(hex) = caps.get(2) {
        u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
    } else {
        caps.get(3).and_then(|name| entity_from_name(name.as_str()))
    };
    match decoded {
        Some(ch) => ch.to_string(),
        None => caps[0].to_string(),
    }
}

/// Pass 4: event properties written `onSomething` are lowercased to the
/// DOM `onsomething` form (`onDoubleClick` maps to `ondblclick`), and in
/// the JSX dialect attribute aliases are replaced by the DOM property
/// names they set.
fn translate_jsx_property_names(el: &mut Element, jsx: bool) {
    for prop in &mut el.properties {
        match prop {
            Property::Dynamic(p) => {
                if let Some(translated) = translate_event_name(&p.name) {
                    p.name = translated;
                } else if jsx {
                    if let Some(alias) = attribute_alias(&p.name) {
                        p.name = alias.to_string();
                    }
                }
            }
            Property::Static(p) => {
                if jsx {
                    if let Some(alias) = attribute_alias(&p.name) {
                        p.name = alias.to_string();
                    }
                }
            }
            Property::Style(_) | Property::Mixin(_) => {}
        }
    }
}

fn translate_event_name(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    if bytes.len() > 2 && bytes.starts_with(b"on") && bytes[2].is_ascii_uppercase() {
        if name == "onDoubleClick" {
            Some("ondblclick".to_string())
        } else {
            Some(name.to_lowercase())
        }
    } else {
        None
    }
}

fn attribute_alias(name: &str) -> Option<&'static str> {
    match name {
        "class" => Some("className"),
        "for" => Some("htmlFor"),
        _ => None,
    }
}

/// Pass 5: an element whose content is a single text node and whose
/// properties are all static has the text folded into a `textContent`
/// property, clearing the content.
fn promote_text_only_content(el: &mut Element) {
    let single_text = el.content.len() == 1 && matches!(el.content[0], Child::Text(_));
    let all_static = el.properties.iter().all(|p| matches!(p, Property::Static(_)));
    if !(single_text && all_static) {
        return;
    }
    let Some(Child::Text(t)) = el.content.pop() else {
        return;
    };
    el.properties.push(Property::Static(StaticProperty {
        name: "textContent".to_string(),
        value: code_str(&t.text),
    }));
}

/// Pass 6: duplicate property names keep only their last occurrence.
/// Style and Mixin properties are anonymous and exempt.
fn remove_duplicate_properties(el: &mut Element) {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut keep = vec![true; el.properties.len()];
    for (i, prop) in el.properties.iter().enumerate().rev() {
        if let Some(name) = prop.name() {
            if !seen.insert(name) {
                keep[i] = false;
            }
        }
    }
    if keep.iter().all(|&k| k) {
        return;
    }
    let mut index = 0;
    el.properties.retain(|_| {
        let k = keep[index];
        index += 1;
        k
    });
}
