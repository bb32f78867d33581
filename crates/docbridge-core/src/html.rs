//! HTML tree serialization shared by the normalizer and the link rewriter.
//!
//! `scraper` trees are read-only, so both passes walk the parsed tree and
//! write a new document, asking a [`Rewriter`] what to do with each element.

use std::borrow::Cow;

use scraper::{ElementRef, Html, Node};

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// What to emit for one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// Emit the element unchanged and recurse.
    Keep,
    /// Emit nothing for the element or its subtree.
    Drop,
    /// Emit the children without the element's own tags.
    Unwrap,
    /// Emit this markup instead of the whole subtree.
    Replace(String),
    /// Emit the element with a new tag name and attributes, then recurse.
    Retag {
        name: String,
        attrs: Vec<(String, String)>,
    },
}

/// Per-node decisions for [`serialize_children`].
pub(crate) trait Rewriter {
    fn element(&mut self, el: ElementRef<'_>) -> Action;

    fn text<'t>(&mut self, text: &'t str) -> Cow<'t, str> {
        Cow::Borrowed(text)
    }
}

/// Serialize the children of `parent` through `rewriter`. Comments are dropped.
pub(crate) fn serialize_children(
    parent: ElementRef<'_>,
    rewriter: &mut impl Rewriter,
    out: &mut String,
) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                let text = rewriter.text(text);
                escape_text(&text, out);
            }
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    serialize_element(el, rewriter, out);
                }
            }
            _ => {}
        }
    }
}

fn serialize_element(el: ElementRef<'_>, rewriter: &mut impl Rewriter, out: &mut String) {
    match rewriter.element(el) {
        Action::Keep => {
            let name = el.value().name();
            push_start_tag(out, name, el.value().attrs());
            if !is_void(name) {
                serialize_children(el, rewriter, out);
                push_end_tag(out, name);
            }
        }
        Action::Drop => {}
        Action::Unwrap => serialize_children(el, rewriter, out),
        Action::Replace(markup) => out.push_str(&markup),
        Action::Retag { name, attrs } => {
            push_start_tag(out, &name, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            if !is_void(&name) {
                serialize_children(el, rewriter, out);
                push_end_tag(out, &name);
            }
        }
    }
}

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(crate) fn push_start_tag<'a>(
    out: &mut String,
    name: &str,
    attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn push_end_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

pub(crate) fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

pub(crate) fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Parse a body fragment. The returned tree's root element wraps the content.
pub(crate) fn parse_fragment(html: &str) -> Html {
    Html::parse_fragment(html)
}

/// Whether the element carries `class` among its classes.
pub(crate) fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Visible text of an element with whitespace runs collapsed.
pub(crate) fn collapsed_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce an abstract to plain text.
///
/// `<br>` becomes a line break, every other tag is stripped, entities are
/// decoded and whitespace inside each line collapsed.
pub fn clean_abstract(html: &str) -> String {
    fn walk(el: ElementRef<'_>, out: &mut String) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) if element.name() == "br" => out.push('\n'),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        walk(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    let fragment = parse_fragment(html);
    let mut raw = String::new();
    walk(fragment.root_element(), &mut raw);

    raw.split('\n')
        .map(collapse_whitespace)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}
