//! Produces inert copies of captured cards.
//!
//! Sanitizing always works on a deep clone; the element handed in (which may
//! still back the live page) is never touched.

use crate::dom::{parse_fragment, to_html, Element, Node};

/// Inline handler attributes (and in-memory handler slots) that are stripped.
pub const INLINE_HANDLERS: &[&str] = &["onclick", "onmouseover", "onmouseout", "onload", "onerror"];

/// Deep-clones `card` and strips handlers, scripts and `iframe[srcdoc]`.
pub fn sanitize(card: &Element) -> Element {
    let mut copy = card.clone();
    scrub(&mut copy);
    copy
}

/// Parses stored markup, sanitizes every top-level element and drops
/// top-level scripts and comments.
pub fn sanitize_fragment(markup: &str) -> Vec<Node> {
    parse_fragment(markup)
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(element) if is_script(&element) => None,
            Node::Element(element) => {
                let mut element = element;
                scrub(&mut element);
                Some(Node::Element(element))
            }
            Node::Text(text) => Some(Node::Text(text)),
            Node::Comment(_) => None,
        })
        .collect()
}

/// [`sanitize_fragment`], serialized back to markup.
pub fn sanitize_markup(markup: &str) -> String {
    sanitize_fragment(markup).iter().map(to_html).collect()
}

fn scrub(element: &mut Element) {
    for handler in INLINE_HANDLERS {
        element.remove_attribute(handler);
        element.clear_handler(handler);
    }
    if element.tag() == "iframe" {
        element.remove_attribute("srcdoc");
    }
    element.retain_children(|child| !matches!(child, Node::Element(inner) if is_script(inner)));
    for child in element.children_mut().iter_mut() {
        if let Node::Element(inner) = child {
            scrub(inner);
        }
    }
}

fn is_script(element: &Element) -> bool {
    element.tag() == "script"
}
