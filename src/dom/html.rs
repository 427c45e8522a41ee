//! HTML serialization of the owned tree, and fragment parsing via html5ever.

use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::element::{Element, Node};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serializes a node the way `outerHTML` would. In-memory handlers are not
/// part of markup and are dropped.
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, false, &mut out);
    out
}

impl Element {
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let raw = RAW_TEXT_ELEMENTS.contains(&self.tag());
        let mut out = String::new();
        for child in self.children() {
            write_node(child, raw, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) {
    match node {
        Node::Element(element) => write_element(element, out),
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => escape_into(text, false, out),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.tag());
    for (name, value) in element.attributes() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&element.tag()) {
        return;
    }
    out.push_str(&element.inner_html());
    out.push_str("</");
    out.push_str(element.tag());
    out.push('>');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Parses an HTML fragment in a `<body>` context.
///
/// Malformed input never fails; html5ever recovers the way a browser would.
/// Doctypes and processing instructions are dropped.
pub fn parse_fragment(markup: &str) -> Vec<Node> {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    );
    let dom = html5ever::parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .one(markup);

    // fragment parsing hangs the result off a synthetic <html> root
    let roots = dom.document.children.borrow();
    let mut nodes = Vec::new();
    for root in roots.iter() {
        for child in root.children.borrow().iter() {
            if let Some(node) = convert(child) {
                nodes.push(node);
            }
        }
    }
    nodes
}

fn convert(handle: &Handle) -> Option<Node> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut element = Element::new(&*name.local);
            for attr in attrs.borrow().iter() {
                element.set_attribute(&*attr.name.local, String::from(&*attr.value));
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert(child) {
                    element.append_child(node);
                }
            }
            Some(Node::Element(element))
        }
        NodeData::Text { contents } => Some(Node::Text(String::from(&**contents.borrow()))),
        NodeData::Comment { contents } => Some(Node::Comment(String::from(&**contents))),
        _ => None,
    }
}
