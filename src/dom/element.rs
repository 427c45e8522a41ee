use std::collections::BTreeSet;

use super::selector::Selector;

/// Read-only capability the capture pipeline needs from a card fragment.
///
/// Identity resolution and selector matching are written against this trait
/// rather than a concrete DOM, so a host adapter can expose whatever node type
/// it has and tests can use synthetic fixtures.
pub trait ElementLike: Sized {
    /// Lowercase tag name.
    fn tag_name(&self) -> &str;

    fn attribute(&self, name: &str) -> Option<&str>;

    /// Direct element children in document order.
    fn child_elements(&self) -> Vec<&Self>;

    /// Concatenated text of every descendant text node.
    fn text_content(&self) -> String;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.matches(self)
    }

    /// First descendant (not self) matching `selector`, in document order.
    fn query_selector(&self, selector: &Selector) -> Option<&Self> {
        for child in self.child_elements() {
            if selector.matches(child) {
                return Some(child);
            }
            if let Some(found) = child.query_selector(selector) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant (not self) matching `selector`, in document order.
    fn query_selector_all(&self, selector: &Selector) -> Vec<&Self> {
        let mut found = Vec::new();
        collect_matches(self, selector, &mut found);
        found
    }
}

fn collect_matches<'a, E: ElementLike>(element: &'a E, selector: &Selector, out: &mut Vec<&'a E>) {
    for child in element.child_elements() {
        if selector.matches(child) {
            out.push(child);
        }
        collect_matches(child, selector, out);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn into_element(self) -> Option<Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An owned, detached element subtree.
///
/// Besides markup attributes, an element can carry in-memory event handlers
/// (the `el.onclick = fn` kind). Those never serialize, but a live clone would
/// keep them, so the sanitizer has to clear them separately.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    handlers: BTreeSet<String>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_handler(mut self, name: impl Into<String>) -> Self {
        self.set_handler(name);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attribute("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets or overwrites an attribute, keeping its original position.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.attributes.len() != before
    }

    pub fn handlers(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(String::as_str)
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains(name)
    }

    pub fn set_handler(&mut self, name: impl Into<String>) {
        self.handlers.insert(name.into().to_ascii_lowercase());
    }

    pub fn clear_handler(&mut self, name: &str) -> bool {
        self.handlers.remove(name)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn append_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn retain_children<F>(&mut self, keep: F)
    where
        F: FnMut(&Node) -> bool,
    {
        self.children.retain(keep);
    }

    /// Every element in this subtree, self included, in document order.
    pub fn descendants_and_self(&self) -> Vec<&Element> {
        let mut out = vec![self];
        for child in self.children.iter().filter_map(Node::as_element) {
            out.extend(child.descendants_and_self());
        }
        out
    }
}

impl ElementLike for Element {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.get_attribute(name)
    }

    fn child_elements(&self) -> Vec<&Self> {
        self.children.iter().filter_map(Node::as_element).collect()
    }

    fn text_content(&self) -> String {
        let mut text = String::new();
        push_text(self, &mut text);
        text
    }
}

fn push_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => push_text(inner, out),
            Node::Comment(_) => {}
        }
    }
}
