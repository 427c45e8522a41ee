//! A deliberately small CSS selector engine.
//!
//! Host markup is matched through comma-separated lists of compound
//! selectors: an optional tag (or `*`), `#id`, `.class`, and attribute
//! filters (`[a]`, `[a="v"]`, `[a*="v"]`, `[a^="v"]`, `[a$="v"]`).
//! Combinators are not supported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::element::ElementLike;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected {found:?} at offset {offset} in selector {selector:?}")]
    Unexpected {
        selector: String,
        offset: usize,
        found: char,
    },
    #[error("selector {0:?} ends inside an attribute filter")]
    Unterminated(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrFilter {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrFilter {
    fn accepts(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            // CSS: an empty needle never matches for substring operators
            AttrOp::Contains => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrFilter>,
}

impl Compound {
    fn matches<E: ElementLike>(&self, element: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let Some(class_attr) = element.attribute("class") else {
                return false;
            };
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|filter| filter.accepts(element.attribute(&filter.name)))
    }
}

/// A parsed selector list. Matches when any alternative matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut alternatives = Vec::new();
        for part in split_top_level(source) {
            let part = part.trim();
            if part.is_empty() {
                return Err(SelectorError::Empty);
            }
            alternatives.push(Parser::new(source, part).compound()?);
        }
        if alternatives.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Selector { alternatives })
    }

    pub fn tag(name: &str) -> Self {
        Self::single(Compound {
            tag: Some(name.to_ascii_lowercase()),
            ..Default::default()
        })
    }

    pub fn id(id: &str) -> Self {
        Self::single(Compound {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }

    pub fn class(class: &str) -> Self {
        Self::single(Compound {
            classes: vec![class.to_string()],
            ..Default::default()
        })
    }

    /// `[name*="needle"]`
    pub fn attr_contains(name: &str, needle: &str) -> Self {
        Self::single(Compound::default()).and_attr_contains(name, needle)
    }

    /// Narrows the last alternative with `[name*="needle"]`, e.g. turning
    /// `a` into `a[href*="/video/"]`.
    pub fn and_attr_contains(mut self, name: &str, needle: &str) -> Self {
        if let Some(last) = self.alternatives.last_mut() {
            last.attributes.push(AttrFilter {
                name: name.to_ascii_lowercase(),
                op: AttrOp::Contains,
                value: needle.to_string(),
            });
        }
        self
    }

    pub fn or(mut self, other: Selector) -> Self {
        self.alternatives.extend(other.alternatives);
        self
    }

    pub fn matches<E: ElementLike>(&self, element: &E) -> bool {
        self.alternatives.iter().any(|c| c.matches(element))
    }

    fn single(compound: Compound) -> Self {
        Selector {
            alternatives: vec![compound],
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl TryFrom<String> for Selector {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Selector::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, compound) in self.alternatives.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let bare = compound.id.is_none()
                && compound.classes.is_empty()
                && compound.attributes.is_empty();
            match &compound.tag {
                Some(tag) => f.write_str(tag)?,
                None if bare => f.write_str("*")?,
                None => {}
            }
            if let Some(id) = &compound.id {
                write!(f, "#{}", id)?;
            }
            for class in &compound.classes {
                write!(f, ".{}", class)?;
            }
            for filter in &compound.attributes {
                let op = match filter.op {
                    AttrOp::Exists => {
                        write!(f, "[{}]", filter.name)?;
                        continue;
                    }
                    AttrOp::Equals => "=",
                    AttrOp::Contains => "*=",
                    AttrOp::Prefix => "^=",
                    AttrOp::Suffix => "$=",
                };
                write!(f, "[{}{}\"{}\"]", filter.name, op, filter.value)?;
            }
        }
        Ok(())
    }
}

/// Splits on commas that are not inside an attribute filter or quotes.
fn split_top_level(source: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (offset, c) in source.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&source[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
}

struct Parser<'a> {
    source: &'a str,
    part: &'a str,
    base: usize,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, part: &'a str) -> Self {
        // part is a subslice of source; keep offsets relative to the whole list
        let base = part.as_ptr() as usize - source.as_ptr() as usize;
        Parser {
            source,
            part,
            base,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.part[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            offset: self.base + self.pos,
            found,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(SelectorError::Unterminated(self.source.to_string())),
            };
        }
        Ok(self.part[start..self.pos].to_string())
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(c) if c.is_alphabetic() => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }
        while let Some(c) = self.bump() {
            match c {
                '#' => compound.id = Some(self.ident()?),
                '.' => compound.classes.push(self.ident()?),
                '[' => compound.attributes.push(self.attribute()?),
                other => {
                    self.pos -= other.len_utf8();
                    return Err(self.unexpected(other));
                }
            }
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttrFilter, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrFilter {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                })
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('*' | '^' | '$')) => {
                match self.bump() {
                    Some('=') => {}
                    Some(other) => {
                        self.pos -= other.len_utf8();
                        return Err(self.unexpected(other));
                    }
                    None => return Err(SelectorError::Unterminated(self.source.to_string())),
                }
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    _ => AttrOp::Suffix,
                }
            }
            Some(other) => {
                self.pos -= other.len_utf8();
                return Err(self.unexpected(other));
            }
            None => return Err(SelectorError::Unterminated(self.source.to_string())),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                loop {
                    match self.bump() {
                        Some(c) if c == q => break,
                        Some(_) => {}
                        None => return Err(SelectorError::Unterminated(self.source.to_string())),
                    }
                }
                self.part[start..self.pos - 1].to_string()
            }
            _ => self.ident()?,
        };
        self.skip_whitespace();
        match self.bump() {
            Some(']') => Ok(AttrFilter { name, op, value }),
            Some(other) => {
                self.pos -= other.len_utf8();
                Err(self.unexpected(other))
            }
            None => Err(SelectorError::Unterminated(self.source.to_string())),
        }
    }
}
