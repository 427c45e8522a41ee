//! Owned element tree and the element-like capability the capture pipeline
//! reads host markup through.

mod element;
mod html;
mod selector;

pub use element::{Element, ElementLike, Node};
pub use html::{parse_fragment, to_html};
pub use selector::{Selector, SelectorError};
