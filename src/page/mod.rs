//! The host page, seen through the handful of operations the pipeline needs.
//!
//! Everything on the page is owned by the host; this crate only ever holds
//! detached copies of elements. Observers receive batches of child-list
//! changes for the subtree rooted at the first element matching their target
//! selector.

mod in_memory;

use crate::dom::{Element, Selector};
use crate::error::PageError;

pub use in_memory::InMemoryPage;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

/// One child-list change: elements that entered or left a parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub added: Vec<Element>,
    pub removed: Vec<Element>,
}

impl MutationRecord {
    pub fn removal(removed: Vec<Element>) -> Self {
        MutationRecord {
            added: Vec::new(),
            removed,
        }
    }

    pub fn addition(added: Vec<Element>) -> Self {
        MutationRecord {
            added,
            removed: Vec::new(),
        }
    }
}

pub type MutationHandler = Box<dyn FnMut(&[MutationRecord]) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub u64);

pub trait HostPage: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    fn exists(&self, selector: &Selector) -> bool;

    fn has_element_with_id(&self, id: &str) -> bool;

    /// Subscribes `handler` to subtree changes under the first element
    /// matching `target`.
    fn observe(&self, target: &Selector, handler: MutationHandler) -> Result<ObserverId, PageError>;

    /// Returns false if the observer was already gone.
    fn disconnect(&self, observer: ObserverId) -> Result<bool, PageError>;

    /// Appends `element` as the last child of the parent of the first
    /// element matching `anchor`.
    fn append_beside(&self, anchor: &Selector, element: Element) -> Result<(), PageError>;

    /// Appends `element` to the document body.
    fn mount(&self, element: Element) -> Result<(), PageError>;

    fn replace_by_id(&self, id: &str, element: Element) -> Result<(), PageError>;

    fn remove_by_id(&self, id: &str) -> Result<bool, PageError>;

    /// Asks the user a yes/no question.
    fn confirm(&self, message: &str) -> bool;
}
