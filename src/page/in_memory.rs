use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::dom::{parse_fragment, Element, ElementLike, Node, Selector};
use crate::error::PageError;

use super::{HostPage, MutationHandler, MutationRecord, ObserverId, ReadyState};

type Batch = BTreeMap<ObserverId, Vec<MutationRecord>>;
type Path = Vec<usize>;

struct Observer {
    target: Selector,
    /// Taken out while the handler runs.
    handler: Option<MutationHandler>,
}

struct PageState {
    document: Element,
    ready_state: ReadyState,
    confirm_answer: bool,
    prompts: Vec<String>,
    observers: BTreeMap<ObserverId, Observer>,
    next_observer: u64,
    pending: VecDeque<Vec<(ObserverId, Vec<MutationRecord>)>>,
    delivering: bool,
}

impl PageState {
    fn new(document: Element) -> Self {
        PageState {
            document,
            ready_state: ReadyState::Complete,
            confirm_answer: true,
            prompts: Vec::new(),
            observers: BTreeMap::new(),
            next_observer: 1,
            pending: VecDeque::new(),
            delivering: false,
        }
    }

    /// Observers whose target is `parent` or one of its ancestors.
    fn interested(&self, parent: &[usize]) -> Vec<ObserverId> {
        self.observers
            .iter()
            .filter(|(_, observer)| {
                find_path(&self.document, |el| observer.target.matches(el))
                    .is_some_and(|target| parent.starts_with(&target))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn path_of(&self, selector: &Selector) -> Result<Path, PageError> {
        find_path(&self.document, |el| selector.matches(el))
            .ok_or_else(|| PageError::NoMatch(selector.to_string()))
    }

    fn path_of_id(&self, id: &str) -> Option<Path> {
        find_path(&self.document, |el| el.id() == Some(id))
    }

    fn element_mut(&mut self, path: &[usize]) -> Result<&mut Element, PageError> {
        element_at_mut(&mut self.document, path)
            .ok_or_else(|| PageError::NoMatch(format!("{:?}", path)))
    }

    fn append(&mut self, batch: &mut Batch, parent: &[usize], element: Element) -> Result<(), PageError> {
        let interested = self.interested(parent);
        self.element_mut(parent)?.append_child(element.clone());
        push(batch, &interested, MutationRecord::addition(vec![element]));
        Ok(())
    }

    fn replace_at(&mut self, batch: &mut Batch, path: &[usize], with: Option<Element>) -> Result<Element, PageError> {
        let Some((&index, parent)) = path.split_last() else {
            return Err(PageError::Detached("document root".to_string()));
        };
        let interested = self.interested(parent);
        let children = self.element_mut(parent)?.children_mut();
        let old = match &with {
            Some(element) => std::mem::replace(&mut children[index], Node::Element(element.clone())),
            None => children.remove(index),
        };
        let removed = old.into_element().into_iter().collect();
        let record = MutationRecord {
            added: with.into_iter().collect(),
            removed,
        };
        let old_element = record.removed.first().cloned();
        push(batch, &interested, record);
        old_element.ok_or_else(|| PageError::NoMatch(format!("{:?}", path)))
    }
}

fn push(batch: &mut Batch, observers: &[ObserverId], record: MutationRecord) {
    if record.added.is_empty() && record.removed.is_empty() {
        return;
    }
    for id in observers {
        batch.entry(*id).or_default().push(record.clone());
    }
}

/// Index path (into `children`) of the first element, in document order,
/// for which `matches` holds. The root itself is the empty path.
fn find_path<F>(root: &Element, matches: F) -> Option<Path>
where
    F: Fn(&Element) -> bool,
{
    if matches(root) {
        return Some(Vec::new());
    }
    find_descendant_path(root, &matches, &mut Vec::new())
}

fn find_descendant_path<F>(parent: &Element, matches: &F, path: &mut Path) -> Option<Path>
where
    F: Fn(&Element) -> bool,
{
    for (index, node) in parent.children().iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(index);
            if matches(child) {
                return Some(path.clone());
            }
            if let Some(found) = find_descendant_path(child, matches, path) {
                return Some(found);
            }
            path.pop();
        }
    }
    None
}

fn element_at_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &index in path {
        current = match current.children_mut().get_mut(index) {
            Some(Node::Element(child)) => child,
            _ => return None,
        };
    }
    Some(current)
}

/// A live document held in memory, with child-list mutation observers.
///
/// Clones share the same document. Mutations made from inside an observer
/// callback are queued and delivered after the current batch, so handlers
/// never re-enter.
#[derive(Clone)]
pub struct InMemoryPage {
    state: Arc<Mutex<PageState>>,
}

impl Default for InMemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPage {
    /// `<html><head></head><body></body></html>`, fully loaded.
    pub fn new() -> Self {
        Self::with_document(
            Element::new("html")
                .with_child(Element::new("head"))
                .with_child(Element::new("body")),
        )
    }

    /// A document without a body, so no feed container exists yet.
    pub fn blank() -> Self {
        Self::with_document(Element::new("html").with_child(Element::new("head")))
    }

    pub fn from_body_html(markup: &str) -> Self {
        let body = Element::new("body").with_children(parse_fragment(markup));
        Self::with_document(
            Element::new("html")
                .with_child(Element::new("head"))
                .with_child(body),
        )
    }

    pub fn with_document(document: Element) -> Self {
        InMemoryPage {
            state: Arc::new(Mutex::new(PageState::new(document))),
        }
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        if let Ok(mut state) = self.lock("set_ready_state") {
            state.ready_state = ready_state;
        }
    }

    /// What `confirm` answers from now on.
    pub fn set_confirm_answer(&self, answer: bool) {
        if let Ok(mut state) = self.lock("set_confirm_answer") {
            state.confirm_answer = answer;
        }
    }

    /// Messages passed to `confirm`, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.lock("prompts")
            .map(|state| state.prompts.clone())
            .unwrap_or_default()
    }

    pub fn document(&self) -> Result<Element, PageError> {
        Ok(self.lock("document")?.document.clone())
    }

    pub fn find(&self, selector: &Selector) -> Option<Element> {
        let state = self.lock("find").ok()?;
        if selector.matches(&state.document) {
            return Some(state.document.clone());
        }
        state.document.query_selector(selector).cloned()
    }

    pub fn find_all(&self, selector: &Selector) -> Vec<Element> {
        self.lock("find_all")
            .map(|state| {
                state
                    .document
                    .query_selector_all(selector)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_by_id(&self, id: &str) -> Option<Element> {
        let state = self.lock("find_by_id").ok()?;
        let path = state.path_of_id(id)?;
        element_at(&state.document, &path).cloned()
    }

    pub fn observer_count(&self) -> usize {
        self.lock("observer_count")
            .map(|state| state.observers.len())
            .unwrap_or(0)
    }

    pub fn append_child(&self, parent: &Selector, element: Element) -> Result<(), PageError> {
        self.mutate("append_child", |state, batch| {
            let path = state.path_of(parent)?;
            state.append(batch, &path, element)
        })
    }

    /// Swaps every child of the first `parent` match, the way a feed
    /// re-render does. Observers see one record.
    pub fn replace_children(&self, parent: &Selector, children: Vec<Element>) -> Result<(), PageError> {
        self.mutate("replace_children", |state, batch| {
            let path = state.path_of(parent)?;
            let interested = state.interested(&path);
            let target = state.element_mut(&path)?;
            let old = std::mem::take(target.children_mut());
            target.children_mut().extend(children.iter().cloned().map(Node::Element));
            let record = MutationRecord {
                added: children,
                removed: old.into_iter().filter_map(Node::into_element).collect(),
            };
            push(batch, &interested, record);
            Ok(())
        })
    }

    /// Removes every element matching `selector` (the outermost of nested
    /// matches). Returns how many were removed.
    pub fn remove_matching(&self, selector: &Selector) -> Result<usize, PageError> {
        self.mutate("remove_matching", |state, batch| {
            let mut removed = 0;
            while let Some(path) =
                find_descendant_path(&state.document, &|el: &Element| selector.matches(el), &mut Vec::new())
            {
                state.replace_at(batch, &path, None)?;
                removed += 1;
            }
            Ok(removed)
        })
    }

    fn mutate<R, F>(&self, operation: &'static str, edit: F) -> Result<R, PageError>
    where
        F: FnOnce(&mut PageState, &mut Batch) -> Result<R, PageError>,
    {
        let result = {
            let mut state = self.lock(operation)?;
            let mut batch = Batch::new();
            let result = edit(&mut state, &mut batch);
            if !batch.is_empty() {
                state.pending.push_back(batch.into_iter().collect());
            }
            result
        };
        self.flush();
        result
    }

    /// Delivers queued batches until none are left. Only the outermost call
    /// delivers; nested calls from inside a handler return at once.
    fn flush(&self) {
        match self.lock("flush") {
            Ok(mut state) if !state.delivering => state.delivering = true,
            Ok(_) => return,
            Err(err) => {
                warn!(error = %err, "mutation delivery skipped");
                return;
            }
        }

        loop {
            let mut deliveries = {
                let Ok(mut state) = self.lock("flush") else { return };
                let Some(unit) = state.pending.pop_front() else {
                    state.delivering = false;
                    return;
                };
                let mut deliveries = Vec::with_capacity(unit.len());
                for (id, records) in unit {
                    let handler = state
                        .observers
                        .get_mut(&id)
                        .and_then(|observer| observer.handler.take());
                    if let Some(handler) = handler {
                        deliveries.push((id, handler, records));
                    }
                }
                deliveries
            };

            for (_, handler, records) in deliveries.iter_mut() {
                handler(records.as_slice());
            }

            let Ok(mut state) = self.lock("flush") else { return };
            for (id, handler, _) in deliveries {
                if let Some(observer) = state.observers.get_mut(&id) {
                    observer.handler.get_or_insert(handler);
                }
            }
        }
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, PageState>, PageError> {
        self.state
            .lock()
            .map_err(|_| PageError::LockPoisoned(operation))
    }
}

fn element_at<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    let mut current = root;
    for &index in path {
        current = current.children().get(index)?.as_element()?;
    }
    Some(current)
}

impl HostPage for InMemoryPage {
    fn ready_state(&self) -> ReadyState {
        self.lock("ready_state")
            .map(|state| state.ready_state)
            .unwrap_or_default()
    }

    fn exists(&self, selector: &Selector) -> bool {
        self.lock("exists")
            .map(|state| state.path_of(selector).is_ok())
            .unwrap_or(false)
    }

    fn has_element_with_id(&self, id: &str) -> bool {
        self.lock("has_element_with_id")
            .map(|state| state.path_of_id(id).is_some())
            .unwrap_or(false)
    }

    fn observe(&self, target: &Selector, handler: MutationHandler) -> Result<ObserverId, PageError> {
        let mut state = self.lock("observe")?;
        state.path_of(target)?;
        let id = ObserverId(state.next_observer);
        state.next_observer += 1;
        state.observers.insert(
            id,
            Observer {
                target: target.clone(),
                handler: Some(handler),
            },
        );
        Ok(id)
    }

    fn disconnect(&self, observer: ObserverId) -> Result<bool, PageError> {
        Ok(self.lock("disconnect")?.observers.remove(&observer).is_some())
    }

    fn append_beside(&self, anchor: &Selector, element: Element) -> Result<(), PageError> {
        self.mutate("append_beside", |state, batch| {
            let path = state.path_of(anchor)?;
            let Some((_, parent)) = path.split_last() else {
                return Err(PageError::Detached(anchor.to_string()));
            };
            state.append(batch, parent, element)
        })
    }

    fn mount(&self, element: Element) -> Result<(), PageError> {
        self.append_child(&Selector::tag("body"), element)
    }

    fn replace_by_id(&self, id: &str, element: Element) -> Result<(), PageError> {
        self.mutate("replace_by_id", |state, batch| {
            let path = state
                .path_of_id(id)
                .ok_or_else(|| PageError::NoMatch(format!("#{}", id)))?;
            state.replace_at(batch, &path, Some(element)).map(|_| ())
        })
    }

    fn remove_by_id(&self, id: &str) -> Result<bool, PageError> {
        self.mutate("remove_by_id", |state, batch| match state.path_of_id(id) {
            Some(path) => state.replace_at(batch, &path, None).map(|_| true),
            None => Ok(false),
        })
    }

    fn confirm(&self, message: &str) -> bool {
        match self.lock("confirm") {
            Ok(mut state) => {
                state.prompts.push(message.to_string());
                state.confirm_answer
            }
            Err(_) => false,
        }
    }
}
