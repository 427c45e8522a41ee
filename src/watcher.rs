//! Subscribes to the feed container and captures cards as they leave.
//!
//! The host re-renders its feed wholesale on refresh, so every card removal
//! is a capture opportunity. Additions are only used to spot the host's
//! refresh control and place the history affordance beside it.

use std::ops::AddAssign;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::FeedHistoryConfig;
use crate::dom::{Element, ElementLike, Selector};
use crate::error::PageError;
use crate::history::{CaptureOutcome, HistoryStore};
use crate::page::{HostPage, MutationRecord, ObserverId};

/// Id of the button placed beside the host's refresh control.
pub const HISTORY_BUTTON_ID: &str = "custom-history-btn";

/// Attribute carried by every element this crate injects. Removed subtrees
/// carrying it are never captured.
pub const INJECTED_MARKER: &str = "data-feed-history";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached(Selector),
    AlreadyAttached(Selector),
    /// No container exists yet; try again later.
    NotFound,
}

/// What happened to the cards in one mutation batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub captured: usize,
    pub duplicates: usize,
    pub unidentifiable: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        *self == BatchReport::default()
    }
}

impl AddAssign for BatchReport {
    fn add_assign(&mut self, other: Self) {
        self.captured += other.captured;
        self.duplicates += other.duplicates;
        self.unidentifiable += other.unidentifiable;
        self.failed += other.failed;
    }
}

#[derive(Default)]
struct WatcherState {
    attached: Option<(ObserverId, Selector)>,
    totals: BatchReport,
}

/// Clones share attachment state and running totals.
#[derive(Clone)]
pub struct MutationWatcher<P> {
    page: P,
    store: HistoryStore,
    config: Arc<FeedHistoryConfig>,
    state: Arc<Mutex<WatcherState>>,
}

impl<P> MutationWatcher<P>
where
    P: HostPage + Clone + 'static,
{
    pub fn new(page: P, store: HistoryStore, config: Arc<FeedHistoryConfig>) -> Self {
        MutationWatcher {
            page,
            store,
            config,
            state: Arc::new(Mutex::new(WatcherState::default())),
        }
    }

    /// Subscribes to the first configured container that exists.
    pub fn try_attach(&self) -> Result<AttachOutcome, PageError> {
        let mut state = self.lock("try_attach")?;
        if let Some((_, container)) = &state.attached {
            return Ok(AttachOutcome::AlreadyAttached(container.clone()));
        }

        let Some(container) = self
            .config
            .container_selectors
            .iter()
            .find(|selector| self.page.exists(selector))
        else {
            debug!("no feed container on the page yet");
            return Ok(AttachOutcome::NotFound);
        };

        let watcher = self.clone();
        let observer = self.page.observe(
            container,
            Box::new(move |records: &[MutationRecord]| {
                watcher.process_batch(records);
            }),
        )?;
        state.attached = Some((observer, container.clone()));
        info!(%container, "watching feed container");
        Ok(AttachOutcome::Attached(container.clone()))
    }

    /// Keeps trying to attach, sleeping the configured delay between
    /// attempts, until a container shows up.
    pub async fn attach(&self) -> Result<Selector, PageError> {
        loop {
            match self.try_attach()? {
                AttachOutcome::Attached(container) | AttachOutcome::AlreadyAttached(container) => {
                    return Ok(container)
                }
                AttachOutcome::NotFound => {
                    debug!(retry_in_ms = self.config.attach_retry_ms, "feed container not found");
                    tokio::time::sleep(self.config.attach_retry()).await;
                }
            }
        }
    }

    /// Unsubscribes. Returns false when the watcher was not attached.
    pub fn detach(&self) -> Result<bool, PageError> {
        let attached = self.lock("detach")?.attached.take();
        match attached {
            Some((observer, container)) => {
                self.page.disconnect(observer)?;
                info!(%container, "stopped watching feed container");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock("is_attached")
            .map(|state| state.attached.is_some())
            .unwrap_or(false)
    }

    /// Running totals across every batch seen so far.
    pub fn totals(&self) -> BatchReport {
        self.lock("totals")
            .map(|state| state.totals)
            .unwrap_or_default()
    }

    /// Captures every card in the removed elements, then looks for the
    /// refresh control among the added ones.
    pub fn process_batch(&self, records: &[MutationRecord]) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            for removed in &record.removed {
                let mut cards = Vec::new();
                self.collect_cards(removed, &mut cards);
                for card in cards {
                    report += self.capture(card);
                }
            }
            for added in &record.added {
                if let Err(err) = self.inject_affordance(Some(added)) {
                    debug!(error = %err, "could not place history button");
                }
            }
        }

        if report.captured > 0 {
            info!(captured = report.captured, "captured cards from feed re-render");
        }
        if let Ok(mut state) = self.lock("process_batch") {
            state.totals += report;
        }
        report
    }

    /// Places the history button beside the host's refresh control, looking
    /// inside `scope` first and then across the page. Returns true when a
    /// button was added.
    pub fn inject_affordance(&self, scope: Option<&Element>) -> Result<bool, PageError> {
        if self.page.has_element_with_id(HISTORY_BUTTON_ID) {
            return Ok(false);
        }
        for selector in &self.config.refresh_control_selectors {
            let in_scope = scope.is_some_and(|el| el.query_selector(selector).is_some());
            if in_scope || self.page.exists(selector) {
                self.page.append_beside(selector, history_button())?;
                info!(anchor = %selector, "history button placed");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The outermost cards in `element`, skipping anything this crate injected.
    fn collect_cards<'a>(&self, element: &'a Element, out: &mut Vec<&'a Element>) {
        if element.has_attribute(INJECTED_MARKER) {
            return;
        }
        if self.config.card_selector.matches(element) {
            out.push(element);
            return;
        }
        for child in element.child_elements() {
            self.collect_cards(child, out);
        }
    }

    fn capture(&self, card: &Element) -> BatchReport {
        let mut report = BatchReport::default();
        match self.store.capture(card) {
            Ok(CaptureOutcome::Stored(id)) => {
                debug!(%id, "card captured");
                report.captured = 1;
            }
            Ok(CaptureOutcome::Duplicate(_)) => report.duplicates = 1,
            Ok(CaptureOutcome::Unidentifiable) => report.unidentifiable = 1,
            Err(err) => {
                warn!(error = %err, "card capture failed");
                report.failed = 1;
            }
        }
        report
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, WatcherState>, PageError> {
        self.state
            .lock()
            .map_err(|_| PageError::LockPoisoned(operation))
    }
}

fn history_button() -> Element {
    Element::new("button")
        .with_attr("id", HISTORY_BUTTON_ID)
        .with_attr("type", "button")
        .with_attr(INJECTED_MARKER, "button")
        .with_attr(
            "style",
            "margin-left: 10px; padding: 4px 8px; font-size: 12px; background: #f4f4f4; \
             border: 1px solid #e0e0e0; border-radius: 4px; cursor: pointer;",
        )
        .with_text("查看历史推荐")
}
