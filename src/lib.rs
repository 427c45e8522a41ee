pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod dom;
mod error;
pub mod history;
pub mod identity;
pub mod page;
pub mod panel;
pub mod popup;
pub mod sanitize;
pub mod settings;
pub mod storage;
pub mod watcher;

pub use bootstrap::{Bootstrap, InitOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FeedHistoryConfig, StorageKeys};
pub use dom::{Element, ElementLike, Node, Selector, SelectorError};
pub use error::{BootstrapError, HistoryError, PageError, PanelError, StorageError};
pub use history::{
    AppendOutcome, CaptureOutcome, CardSnapshot, HistoryStore, HydrateOutcome, LimitOutOfRange,
    RetentionLimit, SnapshotRecord,
};
pub use identity::{resolve_identity, IdentityRules};
pub use page::{HostPage, InMemoryPage, MutationHandler, MutationRecord, ObserverId, ReadyState};
pub use panel::{PanelAction, PanelController, PanelView, PANEL_ROOT_ID};
pub use popup::{PopupController, PopupView};
pub use sanitize::{sanitize, sanitize_fragment, sanitize_markup};
pub use settings::{Preferences, Theme};
pub use storage::{InMemoryStorage, KvStorage, SharedStorage, StorageWriter};
pub use watcher::{AttachOutcome, BatchReport, MutationWatcher, HISTORY_BUTTON_ID};
