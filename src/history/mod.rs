//! Bounded capture history and its persisted form.

mod limit;
mod snapshot;
mod store;

pub use limit::{LimitOutOfRange, RetentionLimit};
pub use snapshot::{CardSnapshot, SnapshotRecord};
pub use store::{AppendOutcome, CaptureOutcome, HistoryStore, HydrateOutcome};
