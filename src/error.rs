use thiserror::Error;

/// Failures reported by a [`KvStorage`](crate::storage::KvStorage) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("read of {key} failed: {reason}")]
    ReadFailed { key: String, reason: String },
    #[error("write of {key} rejected: {reason}")]
    WriteRejected { key: String, reason: String },
    #[error("clearing storage failed: {0}")]
    ClearFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("no element matches {0}")]
    NoMatch(String),
    #[error("{0} has no parent element")]
    Detached(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("panel state lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Panel(#[from] PanelError),
}
