//! The extension popup: a snapshot count and a "clear everything" button.
//!
//! The popup runs in its own context and never sees a `HistoryStore`; it
//! reads and clears storage directly.

use serde_json::Value;
use tracing::{info, warn};

use crate::config::StorageKeys;
use crate::storage::SharedStorage;

pub const HISTORY_HINT: &str = "请在B站页面使用“查看历史推荐”按钮或左上角的历史面板";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopupView {
    pub count: usize,
}

pub struct PopupController {
    storage: SharedStorage,
    history_key: String,
}

impl PopupController {
    pub fn new(storage: SharedStorage, keys: &StorageKeys) -> Self {
        PopupController {
            storage,
            history_key: keys.history.clone(),
        }
    }

    /// Counts entries in the persisted blob. Missing or unreadable reads as 0.
    pub async fn view(&self) -> PopupView {
        let count = match self.storage.get(&self.history_key).await {
            Ok(Some(Value::Array(items))) => items.len(),
            Ok(_) => 0,
            Err(err) => {
                warn!(error = %err, "could not read feed history for popup");
                0
            }
        };
        PopupView { count }
    }

    /// Clears the whole storage namespace once the user has confirmed.
    /// Returns the status line to show, or `None` when nothing was asked of
    /// storage.
    pub async fn clear_all(&self, confirmed: bool) -> Option<String> {
        if !confirmed {
            return None;
        }
        let status = match self.storage.clear().await {
            Ok(()) => {
                info!("all persisted feed history cleared");
                "历史记录已清空".to_string()
            }
            Err(err) => {
                warn!(error = %err, "clearing persisted feed history failed");
                format!("清空失败: {}", err)
            }
        };
        Some(status)
    }

    /// The popup cannot open the in-page panel; it points the user at it.
    pub fn show_history_hint(&self) -> &'static str {
        HISTORY_HINT
    }
}
