use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::StorageKeys;
use crate::storage::{SharedStorage, StorageWriter};

/// Panel color scheme, persisted as `"light"` or `"dark"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn from_persisted(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences that live beside the history in storage.
///
/// The theme is read once by `load` and cached; changes update the cache at
/// once and are written in the background. Clones share the cache.
#[derive(Clone)]
pub struct Preferences {
    storage: SharedStorage,
    writer: StorageWriter,
    theme_key: String,
    theme: Arc<RwLock<Theme>>,
}

impl Preferences {
    pub fn new(storage: SharedStorage, keys: &StorageKeys) -> Self {
        Preferences {
            writer: StorageWriter::new(Arc::clone(&storage)),
            storage,
            theme_key: keys.theme.clone(),
            theme: Arc::new(RwLock::new(Theme::default())),
        }
    }

    /// Reads the persisted theme into the cache. Unreadable or unknown
    /// values read as the default.
    pub async fn load(&self) -> Theme {
        let theme = match self.storage.get(&self.theme_key).await {
            Ok(Some(value)) => Theme::from_persisted(&value).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(err) => {
                warn!(error = %err, "could not read theme preference");
                Theme::default()
            }
        };
        self.cache(theme);
        theme
    }

    pub fn theme(&self) -> Theme {
        self.theme.read().map(|theme| *theme).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.cache(theme);
        self.writer
            .set(&self.theme_key, Value::String(theme.as_str().to_string()));
    }

    /// Waits for queued preference writes.
    pub async fn flush(&self) {
        self.writer.flush().await
    }

    fn cache(&self, theme: Theme) {
        match self.theme.write() {
            Ok(mut cached) => *cached = theme,
            Err(_) => warn!(%theme, "theme cache lock poisoned"),
        }
    }
}
