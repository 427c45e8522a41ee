//! Runtime configuration: storage keys, host selectors and timings.
//!
//! Everything has a default matching the current host markup, so a bare
//! `FeedHistoryConfig::default()` is a working setup. Hosts can override any
//! field from JSON (camelCase keys, missing fields keep their defaults) or
//! through the `with_*` builders.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dom::Selector;
use crate::history::RetentionLimit;
use crate::identity::IdentityRules;

/// Storage keys, one blob per concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageKeys {
    pub history: String,
    pub limit: String,
    pub theme: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        StorageKeys {
            history: "feedHistory".to_string(),
            limit: "feedHistoryLimit".to_string(),
            theme: "feedHistoryTheme".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedHistoryConfig {
    pub storage_keys: StorageKeys,
    pub default_limit: RetentionLimit,
    /// Feed container candidates, most specific first.
    pub container_selectors: Vec<Selector>,
    pub card_selector: Selector,
    /// Host controls that re-render the feed ("shuffle", "refresh").
    pub refresh_control_selectors: Vec<Selector>,
    pub identity: IdentityRules,
    pub attach_retry_ms: u64,
    pub ready_fallback_ms: u64,
    pub init_retry_ms: u64,
    pub load_fallback_ms: u64,
    pub visibility_retry_ms: u64,
}

impl Default for FeedHistoryConfig {
    fn default() -> Self {
        FeedHistoryConfig {
            storage_keys: StorageKeys::default(),
            default_limit: RetentionLimit::DEFAULT,
            container_selectors: vec![
                Selector::id("app"),
                Selector::id("i_cecream"),
                Selector::tag("main"),
                Selector::tag("body"),
            ],
            card_selector: Selector::class("feed-card")
                .or(Selector::attr_contains("class", "video-card"))
                .or(Selector::attr_contains("class", "bili-video-card")),
            refresh_control_selectors: vec![
                Selector::class("refresh-btn"),
                Selector::attr_contains("class", "refresh"),
                Selector::attr_contains("class", "shuffle"),
                Selector::attr_contains("class", "random"),
            ],
            identity: IdentityRules::default(),
            attach_retry_ms: 1000,
            ready_fallback_ms: 1000,
            init_retry_ms: 1000,
            load_fallback_ms: 2000,
            visibility_retry_ms: 1000,
        }
    }
}

impl FeedHistoryConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = keys;
        self
    }

    pub fn with_default_limit(mut self, limit: RetentionLimit) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_container_selectors(mut self, selectors: Vec<Selector>) -> Self {
        self.container_selectors = selectors;
        self
    }

    pub fn with_card_selector(mut self, selector: Selector) -> Self {
        self.card_selector = selector;
        self
    }

    pub fn with_identity(mut self, rules: IdentityRules) -> Self {
        self.identity = rules;
        self
    }

    pub fn with_attach_retry(mut self, delay: Duration) -> Self {
        self.attach_retry_ms = delay.as_millis() as u64;
        self
    }

    pub fn attach_retry(&self) -> Duration {
        Duration::from_millis(self.attach_retry_ms)
    }

    pub fn ready_fallback(&self) -> Duration {
        Duration::from_millis(self.ready_fallback_ms)
    }

    pub fn init_retry(&self) -> Duration {
        Duration::from_millis(self.init_retry_ms)
    }

    pub fn load_fallback(&self) -> Duration {
        Duration::from_millis(self.load_fallback_ms)
    }

    pub fn visibility_retry(&self) -> Duration {
        Duration::from_millis(self.visibility_retry_ms)
    }
}
