//! Stable identity for feed cards.
//!
//! The host's card markup is unversioned and varies between A/B buckets, so
//! identity is derived through a chain of increasingly unreliable signals:
//! video link, content id attribute, cover image path, title text, and
//! finally the uploader name. The first signal that yields a non-empty
//! payload wins.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::dom::{ElementLike, Selector};

/// Namespace tag prepended to every derived identity.
pub const ID_PREFIX: &str = "card_";

const TITLE_CHARS: usize = 30;
const UPLOADER_CHARS: usize = 20;
const TITLE_ID_CHARS: usize = 50;

const VIDEO_PATH_SEGMENT: &str = "/video/";
const COVER_PATH_SEGMENT: &str = "bvid/";

/// Where each identity signal is read from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentityRules {
    pub video_link: Selector,
    pub content_id_attribute: String,
    pub cover_image: Selector,
    pub title: Selector,
    pub uploader: Selector,
}

impl Default for IdentityRules {
    fn default() -> Self {
        IdentityRules {
            video_link: Selector::tag("a").and_attr_contains("href", VIDEO_PATH_SEGMENT),
            content_id_attribute: "data-aid".to_string(),
            cover_image: Selector::tag("img").and_attr_contains("src", "bvid"),
            title: Selector::tag("h3")
                .or(Selector::class("info--tit"))
                .or(Selector::class("video-title"))
                .or(Selector::attr_contains("class", "title")),
            uploader: Selector::class("up-name")
                .or(Selector::class("username"))
                .or(Selector::attr_contains("class", "up")),
        }
    }
}

impl IdentityRules {
    /// Derives the identity of `card`, or `None` when nothing usable was found.
    pub fn resolve<E: ElementLike>(&self, card: &E) -> Option<String> {
        if let Some(id) = self.video_link_id(card) {
            return Some(prefixed(&id));
        }
        if let Some(id) = self.content_id(card) {
            return Some(prefixed(&id));
        }
        if let Some(id) = self.cover_image_id(card) {
            return Some(prefixed(&id));
        }
        self.text_id(card)
    }

    fn video_link_id<E: ElementLike>(&self, card: &E) -> Option<String> {
        let link = card.query_selector(&self.video_link)?;
        segment_after(link.attribute("href")?, VIDEO_PATH_SEGMENT, &['/', '?', '#'])
    }

    fn content_id<E: ElementLike>(&self, card: &E) -> Option<String> {
        let aid = card.attribute(&self.content_id_attribute)?.trim();
        (!aid.is_empty()).then(|| aid.to_string())
    }

    fn cover_image_id<E: ElementLike>(&self, card: &E) -> Option<String> {
        let image = card.query_selector(&self.cover_image)?;
        segment_after(image.attribute("src")?, COVER_PATH_SEGMENT, &['/', '?'])
    }

    fn text_id<E: ElementLike>(&self, card: &E) -> Option<String> {
        let title = card
            .query_selector(&self.title)
            .map(|el| truncate(el.text_content().trim(), TITLE_CHARS))
            .unwrap_or_default();

        if !title.is_empty() {
            let cleaned: String = title
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
                .collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return None;
            }
            return Some(truncate(&prefixed(cleaned), TITLE_ID_CHARS));
        }

        let uploader = card.query_selector(&self.uploader)?;
        let name = truncate(uploader.text_content().trim(), UPLOADER_CHARS);
        let name = name.trim();
        (!name.is_empty()).then(|| prefixed(name))
    }

    fn shared() -> &'static IdentityRules {
        static DEFAULT: OnceLock<IdentityRules> = OnceLock::new();
        DEFAULT.get_or_init(IdentityRules::default)
    }
}

/// Resolves a card's identity with the default rules.
pub fn resolve_identity<E: ElementLike>(card: &E) -> Option<String> {
    IdentityRules::shared().resolve(card)
}

fn prefixed(payload: &str) -> String {
    format!("{}{}", ID_PREFIX, payload)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// The non-empty run following the first occurrence of `marker`, up to any
/// of `terminators`.
fn segment_after(value: &str, marker: &str, terminators: &[char]) -> Option<String> {
    let start = value.find(marker)? + marker.len();
    let rest = &value[start..];
    let end = rest.find(terminators).unwrap_or(rest.len());
    let segment = &rest[..end];
    (!segment.is_empty()).then(|| segment.to_string())
}
