//! The in-page history panel: view state, user intents, and rendering.
//!
//! The panel never caches snapshots. Every render reads the store and
//! sanitizes the stored markup again before it reaches the page.

mod render;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::error::PanelError;
use crate::history::{HistoryStore, RetentionLimit};
use crate::page::HostPage;
use crate::sanitize::sanitize_fragment;
use crate::settings::Preferences;
use crate::watcher::HISTORY_BUTTON_ID;

pub use render::{
    render_panel, PanelItem, PanelView, CLEAR_ID, CLOSE_ID, CONTENT_ID, COUNT_ID, LIMIT_APPLY_ID,
    LIMIT_INPUT_ID, NOTICE_ID, REFRESH_ID, THEME_ID, TOGGLE_ID, VIDEOS_ID,
};

pub const PANEL_ROOT_ID: &str = "bilibili-feed-history-panel";

const CLEAR_PROMPT: &str = "确定要清空所有历史记录吗？此操作不可撤销。";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelAction {
    Toggle,
    Close,
    /// Asks the host for confirmation first.
    ClearAll,
    Refresh,
    ToggleTheme,
    /// Raw text from the limit field.
    SetLimit(String),
}

impl PanelAction {
    /// Maps a clicked control to its action. `value` is the limit field's
    /// current text, used by the apply button.
    pub fn from_control(id: &str, value: Option<&str>) -> Option<Self> {
        let action = match id {
            TOGGLE_ID | HISTORY_BUTTON_ID => PanelAction::Toggle,
            CLOSE_ID => PanelAction::Close,
            CLEAR_ID => PanelAction::ClearAll,
            REFRESH_ID => PanelAction::Refresh,
            THEME_ID => PanelAction::ToggleTheme,
            LIMIT_APPLY_ID | LIMIT_INPUT_ID => PanelAction::SetLimit(value.unwrap_or_default().to_string()),
            _ => return None,
        };
        Some(action)
    }
}

#[derive(Debug, Default)]
struct PanelState {
    visible: bool,
    notice: Option<String>,
}

/// Clones share visibility and notice state.
#[derive(Clone)]
pub struct PanelController<P> {
    page: P,
    store: HistoryStore,
    preferences: Preferences,
    state: Arc<Mutex<PanelState>>,
}

impl<P: HostPage> PanelController<P> {
    pub fn new(page: P, store: HistoryStore, preferences: Preferences) -> Self {
        PanelController {
            page,
            store,
            preferences,
            state: Arc::new(Mutex::new(PanelState::default())),
        }
    }

    /// Mounts the panel unless the page already has one.
    pub fn inject(&self) -> Result<bool, PanelError> {
        if self.page.has_element_with_id(PANEL_ROOT_ID) {
            debug!("panel already present");
            return Ok(false);
        }
        self.page.mount(render_panel(&self.view()?))?;
        info!("history panel injected");
        Ok(true)
    }

    pub fn is_visible(&self) -> bool {
        self.lock().map(|state| state.visible).unwrap_or(false)
    }

    pub fn dispatch(&self, action: PanelAction) -> Result<PanelView, PanelError> {
        debug!(?action, "panel action");
        match action {
            PanelAction::Toggle => {
                let mut state = self.lock()?;
                state.visible = !state.visible;
            }
            PanelAction::Close => self.lock()?.visible = false,
            PanelAction::Refresh => {}
            PanelAction::ClearAll => {
                if self.page.confirm(CLEAR_PROMPT) {
                    self.store.clear()?;
                    self.lock()?.notice = None;
                } else {
                    debug!("clear declined");
                }
            }
            PanelAction::ToggleTheme => {
                let theme = self.preferences.theme().toggle();
                self.preferences.set_theme(theme);
                info!(%theme, "panel theme changed");
            }
            PanelAction::SetLimit(input) => self.apply_limit(&input)?,
        }
        self.render()
    }

    /// Current view, read fresh from the store.
    pub fn view(&self) -> Result<PanelView, PanelError> {
        let (visible, notice) = {
            let state = self.lock()?;
            (state.visible, state.notice.clone())
        };
        let items: Vec<PanelItem> = self
            .store
            .newest_first()?
            .into_iter()
            .map(|snapshot| PanelItem {
                id: snapshot.id().to_string(),
                captured_at: snapshot.captured_at(),
                content: sanitize_fragment(snapshot.markup()),
            })
            .collect();
        Ok(PanelView {
            visible,
            theme: self.preferences.theme(),
            count: items.len(),
            limit_input: self.store.limit()?.to_string(),
            notice,
            items,
        })
    }

    /// Replaces the mounted panel with a fresh render. A panel that was never
    /// injected is left alone.
    pub fn render(&self) -> Result<PanelView, PanelError> {
        let view = self.view()?;
        if self.page.has_element_with_id(PANEL_ROOT_ID) {
            self.page.replace_by_id(PANEL_ROOT_ID, render_panel(&view))?;
        }
        Ok(view)
    }

    pub fn remove(&self) -> Result<bool, PanelError> {
        Ok(self.page.remove_by_id(PANEL_ROOT_ID)?)
    }

    fn apply_limit(&self, input: &str) -> Result<(), PanelError> {
        match RetentionLimit::parse(input) {
            Some(limit) => {
                let applied = self.store.set_limit(limit.get() as i64)?;
                self.lock()?.notice = None;
                debug!(%applied, "limit accepted");
            }
            None => {
                let current = self.store.limit()?;
                self.lock()?.notice = Some(format!(
                    "请输入 {} 到 {} 之间的整数",
                    RetentionLimit::MIN,
                    RetentionLimit::MAX
                ));
                debug!(input, %current, "limit input rejected");
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PanelState>, PanelError> {
        self.state.lock().map_err(|_| PanelError::LockPoisoned)
    }
}
