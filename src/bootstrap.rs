//! Wires the pipeline together and initializes it exactly once per page.
//!
//! The host can call any entry point any number of times; they all end in
//! the same guarded initializer. Only the first call that gets past the
//! guard hydrates the store, attaches the watcher and mounts the panel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::FeedHistoryConfig;
use crate::dom::Selector;
use crate::error::BootstrapError;
use crate::history::HistoryStore;
use crate::page::{HostPage, ReadyState};
use crate::panel::PanelController;
use crate::settings::Preferences;
use crate::storage::SharedStorage;
use crate::watcher::MutationWatcher;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    AlreadyInitialized,
}

#[derive(Clone)]
pub struct Bootstrap<P> {
    page: P,
    config: Arc<FeedHistoryConfig>,
    store: HistoryStore,
    preferences: Preferences,
    watcher: MutationWatcher<P>,
    panel: PanelController<P>,
    initialized: Arc<AtomicBool>,
}

impl<P> Bootstrap<P>
where
    P: HostPage + Clone + 'static,
{
    pub fn new(page: P, storage: SharedStorage, config: FeedHistoryConfig) -> Self {
        let store = HistoryStore::new(Arc::clone(&storage), &config);
        Self::with_store(page, store, storage, config)
    }

    /// Uses a prepared store, e.g. one with a custom clock.
    pub fn with_store(page: P, store: HistoryStore, storage: SharedStorage, config: FeedHistoryConfig) -> Self {
        let config = Arc::new(config);
        let preferences = Preferences::new(storage, &config.storage_keys);
        let watcher = MutationWatcher::new(page.clone(), store.clone(), Arc::clone(&config));
        let panel = PanelController::new(page.clone(), store.clone(), preferences.clone());
        Bootstrap {
            page,
            config,
            store,
            preferences,
            watcher,
            panel,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn watcher(&self) -> &MutationWatcher<P> {
        &self.watcher
    }

    pub fn panel(&self) -> &PanelController<P> {
        &self.panel
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Hydrates the store and preferences, waits for a feed container, then
    /// mounts the panel.
    /// If a step fails the guard is released so a later entry point can try
    /// again; finished steps are no-ops the second time.
    pub async fn initialize(&self) -> Result<InitOutcome, BootstrapError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("feed history already initialized");
            return Ok(InitOutcome::AlreadyInitialized);
        }
        info!("initializing feed history");

        let result = self.run_init().await;
        if let Err(err) = &result {
            warn!(error = %err, "feed history initialization failed");
            self.initialized.store(false, Ordering::SeqCst);
        }
        result.map(|()| InitOutcome::Initialized)
    }

    async fn run_init(&self) -> Result<(), BootstrapError> {
        self.store.hydrate().await?;
        self.preferences.load().await;
        let container = self.watcher.attach().await?;
        self.panel.inject()?;
        self.watcher.inject_affordance(None)?;
        info!(%container, "feed history initialized");
        Ok(())
    }

    pub async fn on_document_ready(&self) -> Result<InitOutcome, BootstrapError> {
        self.initialize().await
    }

    /// For documents that were already parsed when the script ran: give the
    /// host's renderer a moment, and one more if no feed container showed up.
    pub async fn on_delayed_fallback(&self) -> Result<InitOutcome, BootstrapError> {
        sleep(self.config.ready_fallback()).await;
        if !self.has_feed_container() {
            debug!("no feed container yet, delaying initialization");
            sleep(self.config.init_retry()).await;
        }
        self.initialize().await
    }

    /// Last-chance initialization after the window load event.
    pub async fn on_window_load(&self) -> Result<InitOutcome, BootstrapError> {
        if self.is_initialized() {
            return Ok(InitOutcome::AlreadyInitialized);
        }
        sleep(self.config.load_fallback()).await;
        self.initialize().await
    }

    /// Picks the entry point that fits the document's current state. While
    /// the document is still loading, its state is polled at the init retry
    /// interval.
    pub async fn run(&self) -> Result<InitOutcome, BootstrapError> {
        if self.page.ready_state() == ReadyState::Loading {
            while self.page.ready_state() == ReadyState::Loading {
                sleep(self.config.init_retry()).await;
            }
            return self.on_document_ready().await;
        }
        self.on_delayed_fallback().await
    }

    /// Re-places the history button when the tab becomes visible again.
    pub async fn on_visibility_change(&self, visible: bool) -> Result<bool, BootstrapError> {
        if !visible {
            return Ok(false);
        }
        sleep(self.config.visibility_retry()).await;
        Ok(self.watcher.inject_affordance(None)?)
    }

    /// Detaches from the page, lets queued writes land, then forgets
    /// in-memory history. Storage is kept.
    pub async fn teardown(&self) -> Result<(), BootstrapError> {
        self.watcher.detach()?;
        self.panel.remove()?;
        self.store.flush().await;
        self.preferences.flush().await;
        self.store.teardown()?;
        self.initialized.store(false, Ordering::SeqCst);
        info!("feed history torn down");
        Ok(())
    }

    /// A site container exists; the bare `body` fallback does not count.
    fn has_feed_container(&self) -> bool {
        let body = Selector::tag("body");
        self.config
            .container_selectors
            .iter()
            .any(|selector| *selector != body && self.page.exists(selector))
    }
}
