//! Engine wiring.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;
use twodo_core::Result;
use twodo_store::DocumentStore;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::events::{EventEmitter, ProgressionEvent};
use crate::reminders::{LogOnlyScheduler, NotificationScheduler};
use crate::repository::Repository;

/// Progression engine over an injected store, clock and scheduler.
///
/// Operations are split by concern: quest lifecycle coordination in
/// [`crate::coordinator`], quest CRUD and queries in [`crate::quests`],
/// participants and duo-level counters in [`crate::duos`], expiry in
/// [`crate::sweep`].
pub struct ProgressionEngine {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) repo: Repository,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) scheduler: Arc<dyn NotificationScheduler>,
    pub(crate) events: Arc<EventEmitter>,
    pub(crate) config: EngineConfig,
}

impl ProgressionEngine {
    /// Engine with the wall clock, a log-only scheduler and default config.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(Arc::clone(&store)),
            store,
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(LogOnlyScheduler),
            events: Arc::new(EventEmitter::new()),
            config: EngineConfig::default(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the notification scheduler.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Typed read access.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive every progression event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ProgressionEvent) {
        let _ = self.events.emit(event);
    }

    /// Run a secondary step; a failure is logged and swallowed.
    pub(crate) fn secondary<T>(&self, step: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(step, error = %err, retryable = err.is_retryable(), "secondary update dropped");
                None
            }
        }
    }
}
