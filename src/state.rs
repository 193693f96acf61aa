use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::Storage,
    services::{
        finalizer::{SessionFinalizer, SubmitLocks},
        notifier::{NoopNotifier, ResultNotifier},
        progress::ProgressTracker,
    },
    utils::time::Clock,
};

#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub config: Config,
    pub clock: Clock,
    pub notifier: Arc<dyn ResultNotifier>,
    pub submit_locks: SubmitLocks,
}

impl AppState {
    /// State with the system clock and notifications disabled.
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage,
            config,
            clock: Clock::System,
            notifier: Arc::new(NoopNotifier),
            submit_locks: SubmitLocks::default(),
        }
    }

    pub fn tracker(&self) -> ProgressTracker {
        ProgressTracker::new(
            self.storage.progress.clone(),
            self.clock,
            self.config.assessment_duration_secs,
        )
    }

    pub fn finalizer(&self) -> SessionFinalizer {
        SessionFinalizer::new(
            self.storage.clone(),
            self.tracker(),
            self.notifier.clone(),
            self.submit_locks.clone(),
            self.clock,
        )
    }
}

impl FromRef<AppState> for Storage {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
