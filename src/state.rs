//! Shared application state: the provider registry, the store and the error feed.

use crate::di::Registry;
use crate::config::DEFAULT_PUBLIC_DIR;
use crate::error::ErrorEvent;
use crate::store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the error feed. Slow subscribers miss the oldest events.
pub const ERROR_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn Store>,
    /// Every error response is published here after it is logged.
    pub errors: broadcast::Sender<ErrorEvent>,
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn Store>) -> Self {
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        AppState {
            registry,
            store,
            errors,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
        }
    }

    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ErrorEvent> {
        self.errors.subscribe()
    }
}
