//! Shared application state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clipsmith_media::{ArtifactStore, FetchLimits};
use clipsmith_models::{SourceId, SourceVideo};
use clipsmith_worker::Coordinator;

use crate::config::ApiConfig;

/// Admitted-source registry plus handles to the coordinator and store.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: ArtifactStore,
    pub coordinator: Coordinator,
    pub limits: FetchLimits,
    sources: Arc<Mutex<HashMap<SourceId, SourceVideo>>>,
}

impl AppState {
    pub fn new(config: ApiConfig, store: ArtifactStore, coordinator: Coordinator) -> Self {
        Self {
            config,
            store,
            coordinator,
            limits: FetchLimits::from_env(),
            sources: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register an admitted source, replacing any previous admission under
    /// the same id.
    pub fn register_source(&self, source: SourceVideo) {
        self.sources.lock().unwrap().insert(source.id.clone(), source);
    }

    pub fn source(&self, id: &SourceId) -> Option<SourceVideo> {
        self.sources.lock().unwrap().get(id).cloned()
    }
}
