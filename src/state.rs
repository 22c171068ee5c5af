use crate::agents::ContentEngine;
use crate::config::{AiSettings, Config};
use crate::db::Persistence;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct AppState {
    pub store: Arc<dyn Persistence>,
    pub config: Arc<Config>,
    engine: RwLock<Arc<ContentEngine>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Persistence>, config: Arc<Config>, engine: ContentEngine) -> Self {
        Self {
            store,
            config,
            engine: RwLock::new(Arc::new(engine)),
        }
    }

    /// Snapshot of the current engine; in-flight generations keep the one they started with.
    pub async fn engine(&self) -> Arc<ContentEngine> {
        self.engine.read().await.clone()
    }

    pub async fn replace_engine(&self, settings: AiSettings) {
        *self.engine.write().await = Arc::new(ContentEngine::new(settings));
    }
}
