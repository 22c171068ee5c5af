#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dtassess::agents::{ContentEngine, FallbackReason, Provider, RngSource};
use dtassess::config::AiSettings;
use dtassess::db::{Entity, Filter, MemoryStore, Persistence, Record, StoreError, StoreResult};
use dtassess::models::{AttachedFile, WorkSubmission};

/// Provider returning a canned reply and counting calls.
pub struct ScriptedProvider {
    reply: Result<String, FallbackReason>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(reason: FallbackReason) -> Self {
        Self {
            reply: Err(reason),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, _system: &str, _context: &str) -> Result<String, FallbackReason> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

pub fn engine_with(provider: Option<ScriptedProvider>, seed: u64) -> ContentEngine {
    ContentEngine::with_parts(
        AiSettings::default(),
        provider.map(|p| Box::new(p) as Box<dyn Provider>),
        Box::new(RngSource::seeded(seed)),
    )
}

pub fn box_design() -> WorkSubmission {
    WorkSubmission {
        title: "Box design".to_string(),
        description: String::new(),
        files: vec![AttachedFile {
            name: "f1.jpg".to_string(),
            mime_type: Some("image/jpeg".to_string()),
            size: 1024,
            stored_as: None,
        }],
        project_id: "2".to_string(),
    }
}

/// Memory store whose user creation fails for one named pupil.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_for: String,
    pub message: String,
}

impl FailingStore {
    pub fn new(fail_for: &str, message: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_for: fail_for.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Persistence for FailingStore {
    async fn list(&self, entity: Entity, filters: &[Filter]) -> StoreResult<Vec<Record>> {
        self.inner.list(entity, filters).await
    }

    async fn create(&self, entity: Entity, data: Value) -> StoreResult<Record> {
        if entity == Entity::Users && data["name"] == self.fail_for.as_str() {
            return Err(StoreError::Rejected(self.message.clone()));
        }
        self.inner.create(entity, data).await
    }

    async fn update(&self, entity: Entity, id: &str, data: Value) -> StoreResult<Record> {
        self.inner.update(entity, id, data).await
    }

    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()> {
        self.inner.delete(entity, id).await
    }
}
