mod memory;
mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

pub type DbPool = Arc<PgPool>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} record {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("{0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity-scoped CRUD over the hosted database or the demo store.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn list(&self, entity: Entity, filters: &[Filter]) -> StoreResult<Vec<Record>>;

    async fn create(&self, entity: Entity, data: Value) -> StoreResult<Record>;

    /// Shallow-merges `data` into the stored document.
    async fn update(&self, entity: Entity, id: &str, data: Value) -> StoreResult<Record>;

    /// Soft delete: the row is hidden from `list` but kept in storage.
    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()>;

    async fn get(&self, entity: Entity, id: &str) -> StoreResult<Record> {
        self.list(entity, &[Filter::eq("id", id)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                entity,
                id: id.to_string(),
            })
    }
}

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn ensure_object(data: &Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::Rejected("record data must be a JSON object".to_string()))
    }
}
