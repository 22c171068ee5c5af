use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{ensure_object, DbPool, Entity, Filter, Persistence, Record, RecordRow, StoreError, StoreResult};

const RECORD_COLUMNS: &str = "id, entity, data, created_at, updated_at";

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

fn to_record(row: RecordRow) -> StoreResult<Record> {
    row.into_record().map_err(StoreError::Rejected)
}

#[async_trait]
impl Persistence for PgStore {
    async fn list(&self, entity: Entity, filters: &[Filter]) -> StoreResult<Vec<Record>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM records WHERE deleted_at IS NULL AND entity = ",
            RECORD_COLUMNS
        ));
        query.push_bind(entity.table_name());

        for filter in filters {
            match filter {
                Filter::Eq(field, value) if field == "id" => {
                    query.push(" AND id = ").push_bind(value.clone());
                }
                Filter::Eq(field, value) => {
                    query
                        .push(" AND data->>")
                        .push_bind(field.clone())
                        .push(" = ")
                        .push_bind(value.clone());
                }
                Filter::Search(text) => {
                    query
                        .push(" AND EXISTS (SELECT 1 FROM jsonb_each_text(data) kv WHERE kv.value ILIKE ")
                        .push_bind(format!("%{}%", text))
                        .push(")");
                }
            }
        }
        query.push(" ORDER BY created_at");

        let rows = query
            .build_query_as::<RecordRow>()
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(to_record).collect()
    }

    async fn create(&self, entity: Entity, data: Value) -> StoreResult<Record> {
        ensure_object(&data)?;
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            INSERT INTO records (id, entity, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(entity.table_name())
        .bind(Json(data))
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        to_record(row)
    }

    async fn update(&self, entity: Entity, id: &str, data: Value) -> StoreResult<Record> {
        ensure_object(&data)?;
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            UPDATE records
            SET data = data || $3, updated_at = now()
            WHERE entity = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(entity.table_name())
        .bind(id)
        .bind(Json(data))
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => to_record(row),
            None => Err(StoreError::NotFound {
                entity,
                id: id.to_string(),
            }),
        }
    }

    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE records SET deleted_at = now()
            WHERE entity = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(entity.table_name())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
