use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ensure_object, Entity, Filter, Persistence, Record, StoreError, StoreResult};

struct StoredRow {
    record: Record,
    deleted_at: Option<DateTime<Utc>>,
}

/// Process-local store backing demo mode and tests.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<Entity, Vec<StoredRow>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with the demo school: classes, pupils and projects.
    pub async fn seeded() -> StoreResult<Self> {
        let store = Self::new();
        let classes = [
            ("Reception Robins", "Reception"),
            ("Year 3 Oak", "Year 3"),
            ("Year 4 Willow", "Year 4"),
            ("Year 6 Cedar", "Year 6"),
        ];
        let mut class_ids = Vec::new();
        for (name, year_group) in classes {
            let record = store
                .create(
                    Entity::Classes,
                    json!({ "name": name, "year_group": year_group, "pupil_count": 0 }),
                )
                .await?;
            class_ids.push(record.id);
        }

        store
            .create(
                Entity::Users,
                json!({ "name": "Ms Rivera", "email": "rivera@demo.school", "role": "teacher" }),
            )
            .await?;

        let pupils = [
            ("Amara Okafor", "amara@demo.school", 2),
            ("Leo Chen", "leo@demo.school", 2),
            ("Isla Murphy", "isla@demo.school", 1),
        ];
        for (name, email, class_index) in pupils {
            let class_id = &class_ids[class_index];
            let pupil = store
                .create(
                    Entity::Users,
                    json!({ "name": name, "email": email, "role": "pupil", "class_id": class_id }),
                )
                .await?;
            store
                .create(
                    Entity::ClassEnrollments,
                    json!({ "class_id": class_id, "pupil_id": pupil.id }),
                )
                .await?;
        }
        store
            .update(Entity::Classes, &class_ids[1], json!({ "pupil_count": 1 }))
            .await?;
        store
            .update(Entity::Classes, &class_ids[2], json!({ "pupil_count": 2 }))
            .await?;

        for (title, subject) in [
            ("Moving Monsters", "Mechanisms"),
            ("Healthy Wraps", "Food Technology"),
            ("Steady Hand Game", "Electronics"),
        ] {
            store
                .create(Entity::Projects, json!({ "title": title, "subject": subject, "status": "active" }))
                .await?;
        }

        Ok(store)
    }
}

fn matches_all(record: &Record, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(field, value) if field == "id" => record.id == *value,
        other => other.matches(&record.data),
    })
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn list(&self, entity: Entity, filters: &[Filter]) -> StoreResult<Vec<Record>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.deleted_at.is_none())
                    .filter(|row| matches_all(&row.record, filters))
                    .map(|row| row.record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, entity: Entity, data: Value) -> StoreResult<Record> {
        ensure_object(&data)?;
        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4().to_string(),
            entity,
            data,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .write()
            .await
            .entry(entity)
            .or_default()
            .push(StoredRow {
                record: record.clone(),
                deleted_at: None,
            });
        Ok(record)
    }

    async fn update(&self, entity: Entity, id: &str, data: Value) -> StoreResult<Record> {
        ensure_object(&data)?;
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&entity)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row.record.id == id && row.deleted_at.is_none())
            })
            .ok_or_else(|| StoreError::NotFound {
                entity,
                id: id.to_string(),
            })?;

        if let (Some(target), Value::Object(patch)) = (row.record.data.as_object_mut(), data) {
            for (key, value) in patch {
                target.insert(key, value);
            }
        }
        row.record.updated_at = Utc::now();
        Ok(row.record.clone())
    }

    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&entity)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row.record.id == id && row.deleted_at.is_none())
            })
            .ok_or_else(|| StoreError::NotFound {
                entity,
                id: id.to_string(),
            })?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_merges_and_delete_hides() {
        let store = MemoryStore::new();
        let created = store
            .create(Entity::JournalEntries, json!({ "title": "Day 1", "needs_response": true }))
            .await
            .unwrap();

        let updated = store
            .update(Entity::JournalEntries, &created.id, json!({ "needs_response": false }))
            .await
            .unwrap();
        assert_eq!(updated.str_field("title"), Some("Day 1"));
        assert_eq!(updated.data["needs_response"], json!(false));

        store.delete(Entity::JournalEntries, &created.id).await.unwrap();
        assert!(store.list(Entity::JournalEntries, &[]).await.unwrap().is_empty());
        assert!(matches!(
            store.get(Entity::JournalEntries, &created.id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.delete(Entity::JournalEntries, &created.id).await.is_err());
    }

    #[tokio::test]
    async fn list_applies_filters() {
        let store = MemoryStore::seeded().await.unwrap();
        let pupils = store
            .list(Entity::Users, &[Filter::eq("role", "pupil")])
            .await
            .unwrap();
        assert_eq!(pupils.len(), 3);

        let leo = store
            .list(
                Entity::Users,
                &[Filter::eq("role", "pupil"), Filter::Search("chen".into())],
            )
            .await
            .unwrap();
        assert_eq!(leo.len(), 1);
        assert_eq!(leo[0].str_field("email"), Some("leo@demo.school"));
    }

    #[tokio::test]
    async fn create_rejects_non_objects() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create(Entity::Grades, json!([1, 2, 3])).await,
            Err(StoreError::Rejected(_))
        ));
    }
}
