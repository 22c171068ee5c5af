use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ApiError, ApiResult, Identity};
use crate::agents::ContentEngine;
use crate::db::{Entity, Persistence, Record};
use crate::models::{JournalEntry, TeacherResponse};
use crate::state::AppState;

fn entry_from(record: &Record) -> ApiResult<JournalEntry> {
    serde_json::from_value(record.data.clone()).map_err(|e| {
        tracing::error!("Journal entry {} is unreadable: {}", record.id, e);
        ApiError::BadRequest(format!("Journal entry {} is unreadable", record.id))
    })
}

async fn attach_feedback(
    store: Arc<dyn Persistence>,
    engine: Arc<ContentEngine>,
    id: String,
    entry: JournalEntry,
) {
    let generation = match engine.journal_feedback(&entry, None).await {
        Ok(g) => g,
        Err(e) => {
            tracing::warn!("Skipping feedback for journal entry {}: {}", id, e);
            return;
        }
    };
    if let Err(e) = store
        .update(Entity::JournalEntries, &id, json!({ "aiFeedback": generation.value }))
        .await
    {
        tracing::error!("Failed to attach feedback to journal entry {}: {}", id, e);
    }
}

/// Creates an entry and attaches AI feedback in the background.
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(mut entry): Json<JournalEntry>,
) -> ApiResult<impl IntoResponse> {
    entry.title = entry.title.trim().to_string();
    if entry.title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if entry.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content is required".to_string()));
    }
    entry.ai_feedback = None;
    entry.teacher_responses.clear();
    entry.needs_response = true;
    entry.created_at = Utc::now();

    let mut data = serde_json::to_value(&entry).map_err(crate::db::StoreError::from)?;
    data["pupilId"] = json!(identity.user_id);
    let record = state.store.create(Entity::JournalEntries, data).await?;

    let store = state.store.clone();
    let engine = state.engine().await;
    let id = record.id.clone();
    tokio::spawn(attach_feedback(store, engine, id, entry));

    Ok((StatusCode::CREATED, Json(record.to_json())))
}

pub async fn regenerate_feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.store.get(Entity::JournalEntries, &id).await?;
    let entry = entry_from(&record)?;

    let engine = state.engine().await;
    let generation = engine.journal_feedback(&entry, None).await?;
    state
        .store
        .update(Entity::JournalEntries, &id, json!({ "aiFeedback": generation.value }))
        .await?;
    Ok(Json(generation))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    content: String,
    #[serde(default)]
    teacher_name: String,
}

pub async fn add_response(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<ResponseBody>,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    if body.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content is required".to_string()));
    }

    let record = state.store.get(Entity::JournalEntries, &id).await?;
    let mut entry = entry_from(&record)?;
    entry.teacher_responses.push(TeacherResponse {
        teacher_id: identity.user_id.clone().unwrap_or_else(|| "unknown".to_string()),
        teacher_name: body.teacher_name,
        content: body.content.trim().to_string(),
        created_at: Utc::now(),
    });

    let responses: Value =
        serde_json::to_value(&entry.teacher_responses).map_err(crate::db::StoreError::from)?;
    let record = state
        .store
        .update(
            Entity::JournalEntries,
            &id,
            json!({ "teacherResponses": responses, "needsResponse": false }),
        )
        .await?;
    Ok(Json(record.to_json()))
}
