use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{ApiError, ApiResult, Identity};
use crate::db::{Entity, Filter};
use crate::state::AppState;

fn entity_for(raw: &str) -> ApiResult<Entity> {
    match raw.parse::<Entity>() {
        Ok(Entity::AiSettings) => Err(ApiError::NotFound(
            "AI settings are managed under /api/settings/ai".to_string(),
        )),
        Ok(entity) => Ok(entity),
        Err(e) => Err(ApiError::NotFound(e)),
    }
}

/// Pupils may only write their own journal entries and submissions.
fn check_write(identity: &Identity, entity: Entity) -> ApiResult<()> {
    match entity {
        Entity::JournalEntries | Entity::Submissions => Ok(()),
        _ => identity.require_staff(),
    }
}

pub fn filters_from_query(params: HashMap<String, String>) -> Vec<Filter> {
    params
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(field, value)| {
            if field == "search" {
                Filter::Search(value)
            } else {
                Filter::Eq(field, value)
            }
        })
        .collect()
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let entity = entity_for(&entity)?;
    let records = state.store.list(entity, &filters_from_query(params)).await?;
    let items: Vec<Value> = records.iter().map(|r| r.to_json()).collect();
    Ok(Json(json!({ "items": items, "count": items.len() })))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(entity): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let entity = entity_for(&entity)?;
    check_write(&identity, entity)?;
    let record = state.store.create(entity, data).await?;
    tracing::info!("Created {} record {}", entity, record.id);
    Ok((StatusCode::CREATED, Json(record.to_json())))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path((entity, id)): Path<(String, String)>,
    Json(data): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let entity = entity_for(&entity)?;
    check_write(&identity, entity)?;
    let record = state.store.update(entity, &id, data).await?;
    Ok(Json(record.to_json()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let entity = entity_for(&entity)?;
    check_write(&identity, entity)?;
    state.store.delete(entity, &id).await?;
    tracing::info!("Deleted {} record {}", entity, id);
    Ok(Json(json!({ "deleted": true, "id": id })))
}
