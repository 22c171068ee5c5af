use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ApiError, ApiResult, Identity};
use crate::config::AiSettings;
use crate::db::{Entity, StoreError};
use crate::state::AppState;

fn view(settings: &AiSettings) -> Value {
    json!({
        "settings": settings.masked(),
        "configured": settings.has_usable_key(),
    })
}

pub async fn get_ai(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    let engine = state.engine().await;
    Ok(Json(view(engine.settings())))
}

/// Persists new provider settings and swaps in an engine built from them.
pub async fn put_ai(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(mut body): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    let fields = body
        .as_object_mut()
        .ok_or_else(|| ApiError::BadRequest("settings must be a JSON object".to_string()))?;

    // A masked key echoed back from the settings view leaves the stored key unchanged.
    let echoed_mask = fields
        .get("api_key")
        .and_then(|v| v.as_str())
        .map_or(false, |k| k.starts_with("****"));
    if echoed_mask {
        fields.remove("api_key");
    }
    if let Some(provider) = fields.get("provider").and_then(|v| v.as_str()) {
        provider.parse::<crate::config::ProviderKind>().map_err(ApiError::BadRequest)?;
    }

    let current = state.engine().await.settings().clone();
    let updated = current.merged_with(&body);
    let data = serde_json::to_value(&updated).map_err(StoreError::from)?;

    let existing = state.store.list(Entity::AiSettings, &[]).await?;
    match existing.first() {
        Some(record) => state.store.update(Entity::AiSettings, &record.id, data).await?,
        None => state.store.create(Entity::AiSettings, data).await?,
    };

    tracing::info!(
        "AI settings updated: provider {}, model {}",
        updated.provider,
        updated.model
    );
    let response = view(&updated);
    state.replace_engine(updated).await;
    Ok(Json(response))
}
