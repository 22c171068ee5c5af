use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{ApiResult, Identity};
use crate::agents::{GenerationKind, GenerationRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateBody {
    kind: GenerationKind,
    payload: Value,
    #[serde(default)]
    prompt: Option<String>,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<GenerateBody>,
) -> ApiResult<impl IntoResponse> {
    if body.kind != GenerationKind::JournalFeedback {
        identity.require_staff()?;
    }
    let request = GenerationRequest::from_payload(body.kind, body.payload)?;
    let engine = state.engine().await;
    let generation = engine.generate(&request, body.prompt.as_deref()).await?;
    Ok(Json(generation))
}
