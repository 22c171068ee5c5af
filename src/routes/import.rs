use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, ApiResult, Identity};
use crate::db::Entity;
use crate::import::{self, CSV_TEMPLATE};
use crate::state::AppState;

async fn read_upload(request: Request) -> ApiResult<String> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        return String::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid CSV body: {}", e)));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        if field.name() == Some("file") {
            return field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid CSV file: {}", e)));
        }
    }
    Err(ApiError::BadRequest("file is required".to_string()))
}

pub async fn import_pupils(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;

    let raw = read_upload(request).await?;
    let parsed = import::parse_roster(&raw);
    if parsed.rows.is_empty() {
        return Err(ApiError::BadRequest("No valid rows found in the CSV file".to_string()));
    }

    let classes: Vec<_> = state
        .store
        .list(Entity::Classes, &[])
        .await?
        .iter()
        .map(import::class_from_record)
        .collect();

    let result = import::import(state.store.as_ref(), &parsed.rows, &classes).await;
    Ok(Json(json!({
        "successful": result.successful,
        "failed": result.failed,
        "errors": result.errors,
        "skipped": parsed.skipped,
    })))
}

pub async fn template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"pupil_import_template.csv\""),
        ],
        CSV_TEMPLATE,
    )
}
