mod generate;
mod import;
mod journal;
mod records;
mod reports;
mod schemes;
mod settings;
mod submissions;

use axum::{
    async_trait,
    extract::{multipart::Field, DefaultBodyLimit, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::agents::GenerateError;
use crate::db::StoreError;
use crate::models::Role;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/records/:entity", get(records::list).post(records::create))
        .route(
            "/api/records/:entity/:id",
            patch(records::update).delete(records::delete),
        )
        .route("/api/generate", post(generate::generate))
        .route("/api/submissions", post(submissions::submit_work))
        .route("/api/journal", post(journal::create_entry))
        .route("/api/journal/:id/feedback", post(journal::regenerate_feedback))
        .route("/api/journal/:id/responses", post(journal::add_response))
        .route("/api/reports", post(reports::pupil_report))
        .route("/api/reports/class", post(reports::class_report))
        .route("/api/reports/export", post(reports::export_batch))
        .route("/api/reports/:id/export", get(reports::export_one))
        .route("/api/schemes/analyze", post(schemes::analyze))
        .route("/api/import/pupils", post(import::import_pupils))
        .route("/api/import/template", get(import::template))
        .route("/api/settings/ai", get(settings::get_ai).put(settings::put_ai))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = state.engine().await;
    Json(json!({
        "status": "ok",
        "store": if state.config.use_memory_store() { "memory" } else { "postgres" },
        "provider": engine.provider_name(),
    }))
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            StoreError::Rejected(msg) => ApiError::BadRequest(msg),
            other => ApiError::Store(other),
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        match e {
            GenerateError::InvalidInput(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), false),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), false),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), false),
            ApiError::Store(e) => {
                tracing::error!("Persistence failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong saving your changes. Please try again.".to_string(),
                    true,
                )
            }
        };
        (status, Json(json!({ "error": message, "retryable": retryable }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Caller identity taken from request headers.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Option<String>,
    pub role: Role,
    pub demo: bool,
}

impl Identity {
    pub fn require_staff(&self) -> ApiResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{} accounts cannot perform this action",
                self.role
            )))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let demo = state.config.demo_mode
            || header(parts, "x-demo-mode")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);
        // Without a role header, demo callers act as a teacher and everyone else as a pupil.
        let role = match header(parts, "x-user-role") {
            Some(raw) => raw.parse::<Role>().map_err(ApiError::BadRequest)?,
            None if demo => Role::Teacher,
            None => Role::Pupil,
        };
        Ok(Self {
            user_id: header(parts, "x-user-id").map(str::to_string),
            role,
            demo,
        })
    }
}

/// Reads a text form field, turning a broken upload stream into a 400.
pub(crate) async fn text_field(field: Field<'_>) -> ApiResult<String> {
    let name = field.name().unwrap_or("form").to_string();
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid {} field: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, Multipart, Request};
    use axum::http::header::CONTENT_TYPE;

    async fn first_field_text(body: &'static str) -> ApiResult<String> {
        let request = Request::builder()
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap();
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        let field = multipart.next_field().await.unwrap().expect("one field");
        text_field(field).await
    }

    #[tokio::test]
    async fn complete_text_field_is_read() {
        let body = "--XYZ\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nBridges\r\n--XYZ--\r\n";
        assert_eq!(first_field_text(body).await.unwrap(), "Bridges");
    }

    #[tokio::test]
    async fn truncated_text_field_is_a_bad_request() {
        let body = "--XYZ\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nBridg";
        match first_field_text(body).await {
            Err(ApiError::BadRequest(msg)) => assert!(msg.contains("title"), "{}", msg),
            other => panic!("expected a bad request, got {:?}", other),
        }
    }
}
