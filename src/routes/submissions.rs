use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::{text_field, ApiError, ApiResult, Identity};
use crate::db::Entity;
use crate::models::WorkSubmission;
use crate::state::AppState;
use crate::storage;

/// Receives pupil work, stores it, grades it and records the grade.
pub async fn submit_work(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;

    let mut submission = WorkSubmission {
        title: String::new(),
        description: String::new(),
        files: Vec::new(),
        project_id: String::new(),
    };
    let mut prompt: Option<String> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" | "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?;
                if !data.is_empty() {
                    uploads.push((filename, content_type, data));
                }
            }
            _ => {
                let text = text_field(field).await?;
                match name.as_str() {
                    "title" => submission.title = text.trim().to_string(),
                    "description" => submission.description = text,
                    "project_id" | "project" => submission.project_id = text.trim().to_string(),
                    "prompt" => prompt = Some(text),
                    _ => {}
                }
            }
        }
    }

    if submission.title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if submission.project_id.is_empty() {
        return Err(ApiError::BadRequest("project is required".to_string()));
    }

    for (filename, content_type, data) in uploads {
        let file = storage::save_upload(
            &state.config.upload_folder,
            &filename,
            content_type.as_deref(),
            &data,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to save upload {}: {}", filename, e);
            ApiError::BadRequest(format!("Could not save {}", filename))
        })?;
        submission.files.push(file);
    }

    let record = state
        .store
        .create(
            Entity::Submissions,
            json!({
                "title": submission.title,
                "description": submission.description,
                "project_id": submission.project_id,
                "files": submission.files,
                "submitted_by": identity.user_id,
                "status": "submitted",
            }),
        )
        .await?;

    let engine = state.engine().await;
    let generation = engine.grade_work(&submission, prompt.as_deref()).await?;

    let grade = state
        .store
        .create(
            Entity::Grades,
            json!({
                "submission_id": record.id,
                "project_id": submission.project_id,
                "result": generation.value,
                "fallback": generation.fallback,
                "graded_by": identity.user_id,
            }),
        )
        .await?;
    let record = state
        .store
        .update(
            Entity::Submissions,
            &record.id,
            json!({ "status": "graded", "grade_id": grade.id }),
        )
        .await?;

    tracing::info!("Graded submission {} ({})", record.id, submission.title);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "submission": record.to_json(),
            "gradeId": grade.id,
            "grade": generation,
        })),
    ))
}
