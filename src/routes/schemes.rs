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
use crate::models::SchemeDocument;
use crate::state::AppState;
use crate::storage;

fn is_pdf(filename: &str, content_type: Option<&str>) -> bool {
    content_type == Some("application/pdf") || filename.to_lowercase().ends_with(".pdf")
}

async fn extract_text(
    filename: &str,
    content_type: Option<&str>,
    data: Vec<u8>,
) -> ApiResult<String> {
    if !is_pdf(filename, content_type) {
        return Ok(String::from_utf8_lossy(&data).into_owned());
    }
    let name = filename.to_string();
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| ApiError::BadRequest(format!("Could not read {}: {}", name, e)))?
        .map_err(|e| {
            tracing::warn!("PDF extraction failed for {}: {}", name, e);
            ApiError::BadRequest(format!("Could not read text from {}", name))
        })
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;

    let mut doc = SchemeDocument {
        title: String::new(),
        subject: String::new(),
        year_group: String::new(),
        file_name: None,
        text: String::new(),
    };
    let mut prompt: Option<String> = None;
    let mut stored_as: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("scheme.txt").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?;
            if data.is_empty() {
                continue;
            }
            let saved = storage::save_upload(
                &state.config.upload_folder,
                &filename,
                content_type.as_deref(),
                &data,
            )
            .await;
            match saved {
                Ok(file) => stored_as = file.stored_as,
                Err(e) => tracing::warn!("Could not keep a copy of {}: {}", filename, e),
            }
            doc.text = extract_text(&filename, content_type.as_deref(), data.to_vec()).await?;
            doc.file_name = Some(filename);
            continue;
        }

        let text = text_field(field).await?;
        match name.as_str() {
            "title" => doc.title = text.trim().to_string(),
            "subject" => doc.subject = text.trim().to_string(),
            "year_group" | "yearGroup" => doc.year_group = text.trim().to_string(),
            "prompt" => prompt = Some(text),
            _ => {}
        }
    }

    if doc.title.is_empty() {
        if let Some((stem, _)) = doc.file_name.as_deref().and_then(|f| f.rsplit_once('.')) {
            doc.title = stem.to_string();
        }
    }

    let engine = state.engine().await;
    let generation = engine.scheme_analysis(&doc, prompt.as_deref()).await?;

    let record = state
        .store
        .create(
            Entity::Schemes,
            json!({
                "title": doc.title,
                "subject": doc.subject,
                "year_group": doc.year_group,
                "file_name": doc.file_name,
                "stored_as": stored_as,
                "analysis": generation.value,
                "fallback": generation.fallback,
                "created_by": identity.user_id,
            }),
        )
        .await?;

    tracing::info!(
        "Analysed scheme {} into {} lessons",
        record.id,
        generation.value.lessons.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": record.id, "analysis": generation })),
    ))
}
