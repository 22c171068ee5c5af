use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, ApiResult, Identity};
use crate::agents::Generation;
use crate::db::{Entity, Record, StoreError};
use crate::export::{self, ExportedReport};
use crate::models::{ClassReportRequest, PupilReport, PupilReportRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReportBody<T> {
    #[serde(flatten)]
    request: T,
    #[serde(default)]
    prompt: Option<String>,
}

async fn persist(
    state: &AppState,
    identity: &Identity,
    generation: Generation<PupilReport>,
) -> ApiResult<impl IntoResponse> {
    let mut data = serde_json::to_value(&generation.value).map_err(StoreError::from)?;
    data["fallback"] = json!(generation.fallback);
    data["createdBy"] = json!(identity.user_id);
    let record = state.store.create(Entity::Reports, data).await?;
    tracing::info!("Saved {} report {}", generation.value.report_type.as_str(), record.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": record.id, "report": generation })),
    ))
}

pub async fn pupil_report(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<ReportBody<PupilReportRequest>>,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    let engine = state.engine().await;
    let generation = engine.pupil_report(&body.request, body.prompt.as_deref()).await?;
    persist(&state, &identity, generation).await
}

pub async fn class_report(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<ReportBody<ClassReportRequest>>,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    let engine = state.engine().await;
    let generation = engine.class_report(&body.request, body.prompt.as_deref()).await?;
    persist(&state, &identity, generation).await
}

fn report_from(record: &Record) -> ApiResult<PupilReport> {
    serde_json::from_value(record.data.clone())
        .map_err(|e| ApiError::BadRequest(format!("Report {} cannot be exported: {}", record.id, e)))
}

pub async fn export_one(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    let record = state.store.get(Entity::Reports, &id).await?;
    let report = report_from(&record)?;
    let disposition = format!("attachment; filename=\"{}\"", export::file_name(&report.title));
    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(ExportedReport::from(&report)),
    ))
}

#[derive(Deserialize)]
pub struct BatchBody {
    ids: Vec<String>,
}

pub async fn export_batch(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<BatchBody>,
) -> ApiResult<impl IntoResponse> {
    identity.require_staff()?;
    if body.ids.is_empty() {
        return Err(ApiError::BadRequest("select at least one report".to_string()));
    }

    let mut reports = Vec::with_capacity(body.ids.len());
    for id in &body.ids {
        let record = state.store.get(Entity::Reports, id).await?;
        reports.push(report_from(&record)?);
    }
    let filename = format!("reports_{}.json", chrono::Utc::now().format("%Y%m%d"));
    Ok((
        [(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename))],
        Json(export::batch(&reports)),
    ))
}
