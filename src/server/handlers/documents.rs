//! Document endpoints: archive, generation requests, approval and access.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::super::AppState;
use super::helpers::{data, ActorHeaders, ApiError};
use crate::lifecycle::{ArchiveMetadata, IncomingFile};
use crate::models::{Direction, DocumentRecord, DocumentStatus, FormData};
use crate::repository::{DocumentFilter, DocumentStore};

/// Largest page a listing returns.
const MAX_PAGE_SIZE: i64 = 200;

/// Document response format for API.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub serial_number: String,
    pub title: String,
    pub category: String,
    pub document_date: NaiveDate,
    pub direction: Direction,
    /// `pending`, `approved`, `rejected`, or `archived` for manual uploads.
    pub status: &'static str,
    pub template_id: Option<String>,
    pub form_data: Option<FormData>,
    pub has_file: bool,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(record: DocumentRecord) -> Self {
        Self {
            status: record.status.map(|s| s.as_str()).unwrap_or("archived"),
            has_file: record.storage_reference.is_some(),
            id: record.id,
            serial_number: record.serial_number,
            title: record.title,
            category: record.category,
            document_date: record.document_date,
            direction: record.direction,
            template_id: record.template_id,
            form_data: record.rendered_form_data,
            created_by: record.created_by,
            approved_by: record.approved_by,
            approved_at: record.approved_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Query parameters for document listing.
#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    pub status: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl DocumentsQuery {
    fn into_filter(self) -> Result<DocumentFilter, ApiError> {
        let status = match self.status.as_deref() {
            Some(s) => Some(
                DocumentStatus::from_str(s)
                    .ok_or_else(|| ApiError::invalid_input(format!("unknown status '{}'", s)))?,
            ),
            None => None,
        };
        let direction = match self.direction.as_deref() {
            Some(d) => Some(
                Direction::from_str(d)
                    .ok_or_else(|| ApiError::invalid_input(format!("unknown direction '{}'", d)))?,
            ),
            None => None,
        };
        Ok(DocumentFilter {
            status,
            direction,
            limit: self.limit.map(|l| l.clamp(1, MAX_PAGE_SIZE)),
            offset: self.offset.map(|o| o.max(0)),
        })
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(params): Query<DocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = params.into_filter()?;
    let records = state.doc_repo.list(&tenant, &filter).await?;
    let items: Vec<DocumentResponse> = records.into_iter().map(Into::into).collect();
    Ok(data(items))
}

pub async fn show_document(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.doc_repo.find_by_id(&tenant, &id).await?;
    Ok(data(DocumentResponse::from(record)))
}

/// Body for archiving an existing letter. The file travels base64-encoded.
#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
    #[serde(flatten)]
    pub metadata: ArchiveMetadata,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_base64: String,
}

pub async fn archive_document(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<ArchiveBody>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.file_base64.trim())
        .map_err(|e| ApiError::invalid_input(format!("file_base64 is not valid base64: {}", e)))?;

    let mut file = IncomingFile::new(bytes, body.file_name);
    if let Some(content_type) = body.content_type {
        file = file.with_content_type(content_type);
    }

    let record = state
        .lifecycle
        .archive_existing_document(&tenant, body.metadata, file, &actor)
        .await?;
    Ok((StatusCode::CREATED, data(DocumentResponse::from(record))))
}

#[derive(Debug, Deserialize)]
pub struct GenerationBody {
    pub template_id: String,
    #[serde(default)]
    pub form_data: FormData,
}

pub async fn request_generation(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<GenerationBody>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .lifecycle
        .request_generation(&tenant, &body.template_id, body.form_data, &actor)
        .await?;
    Ok((StatusCode::CREATED, data(DocumentResponse::from(record))))
}

pub async fn approve_document(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
    ActorHeaders(actor): ActorHeaders,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .lifecycle
        .generate_and_approve(&tenant, &id, &actor)
        .await?;
    Ok(data(DocumentResponse::from(record)))
}

pub async fn reject_document(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
    ActorHeaders(actor): ActorHeaders,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.lifecycle.reject(&tenant, &id, &actor).await?;
    Ok(data(DocumentResponse::from(record)))
}

pub async fn discard_document(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
    ActorHeaders(actor): ActorHeaders,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(tenant = %tenant, id = %id, actor = %actor.id, "Discard requested");
    state.lifecycle.discard_document(&tenant, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
    /// Absent for stable public URLs.
    pub expires_in_secs: Option<u64>,
}

pub async fn download_url(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
    Query(params): Query<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ttl = params.ttl_secs.map(Duration::from_secs);
    let link = state.lifecycle.download_url(&tenant, &id, ttl).await?;
    Ok(data(DownloadResponse {
        url: link.url,
        expires_in_secs: link.expires_in.map(|ttl| ttl.as_secs()),
    }))
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub content: String,
}

pub async fn preview_document(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state.lifecycle.preview(&tenant, &id).await?;
    Ok(data(PreviewResponse { content }))
}
