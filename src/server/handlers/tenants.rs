//! Template and letterhead endpoints.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use base64::Engine;
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{data, ActorHeaders, ApiError};
use crate::error::LifecycleError;
use crate::lifecycle::IncomingFile;
use crate::models::{LetterTemplate, TenantProfile};
use crate::repository::{TemplateSource, TenantDirectory};

pub async fn list_templates(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = state.template_repo.list(&tenant).await?;
    Ok(data(templates))
}

pub async fn show_template(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state
        .template_repo
        .template(&tenant, &id)
        .await?
        .ok_or_else(|| LifecycleError::NotFound(format!("template '{}' not found", id)))?;
    Ok(data(template))
}

#[derive(Debug, Deserialize)]
pub struct TemplateBody {
    pub name: String,
    pub category: String,
    pub body: String,
}

pub async fn save_template(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<TemplateBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.trim().is_empty() || body.category.trim().is_empty() {
        return Err(ApiError::invalid_input("name and category are required"));
    }

    let mut template = LetterTemplate::new(&tenant, &id, &body.name, &body.category, &body.body);
    if let Some(existing) = state.template_repo.template(&tenant, &id).await? {
        template.created_at = existing.created_at;
    }
    state.template_repo.save(&template).await?;
    tracing::info!(tenant = %tenant, template = %id, actor = %actor.id, "Saved template");
    Ok(data(template))
}

pub async fn show_profile(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .tenant_repo
        .profile(&tenant)
        .await?
        .ok_or_else(|| LifecycleError::NotFound("tenant profile is not configured".to_string()))?;
    Ok(data(profile))
}

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    pub display_name: String,
    pub letterhead_markup: Option<String>,
}

/// Create or update the display name and letterhead markup. The logo is
/// managed separately and kept as is.
pub async fn save_profile(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<ProfileBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.display_name.trim().is_empty() {
        return Err(ApiError::invalid_input("display_name is required"));
    }

    let mut profile = state
        .tenant_repo
        .profile(&tenant)
        .await?
        .unwrap_or_else(|| TenantProfile::new(&tenant, &body.display_name));
    profile.display_name = body.display_name;
    profile.letterhead_markup = body.letterhead_markup;
    state.tenant_repo.save(&profile).await?;
    tracing::info!(tenant = %tenant, actor = %actor.id, "Saved tenant profile");
    Ok(data(profile))
}

#[derive(Debug, Deserialize)]
pub struct LogoBody {
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_base64: String,
}

pub async fn replace_logo(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<LogoBody>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.file_base64.trim())
        .map_err(|e| ApiError::invalid_input(format!("file_base64 is not valid base64: {}", e)))?;

    let mut file = IncomingFile::new(bytes, body.file_name);
    if let Some(content_type) = body.content_type {
        file = file.with_content_type(content_type);
    }
    let profile = state
        .lifecycle
        .replace_letterhead_logo(&tenant, file, &actor)
        .await?;
    Ok(data(profile))
}
