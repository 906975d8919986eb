//! HTTP request handlers for the web server.

mod documents;
mod helpers;
mod tenants;

use axum::response::IntoResponse;

pub use documents::{
    approve_document, archive_document, discard_document, download_url, list_documents,
    preview_document, reject_document, request_generation, show_document,
};
pub use tenants::{
    list_templates, replace_logo, save_profile, save_template, show_profile, show_template,
};

pub async fn health() -> impl IntoResponse {
    helpers::data(serde_json::json!({ "status": "ok" }))
}
