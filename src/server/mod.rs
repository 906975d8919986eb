//! JSON API over the document lifecycle.
//!
//! All routes are scoped by tenant under `/api/tenants/:tenant`. Callers
//! identify the acting user with `X-Actor-*` headers; the server trusts
//! them and does no authentication of its own.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::lifecycle::DocumentLifecycle;
use crate::repository::{DieselDocumentRepository, DieselTemplateRepository, DieselTenantRepository};
use crate::services::Services;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: DocumentLifecycle,
    pub doc_repo: Arc<DieselDocumentRepository>,
    pub template_repo: Arc<DieselTemplateRepository>,
    pub tenant_repo: Arc<DieselTenantRepository>,
}

impl AppState {
    pub fn new(services: &Services) -> Self {
        Self {
            lifecycle: services.lifecycle.clone(),
            doc_repo: services.documents.clone(),
            template_repo: services.templates.clone(),
            tenant_repo: services.tenants.clone(),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let app = create_router(AppState::new(&services));

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
