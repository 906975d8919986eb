//! Service wiring shared by the CLI and the web server.
//!
//! Builds the database context, storage gateway, renderer and sequence
//! allocator from [`Settings`] and hands them to a [`DocumentLifecycle`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ConfigError, Settings};
use crate::lifecycle::DocumentLifecycle;
use crate::render::{DocumentRenderer, HtmlPdfRenderer, HtmlRenderer};
use crate::repository::{
    redact_url_password, DbContext, DieselDocumentRepository, DieselTemplateRepository,
    DieselTenantRepository,
};
use crate::sequence::SequenceAllocator;
use crate::storage::{
    BackendKind, BackendRouter, MediaHostBackend, MemoryBackend, ObjectStoreBackend,
};

/// Everything a front end needs to serve requests.
#[derive(Clone)]
pub struct Services {
    pub db: DbContext,
    pub documents: Arc<DieselDocumentRepository>,
    pub templates: Arc<DieselTemplateRepository>,
    pub tenants: Arc<DieselTenantRepository>,
    pub sequences: SequenceAllocator,
    pub lifecycle: DocumentLifecycle,
}

impl Services {
    /// Connect to the database, make sure the schema exists and build the
    /// storage and rendering backends.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;

        let url = settings.database_url();
        info!("Using database {}", redact_url_password(&url));
        let db = DbContext::from_url(&url)?;
        db.init_schema().await?;

        let gateway = Arc::new(build_gateway(settings)?);
        let renderer = build_renderer(settings);

        let documents = Arc::new(db.documents());
        let templates = Arc::new(db.templates());
        let tenants = Arc::new(db.tenants());
        let sequences = SequenceAllocator::new(Arc::new(db.counters()));

        let lifecycle = DocumentLifecycle::new(
            documents.clone(),
            gateway,
            sequences.clone(),
            renderer,
            templates.clone(),
            tenants.clone(),
        )
        .with_config(settings.lifecycle_config());

        Ok(Self {
            db,
            documents,
            templates,
            tenants,
            sequences,
            lifecycle,
        })
    }
}

/// Register one backend per kind that is configured.
pub fn build_gateway(settings: &Settings) -> Result<BackendRouter, ConfigError> {
    let storage = &settings.storage;
    let mut router = BackendRouter::new().with_default_ttl(settings.signed_url_ttl());

    if storage.in_memory {
        warn!("Using in-memory storage, stored files are lost on exit");
        return Ok(router
            .with_backend(Arc::new(MemoryBackend::new(BackendKind::ObjectStore)))
            .with_backend(Arc::new(MemoryBackend::new(BackendKind::MediaHost))));
    }

    if let Some(config) = &storage.object_store {
        debug!(?config, "Configuring object store");
        let backend = ObjectStoreBackend::new(config.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        router = router.with_backend(Arc::new(backend));
    }
    if let Some(config) = &storage.media_host {
        debug!(?config, "Configuring media host");
        let backend = MediaHostBackend::new(config.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        router = router.with_backend(Arc::new(backend));
    }
    Ok(router)
}

/// PDF converter when available, otherwise plain HTML if allowed.
///
/// A missing converter without the HTML fallback is not an error here;
/// approvals fail with a render error until it is installed.
pub fn build_renderer(settings: &Settings) -> Arc<dyn DocumentRenderer> {
    let render = &settings.render;
    match HtmlPdfRenderer::locate(&render.binary) {
        Ok(renderer) => {
            debug!(binary = %renderer.binary().display(), "Using PDF converter");
            match &render.args {
                Some(args) => Arc::new(renderer.with_args(args.clone())),
                None => Arc::new(renderer),
            }
        }
        Err(e) if render.html_fallback => {
            warn!("{}; storing approved letters as HTML", e);
            Arc::new(HtmlRenderer)
        }
        Err(e) => {
            warn!("{}; approvals will fail until it is installed", e);
            let renderer = HtmlPdfRenderer::with_binary(&render.binary);
            match &render.args {
                Some(args) => Arc::new(renderer.with_args(args.clone())),
                None => Arc::new(renderer),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_settings(dir: &tempfile::TempDir) -> Settings {
        let mut settings = Settings::from_toml(
            "[storage]\nin_memory = true\n\n[render]\nbinary = \"no-such-converter\"\nhtml_fallback = true\n",
        )
        .unwrap();
        settings.database_url = Some(format!("sqlite:{}", dir.path().join("t.db").display()));
        settings
    }

    #[tokio::test]
    async fn test_from_settings_initializes_schema() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::from_settings(&in_memory_settings(&dir))
            .await
            .unwrap();

        let tables = services.db.list_tables().await.unwrap();
        assert!(tables.iter().any(|t| t == "documents"));
        assert_eq!(services.sequences.next_value("school-1", "2025").await.unwrap(), 1);
        assert_eq!(
            services.lifecycle.config().signed_url_ttl,
            crate::storage::DEFAULT_SIGNED_URL_TTL
        );
    }

    #[test]
    fn test_gateway_registers_memory_backends() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_gateway(&in_memory_settings(&dir)).unwrap();
        assert!(router.has_backend(BackendKind::ObjectStore));
        assert!(router.has_backend(BackendKind::MediaHost));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_rejected() {
        let settings = Settings::default();
        assert!(Services::from_settings(&settings).await.is_err());
    }
}
