//! Gateway that routes storage calls to the backend named in each reference.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{
    BackendKind, StorageBackend, StorageError, StorageGateway, StorageReference, StorageResult,
    UploadRequest, DEFAULT_SIGNED_URL_TTL,
};

/// Storage gateway over one optional backend per [`BackendKind`].
#[derive(Clone)]
pub struct BackendRouter {
    object_store: Option<Arc<dyn StorageBackend>>,
    media_host: Option<Arc<dyn StorageBackend>>,
    default_ttl: Duration,
}

impl Default for BackendRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRouter {
    /// Create a router with no backends configured.
    pub fn new() -> Self {
        Self {
            object_store: None,
            media_host: None,
            default_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    /// Register a backend under the kind it reports.
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        match backend.kind() {
            BackendKind::ObjectStore => self.object_store = Some(backend),
            BackendKind::MediaHost => self.media_host = Some(backend),
        }
        self
    }

    /// Override the TTL used when callers do not pass one.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Whether a backend is registered for `kind`.
    pub fn has_backend(&self, kind: BackendKind) -> bool {
        self.slot(kind).is_some()
    }

    fn slot(&self, kind: BackendKind) -> Option<&Arc<dyn StorageBackend>> {
        match kind {
            BackendKind::ObjectStore => self.object_store.as_ref(),
            BackendKind::MediaHost => self.media_host.as_ref(),
        }
    }

    fn backend(&self, kind: BackendKind) -> StorageResult<&Arc<dyn StorageBackend>> {
        self.slot(kind).ok_or_else(|| {
            StorageError::Unavailable(format!("no {} backend is configured", kind))
        })
    }
}

#[async_trait]
impl StorageGateway for BackendRouter {
    async fn upload(
        &self,
        request: UploadRequest,
        backend: BackendKind,
    ) -> StorageResult<StorageReference> {
        if request.bytes.is_empty() {
            return Err(StorageError::InvalidInput(
                "refusing to store an empty file".to_string(),
            ));
        }

        let key = self.backend(backend)?.put(&request).await?;
        debug!(backend = %backend, key = %key, "Stored artifact");
        Ok(StorageReference::new(backend, key))
    }

    async fn delete(&self, reference: &StorageReference) -> StorageResult<()> {
        self.backend(reference.backend)?
            .remove(&reference.key)
            .await?;
        debug!(backend = %reference.backend, key = %reference.key, "Deleted artifact");
        Ok(())
    }

    async fn resolve_access_url(
        &self,
        reference: &StorageReference,
        ttl: Option<Duration>,
    ) -> StorageResult<String> {
        self.backend(reference.backend)?
            .access_url(&reference.key, ttl.unwrap_or(self.default_ttl))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn router() -> (BackendRouter, MemoryBackend, MemoryBackend) {
        let store = MemoryBackend::new(BackendKind::ObjectStore);
        let media = MemoryBackend::new(BackendKind::MediaHost);
        let router = BackendRouter::new()
            .with_backend(Arc::new(store.clone()))
            .with_backend(Arc::new(media.clone()));
        (router, store, media)
    }

    #[tokio::test]
    async fn test_upload_resolve_round_trip_both_backends() {
        let (router, store, media) = router();
        let payload = b"%PDF-1.4 letter".to_vec();

        for (kind, backend) in [(BackendKind::ObjectStore, &store), (BackendKind::MediaHost, &media)] {
            let reference = router
                .upload(
                    UploadRequest::new(payload.clone(), "application/pdf", "letter.pdf", "letters"),
                    kind,
                )
                .await
                .unwrap();
            assert_eq!(reference.backend, kind);

            let url = router.resolve_access_url(&reference, None).await.unwrap();
            assert_eq!(backend.fetch(&url).await.unwrap().to_vec(), payload);
        }
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let (router, store, _) = router();
        let err = router
            .upload(
                UploadRequest::new(Vec::new(), "application/pdf", "empty.pdf", "letters"),
                BackendKind::ObjectStore,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_routes_by_reference() {
        let (router, store, media) = router();
        let reference = router
            .upload(
                UploadRequest::new(&b"logo"[..], "image/png", "logo.png", "logos"),
                BackendKind::MediaHost,
            )
            .await
            .unwrap();
        assert!(media.contains(&reference.key).await);

        router.delete(&reference).await.unwrap();
        router.delete(&reference).await.unwrap();
        assert!(!media.contains(&reference.key).await);
        assert!(store.is_empty().await);

        let never = StorageReference::new(BackendKind::ObjectStore, "nope/1-x.pdf");
        router.delete(&never).await.unwrap();

        assert!(matches!(
            router.resolve_access_url(&reference, None).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_unavailable() {
        let router = BackendRouter::new().with_backend(Arc::new(MemoryBackend::new(BackendKind::MediaHost)));
        let err = router
            .upload(
                UploadRequest::new(&b"x"[..], "application/pdf", "x.pdf", "letters"),
                BackendKind::ObjectStore,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert!(!router.has_backend(BackendKind::ObjectStore));
    }
}
