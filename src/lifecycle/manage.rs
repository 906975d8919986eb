//! Record removal, file access, previews and letterhead logos.

use std::time::Duration;

use tracing::{info, warn};

use super::{require, DocumentLifecycle, IncomingFile, LifecycleResult};
use crate::error::LifecycleError;
use crate::models::{Actor, TenantProfile};
use crate::storage::{BackendKind, StorageReference, UploadRequest, MAX_SIGNED_URL_TTL};

/// Where to fetch a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: String,
    /// Lifetime of a signed URL. `None` for stable public URLs.
    pub expires_in: Option<Duration>,
}

impl DocumentLifecycle {
    /// Delete a record and then its stored file.
    ///
    /// The record goes first so no record ever points at a deleted file. A
    /// failed file delete is logged and leaves an orphaned object.
    pub async fn discard_document(&self, tenant_id: &str, document_id: &str) -> LifecycleResult<()> {
        let record = self.store.find_by_id(tenant_id, document_id).await?;
        self.store.delete(tenant_id, document_id).await?;

        if let Some(reference) = &record.storage_reference {
            if let Err(e) = self.gateway.delete(reference).await {
                warn!(
                    backend = %reference.backend,
                    key = %reference.key,
                    "Failed to delete file of discarded document: {}",
                    e
                );
            }
        }
        info!(tenant = %tenant_id, id = %document_id, "Discarded document");
        Ok(())
    }

    /// Access URL for a record's stored file.
    ///
    /// Signed URLs expire after `ttl` (default from the lifecycle config)
    /// and must not be cached longer. The TTL must lie between one second
    /// and [`MAX_SIGNED_URL_TTL`].
    pub async fn download_url(
        &self,
        tenant_id: &str,
        document_id: &str,
        ttl: Option<Duration>,
    ) -> LifecycleResult<DownloadLink> {
        let ttl = ttl.unwrap_or(self.config.signed_url_ttl);
        if ttl.as_secs() == 0 || ttl > MAX_SIGNED_URL_TTL {
            return Err(LifecycleError::InvalidInput(format!(
                "link lifetime must be between 1 and {} seconds",
                MAX_SIGNED_URL_TTL.as_secs()
            )));
        }

        let record = self.store.find_by_id(tenant_id, document_id).await?;
        let reference = record.storage_reference.ok_or_else(|| {
            LifecycleError::NotFound("document has no stored file".to_string())
        })?;
        let url = self.gateway.resolve_access_url(&reference, Some(ttl)).await?;
        let expires_in = match reference.backend {
            BackendKind::ObjectStore => Some(ttl),
            BackendKind::MediaHost => None,
        };
        Ok(DownloadLink { url, expires_in })
    }

    /// Filled-in markup of a pending letter, before rendering.
    pub async fn preview(&self, tenant_id: &str, document_id: &str) -> LifecycleResult<String> {
        let record = self.store.find_by_id(tenant_id, document_id).await?;
        if !record.is_pending() {
            return Err(LifecycleError::InvalidStateTransition(
                "only pending documents can be previewed".to_string(),
            ));
        }
        record
            .content
            .ok_or_else(|| LifecycleError::NotFound("document has no generated content".to_string()))
    }

    /// Upload a new letterhead logo and point the tenant profile at it.
    ///
    /// The profile is only switched if its logo has not changed since it
    /// was read; otherwise the new upload is deleted again. The previous
    /// logo is removed once the swap succeeded.
    pub async fn replace_letterhead_logo(
        &self,
        tenant_id: &str,
        file: IncomingFile,
        actor: &Actor,
    ) -> LifecycleResult<TenantProfile> {
        require("tenant id", tenant_id)?;
        let content_type = file.resolved_content_type();
        if !content_type.starts_with("image/") {
            return Err(LifecycleError::InvalidInput(format!(
                "logo must be an image, got {}",
                content_type
            )));
        }

        let profile = self.tenants.profile(tenant_id).await?.ok_or_else(|| {
            LifecycleError::NotFound("tenant profile is not configured".to_string())
        })?;
        let previous = profile.logo.clone();

        let mut upload = UploadRequest::new(
            file.bytes,
            content_type,
            file.file_name,
            format!("{}/logos", tenant_id),
        );
        if let Some(scratch) = file.scratch_file {
            upload = upload.with_scratch_file(scratch);
        }
        let reference = self.gateway.upload(upload, self.config.logo_backend).await?;

        let swapped = match self
            .tenants
            .replace_logo(tenant_id, previous.as_ref(), &reference)
            .await
        {
            Ok(swapped) => swapped,
            Err(e) => {
                self.compensate(&reference, "replace logo").await;
                return Err(e.into());
            }
        };
        if !swapped {
            self.compensate(&reference, "replace logo").await;
            return Err(LifecycleError::Conflict(
                "the logo was changed concurrently, retry".to_string(),
            ));
        }

        if let Some(old) = previous.filter(|old| *old != reference) {
            self.remove_replaced_logo(&old).await;
        }
        info!(tenant = %tenant_id, actor = %actor.id, "Replaced letterhead logo");

        Ok(TenantProfile {
            logo: Some(reference),
            ..profile
        })
    }

    async fn remove_replaced_logo(&self, old: &StorageReference) {
        if let Err(e) = self.gateway.delete(old).await {
            warn!(
                backend = %old.backend,
                key = %old.key,
                "Failed to delete replaced logo: {}",
                e
            );
        }
    }
}
