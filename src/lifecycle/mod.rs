//! Document lifecycle orchestration.
//!
//! Each operation is a short saga over the record store, the storage gateway
//! and the renderer. Uploads always happen before the record write that
//! references them, and a failed record write triggers a compensating
//! delete of the upload. Compensation is best effort: a failed delete is
//! logged with the object key and the original error is returned.
//!
//! No lock is held across rendering or uploads. The only cross-request
//! exclusion is the sequence allocator's atomic increment and the
//! conditional status updates in the record store.

mod approve;
mod archive;
mod dates;
mod manage;
mod request;
mod serial;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{error, warn};

use crate::error::LifecycleError;
use crate::render::DocumentRenderer;
use crate::repository::{DocumentStore, TemplateSource, TenantDirectory};
use crate::sequence::SequenceAllocator;
use crate::storage::{BackendKind, StorageGateway, StorageReference, DEFAULT_SIGNED_URL_TTL};

pub use archive::ArchiveMetadata;
pub use dates::{format_long_date, parse_document_date};
pub use manage::DownloadLink;
pub use serial::format_serial_number;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Which backend each kind of artifact goes to.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub archive_backend: BackendKind,
    pub generated_backend: BackendKind,
    pub logo_backend: BackendKind,
    pub signed_url_ttl: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            archive_backend: BackendKind::ObjectStore,
            generated_backend: BackendKind::ObjectStore,
            logo_backend: BackendKind::MediaHost,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }
}

/// A file supplied by a caller.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub bytes: Bytes,
    pub file_name: String,
    /// Declared content type; detected from the bytes and name when absent.
    pub content_type: Option<String>,
    /// Local copy the storage backend removes after a successful upload.
    pub scratch_file: Option<PathBuf>,
}

impl IncomingFile {
    pub fn new(bytes: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            content_type: None,
            scratch_file: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_scratch_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_file = Some(path.into());
        self
    }

    /// Declared type, else magic-byte detection, else the file extension.
    pub fn resolved_content_type(&self) -> String {
        if let Some(declared) = self.content_type.as_deref().filter(|t| !t.trim().is_empty()) {
            return declared.to_string();
        }
        if let Some(kind) = infer::get(&self.bytes) {
            return kind.mime_type().to_string();
        }
        mime_guess::from_path(&self.file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    }
}

/// Coordinates rendering, storage and record persistence for documents.
#[derive(Clone)]
pub struct DocumentLifecycle {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn StorageGateway>,
    sequences: SequenceAllocator,
    renderer: Arc<dyn DocumentRenderer>,
    templates: Arc<dyn TemplateSource>,
    tenants: Arc<dyn TenantDirectory>,
    config: LifecycleConfig,
}

impl DocumentLifecycle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn StorageGateway>,
        sequences: SequenceAllocator,
        renderer: Arc<dyn DocumentRenderer>,
        templates: Arc<dyn TemplateSource>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            store,
            gateway,
            sequences,
            renderer,
            templates,
            tenants,
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Undo an upload after a later step failed.
    ///
    /// Never fails: a delete error leaves an orphaned object, which is
    /// logged with its key for manual cleanup.
    async fn compensate(&self, reference: &StorageReference, operation: &str) {
        match self.gateway.delete(reference).await {
            Ok(()) => warn!(
                operation,
                backend = %reference.backend,
                key = %reference.key,
                "Rolled back upload after failure"
            ),
            Err(e) => error!(
                operation,
                backend = %reference.backend,
                key = %reference.key,
                "Compensating delete failed, stored object is orphaned: {}",
                e
            ),
        }
    }
}

fn require(field: &str, value: &str) -> LifecycleResult<()> {
    if value.trim().is_empty() {
        return Err(LifecycleError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_resolution() {
        let declared = IncomingFile::new(&b"abc"[..], "a.bin").with_content_type("application/pdf");
        assert_eq!(declared.resolved_content_type(), "application/pdf");

        let sniffed = IncomingFile::new(&b"%PDF-1.7 rest"[..], "scan.dat");
        assert_eq!(sniffed.resolved_content_type(), "application/pdf");

        let by_name = IncomingFile::new(&b"plain words"[..], "notes.txt");
        assert_eq!(by_name.resolved_content_type(), "text/plain");

        let unknown = IncomingFile::new(&b"plain words"[..], "noext");
        assert_eq!(unknown.resolved_content_type(), "application/octet-stream");
    }
}
