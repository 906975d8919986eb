//! Storage gateway for letter artifacts.
//!
//! Two structurally different backends sit behind one contract:
//! - a durable S3-compatible object store (explicit keys, signed URLs)
//! - a managed media host (provider-assigned ids, public URLs)
//!
//! Callers pick a backend with [`BackendKind`] and get back a
//! [`StorageReference`] that records both the backend and the key, so later
//! deletes and URL lookups never need outside context.

mod gateway;
mod media_host;
mod memory;
mod naming;
mod object_store;
mod reference;
mod sigv4;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

pub use gateway::BackendRouter;
pub use media_host::{MediaHostBackend, MediaHostConfig};
pub use memory::MemoryBackend;
pub use naming::{object_key, sanitize_object_name};
pub use object_store::{ObjectStoreBackend, ObjectStoreConfig};
pub use reference::{BackendKind, StorageReference};

/// Default lifetime of signed access URLs (15 minutes).
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Longest lifetime a signed access URL may have (7 days, the SigV4 limit).
pub const MAX_SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from storage operations.
///
/// Messages never carry credentials; object keys only appear in logs.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Stored object not found")]
    NotFound,
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed storage reference: {0}")]
    MalformedReference(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the request URL, which carries keys and signatures.
        StorageError::Unavailable(e.without_url().to_string())
    }
}

/// Bytes to store plus the naming hints backends use to build keys.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Bytes,
    pub content_type: String,
    pub suggested_name: String,
    pub category: String,
    /// Local scratch file holding the same bytes; removed by the backend
    /// once the upload has succeeded.
    pub scratch_file: Option<PathBuf>,
}

impl UploadRequest {
    pub fn new(
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        suggested_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            suggested_name: suggested_name.into(),
            category: category.into(),
            scratch_file: None,
        }
    }

    pub fn with_scratch_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_file = Some(path.into());
        self
    }

    /// Remove the scratch file after a successful upload.
    ///
    /// Failures only leave a temp file behind, so they are logged and ignored.
    pub(crate) async fn release_scratch_file(&self) {
        if let Some(path) = &self.scratch_file {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!("Removed scratch file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Failed to remove scratch file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

/// One concrete storage backend.
///
/// Implementations must be thread-safe and tolerate concurrent calls.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Store the bytes and return the backend key.
    async fn put(&self, request: &UploadRequest) -> StorageResult<String>;

    /// Delete an object. Missing objects are not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// URL granting read access to an object for at least `ttl`.
    async fn access_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;
}

/// Backend-agnostic storage contract used by the lifecycle orchestrator.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Store bytes in the selected backend.
    async fn upload(
        &self,
        request: UploadRequest,
        backend: BackendKind,
    ) -> StorageResult<StorageReference>;

    /// Delete the referenced object. Idempotent.
    async fn delete(&self, reference: &StorageReference) -> StorageResult<()>;

    /// Resolve a read URL. Signed URLs must not be cached past `ttl`.
    async fn resolve_access_url(
        &self,
        reference: &StorageReference,
        ttl: Option<Duration>,
    ) -> StorageResult<String>;
}
