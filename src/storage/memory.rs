//! In-memory storage backend for development and tests.
//!
//! Can stand in for either backend kind. Keys follow the same shape as the
//! real backend (explicit path keys for the object store, opaque ids for the
//! media host) and access URLs use a `memory://` scheme that
//! [`MemoryBackend::fetch`] can dereference.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use super::naming::object_key;
use super::{BackendKind, StorageBackend, StorageError, StorageResult, UploadRequest};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// In-memory storage backend.
#[derive(Clone)]
pub struct MemoryBackend {
    kind: BackendKind,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBackend {
    /// Create an empty backend impersonating `kind`.
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            objects: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn url_prefix(&self) -> String {
        format!("memory://{}/", self.kind)
    }

    /// Dereference an access URL produced by this backend.
    pub async fn fetch(&self, url: &str) -> StorageResult<Bytes> {
        let key = url
            .strip_prefix(&self.url_prefix())
            .ok_or_else(|| StorageError::InvalidInput("URL not served by this backend".into()))?;
        let key = key.split('?').next().unwrap_or(key);
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or(StorageError::NotFound)
    }

    /// Content type recorded for a key.
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Whether an object exists.
    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn put(&self, request: &UploadRequest) -> StorageResult<String> {
        let key = match self.kind {
            BackendKind::ObjectStore => {
                object_key(&request.category, &request.suggested_name, Utc::now())
            }
            BackendKind::MediaHost => {
                format!("mem{:08x}", self.next_id.fetch_add(1, Ordering::Relaxed))
            }
        };

        self.objects.write().await.insert(
            key.clone(),
            StoredObject {
                data: request.bytes.clone(),
                content_type: request.content_type.clone(),
            },
        );
        request.release_scratch_file().await;
        Ok(key)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn access_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        if !self.objects.read().await.contains_key(key) {
            return Err(StorageError::NotFound);
        }
        Ok(match self.kind {
            BackendKind::ObjectStore => {
                let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
                let expires = Utc::now().timestamp().saturating_add(ttl_secs);
                format!("{}{}?expires={}", self.url_prefix(), key, expires)
            }
            BackendKind::MediaHost => format!("{}{}", self.url_prefix(), key),
        })
    }
}
