//! Durable S3-compatible object store backend.
//!
//! Objects are written and removed through short-lived presigned URLs, and
//! read access is granted by handing out presigned GET URLs, so credentials
//! never leave the process.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::naming::object_key;
use super::sigv4::{encode_key_path, presign_url, SigningKey};
use super::{
    BackendKind, StorageBackend, StorageError, StorageResult, UploadRequest, MAX_SIGNED_URL_TTL,
};

/// Expiry of the presigned URLs used for our own PUT/DELETE calls.
const WRITE_URL_EXPIRY_SECS: u64 = 300;


/// Connection settings for the object store.
#[derive(Clone, Deserialize)]
pub struct ObjectStoreConfig {
    /// Endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`.
    pub endpoint: String,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Address the bucket as `/bucket/key` instead of `bucket.host/key`.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_path_style() -> bool {
    true
}

impl fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("path_style", &self.path_style)
            .field("access_key", &"***")
            .field("secret_key", &"***")
            .finish()
    }
}

/// S3-compatible storage backend.
#[derive(Clone)]
pub struct ObjectStoreBackend {
    client: reqwest::Client,
    config: ObjectStoreConfig,
    scheme: String,
    host: String,
}

impl ObjectStoreBackend {
    /// Create a backend from configuration.
    pub fn new(config: ObjectStoreConfig) -> StorageResult<Self> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(StorageError::Unavailable(
                "object store credentials are not configured".to_string(),
            ));
        }
        if config.bucket.is_empty() {
            return Err(StorageError::Unavailable(
                "object store bucket is not configured".to_string(),
            ));
        }

        let endpoint = url::Url::parse(&config.endpoint)
            .map_err(|e| StorageError::Unavailable(format!("invalid object store endpoint: {}", e)))?;
        let base_host = endpoint.host_str().ok_or_else(|| {
            StorageError::Unavailable("object store endpoint has no host".to_string())
        })?;
        let base_host = match endpoint.port() {
            Some(port) => format!("{}:{}", base_host, port),
            None => base_host.to_string(),
        };
        let host = if config.path_style {
            base_host
        } else {
            format!("{}.{}", config.bucket, base_host)
        };

        Ok(Self {
            client: reqwest::Client::new(),
            scheme: endpoint.scheme().to_string(),
            host,
            config,
        })
    }

    fn canonical_path(&self, key: &str) -> String {
        if self.config.path_style {
            format!("/{}/{}", self.config.bucket, encode_key_path(key))
        } else {
            format!("/{}", encode_key_path(key))
        }
    }

    fn presign(&self, method: &str, key: &str, expires_secs: u64) -> String {
        let signing = SigningKey {
            access_key: &self.config.access_key,
            secret_key: &self.config.secret_key,
            region: &self.config.region,
        };
        presign_url(
            &signing,
            method,
            &format!("{}://{}", self.scheme, self.host),
            &self.host,
            &self.canonical_path(key),
            expires_secs.clamp(1, MAX_SIGNED_URL_TTL.as_secs()),
            Utc::now(),
        )
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    async fn put(&self, request: &UploadRequest) -> StorageResult<String> {
        let key = object_key(&request.category, &request.suggested_name, Utc::now());
        let url = self.presign("PUT", &key, WRITE_URL_EXPIRY_SECS);

        debug!(key = %key, size = request.bytes.len(), "Uploading to object store");
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, &request.content_type)
            .body(request.bytes.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Unavailable(format!(
                "object store rejected upload with status {}",
                response.status()
            )));
        }

        request.release_scratch_file().await;
        Ok(key)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let url = self.presign("DELETE", key, WRITE_URL_EXPIRY_SECS);

        debug!(key = %key, "Deleting from object store");
        let response = self.client.delete(url).send().await?;
        let status = response.status();

        // S3 answers 204 for missing keys; some compatible stores answer 404.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!(
                "object store rejected delete with status {}",
                status
            )))
        }
    }

    async fn access_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        Ok(self.presign("GET", key, ttl.as_secs()))
    }
}
