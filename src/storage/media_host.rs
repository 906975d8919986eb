//! Managed media host backend (Cloudinary-compatible upload API).
//!
//! The provider assigns the content id (`public_id`) on upload; delivery
//! URLs are derived from it deterministically and are public and stable.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::naming::sanitize_object_name;
use super::{BackendKind, StorageBackend, StorageError, StorageResult, UploadRequest};

/// Connection settings for the media host.
#[derive(Clone, Deserialize)]
pub struct MediaHostConfig {
    pub cloud_name: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_delivery_base")]
    pub delivery_base: String,
    /// Resource type used for uploads (`raw` keeps PDFs byte-identical).
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    /// Optional folder prefix for uploaded assets.
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

fn default_api_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_delivery_base() -> String {
    "https://res.cloudinary.com".to_string()
}

fn default_resource_type() -> String {
    "raw".to_string()
}

impl fmt::Debug for MediaHostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHostConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_base", &self.api_base)
            .field("delivery_base", &self.delivery_base)
            .field("resource_type", &self.resource_type)
            .field("folder", &self.folder)
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Media host storage backend.
#[derive(Clone)]
pub struct MediaHostBackend {
    client: reqwest::Client,
    config: MediaHostConfig,
}

impl MediaHostBackend {
    pub fn new(config: MediaHostConfig) -> StorageResult<Self> {
        if config.cloud_name.is_empty() {
            return Err(StorageError::Unavailable(
                "media host cloud name is not configured".to_string(),
            ));
        }
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(StorageError::Unavailable(
                "media host credentials are not configured".to_string(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            self.config.resource_type,
            action
        )
    }

    /// Sign request parameters: sorted `k=v` pairs joined by `&`, secret
    /// appended, SHA-256 hex digest.
    fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        hex::encode(Sha256::digest(
            format!("{}{}", to_sign, self.config.api_secret).as_bytes(),
        ))
    }

    fn folder_for(&self, category: &str) -> Option<String> {
        let category = category
            .split('/')
            .filter(|s| !s.trim().is_empty())
            .map(sanitize_object_name)
            .collect::<Vec<_>>()
            .join("/");
        match (&self.config.folder, category.is_empty()) {
            (Some(base), false) => Some(format!("{}/{}", base.trim_end_matches('/'), category)),
            (Some(base), true) => Some(base.trim_end_matches('/').to_string()),
            (None, false) => Some(category),
            (None, true) => None,
        }
    }
}

#[async_trait]
impl StorageBackend for MediaHostBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MediaHost
    }

    async fn put(&self, request: &UploadRequest) -> StorageResult<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        params.insert("timestamp", timestamp);
        if let Some(folder) = self.folder_for(&request.category) {
            params.insert("folder", folder);
        }
        let signature = self.sign(&params);

        let file = Part::bytes(request.bytes.to_vec())
            .file_name(sanitize_object_name(&request.suggested_name))
            .mime_str(&request.content_type)
            .map_err(|_| {
                StorageError::InvalidInput(format!(
                    "invalid content type '{}'",
                    request.content_type
                ))
            })?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        debug!(size = request.bytes.len(), "Uploading to media host");
        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Unavailable(format!(
                "media host rejected upload with status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response.json().await?;
        request.release_scratch_file().await;
        Ok(body.public_id)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        params.insert("public_id", key.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        debug!(key = %key, "Deleting from media host");
        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Unavailable(format!(
                "media host rejected delete with status {}",
                response.status()
            )));
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(StorageError::Unavailable(format!(
                "media host delete returned '{}'",
                other
            ))),
        }
    }

    async fn access_url(&self, key: &str, _ttl: Duration) -> StorageResult<String> {
        Ok(format!(
            "{}/{}/{}/upload/{}",
            self.config.delivery_base.trim_end_matches('/'),
            self.config.cloud_name,
            self.config.resource_type,
            key
        ))
    }
}
