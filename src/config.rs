//! Configuration management.
//!
//! Settings come from a TOML file with environment overrides for the
//! database URL and storage credentials. Credentials never appear in
//! `Debug` output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::lifecycle::LifecycleConfig;
use crate::render::DEFAULT_PDF_BINARY;
use crate::storage::{
    BackendKind, MediaHostConfig, ObjectStoreConfig, DEFAULT_SIGNED_URL_TTL, MAX_SIGNED_URL_TTL,
};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "letterarchive.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "LETTERARCHIVE_CONFIG";

/// Default database filename for SQLite.
pub const DEFAULT_DATABASE_FILENAME: &str = "letterarchive.db";

/// Default address for the HTTP server.
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database URL (`sqlite:...` or `postgres://...`).
    pub database_url: Option<String>,
    pub storage: StorageSettings,
    pub render: RenderSettings,
    pub server: ServerSettings,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Storage backends and where each kind of artifact goes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub archive_backend: BackendKind,
    pub generated_backend: BackendKind,
    pub logo_backend: BackendKind,
    pub signed_url_ttl_secs: u64,
    /// Keep files in process memory instead of remote backends.
    pub in_memory: bool,
    pub object_store: Option<ObjectStoreConfig>,
    pub media_host: Option<MediaHostConfig>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let lifecycle = LifecycleConfig::default();
        Self {
            archive_backend: lifecycle.archive_backend,
            generated_backend: lifecycle.generated_backend,
            logo_backend: lifecycle.logo_backend,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL.as_secs(),
            in_memory: false,
            object_store: None,
            media_host: None,
        }
    }
}

/// HTML-to-PDF converter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Converter binary, looked up on `PATH` when not absolute.
    pub binary: String,
    /// Arguments replacing the converter's defaults (before the stdin/stdout markers).
    pub args: Option<Vec<String>>,
    /// Store filled-in HTML instead of PDF when no converter is installed.
    pub html_fallback: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_PDF_BINARY.to_string(),
            args: None,
            html_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, `$LETTERARCHIVE_CONFIG` or
    /// `./letterarchive.toml`, then apply environment overrides.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env_value(CONFIG_ENV_VAR).map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::load_from_path(&path).await?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                if tokio::fs::try_exists(&default_path).await.unwrap_or(false) {
                    Self::load_from_path(&default_path).await?
                } else {
                    Self::default()
                }
            }
        };

        settings.apply_overrides(env_value);
        Ok(settings)
    }

    /// Parse a TOML file without applying environment overrides.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mut settings = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.source_path = Some(path.to_path_buf());
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(store) = self.storage.object_store.as_mut() {
            if let Some(key) = lookup("OBJECT_STORE_ACCESS_KEY") {
                store.access_key = key;
            }
            if let Some(secret) = lookup("OBJECT_STORE_SECRET_KEY") {
                store.secret_key = secret;
            }
        }
        if let Some(host) = self.storage.media_host.as_mut() {
            if let Some(key) = lookup("MEDIA_HOST_API_KEY") {
                host.api_key = key;
            }
            if let Some(secret) = lookup("MEDIA_HOST_API_SECRET") {
                host.api_secret = secret;
            }
        }
    }

    /// Check that every backend artifacts are routed to can be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ttl = self.storage.signed_url_ttl_secs;
        if ttl == 0 || ttl > MAX_SIGNED_URL_TTL.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "storage.signed_url_ttl_secs must be between 1 and {}",
                MAX_SIGNED_URL_TTL.as_secs()
            )));
        }
        if self.storage.in_memory {
            return Ok(());
        }
        for kind in self.routed_backends() {
            let configured = match kind {
                BackendKind::ObjectStore => self.storage.object_store.is_some(),
                BackendKind::MediaHost => self.storage.media_host.is_some(),
            };
            if !configured {
                return Err(ConfigError::Invalid(format!(
                    "artifacts are routed to {} but it is not configured",
                    kind
                )));
            }
        }
        Ok(())
    }

    fn routed_backends(&self) -> [BackendKind; 3] {
        [
            self.storage.archive_backend,
            self.storage.generated_backend,
            self.storage.logo_backend,
        ]
    }

    /// Database URL, defaulting to a SQLite file next to the config file.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            return url.clone();
        }
        let dir = self
            .source_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        format!("sqlite:{}", dir.join(DEFAULT_DATABASE_FILENAME).display())
    }

    /// Backend routing for the document lifecycle.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            archive_backend: self.storage.archive_backend,
            generated_backend: self.storage.generated_backend,
            logo_backend: self.storage.logo_backend,
            signed_url_ttl: self.signed_url_ttl(),
        }
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.storage.signed_url_ttl_secs)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
database_url = "sqlite:/var/lib/letters.db"

[storage]
archive_backend = "durable-object-store"
generated_backend = "media-host"
signed_url_ttl_secs = 600

[storage.object_store]
endpoint = "https://acct.r2.cloudflarestorage.com"
bucket = "letters"
access_key = "file-key"

[storage.media_host]
cloud_name = "school"

[render]
binary = "/usr/local/bin/wkhtmltopdf"
args = ["--quiet", "--page-size", "A4"]

[server]
bind = "0.0.0.0:8080"
"#;

    #[test]
    fn test_parse_full_file() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.database_url(), "sqlite:/var/lib/letters.db");
        assert_eq!(settings.storage.archive_backend, BackendKind::ObjectStore);
        assert_eq!(settings.storage.generated_backend, BackendKind::MediaHost);
        assert_eq!(settings.storage.logo_backend, BackendKind::MediaHost);
        assert_eq!(settings.signed_url_ttl(), Duration::from_secs(600));
        assert_eq!(settings.render.args.as_ref().map(Vec::len), Some(3));
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert!(settings.validate().is_ok());

        let store = settings.storage.object_store.as_ref().unwrap();
        assert_eq!(store.region, "auto");
        assert!(store.path_style);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.database_url(), "sqlite:./letterarchive.db");
        assert_eq!(settings.signed_url_ttl(), DEFAULT_SIGNED_URL_TTL);
        assert_eq!(settings.render.binary, DEFAULT_PDF_BINARY);
        assert_eq!(settings.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut settings = Settings::from_toml(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://u:p@db/letters"),
            ("OBJECT_STORE_ACCESS_KEY", "env-key"),
            ("OBJECT_STORE_SECRET_KEY", "env-secret"),
            ("MEDIA_HOST_API_SECRET", "media-secret"),
        ]
        .into_iter()
        .collect();
        settings.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.database_url(), "postgres://u:p@db/letters");
        let store = settings.storage.object_store.as_ref().unwrap();
        assert_eq!(store.access_key, "env-key");
        assert_eq!(store.secret_key, "env-secret");
        let host = settings.storage.media_host.as_ref().unwrap();
        assert_eq!(host.api_key, "");
        assert_eq!(host.api_secret, "media-secret");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut settings = Settings::from_toml(SAMPLE).unwrap();
        settings.apply_overrides(|name| {
            (name == "OBJECT_STORE_SECRET_KEY").then(|| "hunter2".to_string())
        });
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("file-key"));
    }

    #[test]
    fn test_validate_requires_routed_backend() {
        let settings =
            Settings::from_toml("[storage]\narchive_backend = \"durable-object-store\"").unwrap();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        let in_memory = Settings::from_toml("[storage]\nin_memory = true").unwrap();
        assert!(in_memory.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_signed_url_ttl() {
        for ttl in [0, 8 * 24 * 3600] {
            let settings = Settings::from_toml(&format!(
                "[storage]\nin_memory = true\nsigned_url_ttl_secs = {}",
                ttl
            ))
            .unwrap();
            assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[tokio::test]
    async fn test_load_from_path_resolves_database_next_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letterarchive.toml");
        tokio::fs::write(&path, "[storage]\nin_memory = true\n")
            .await
            .unwrap();

        let settings = Settings::load_from_path(&path).await.unwrap();
        assert!(settings.storage.in_memory);
        assert_eq!(
            settings.database_url(),
            format!("sqlite:{}", dir.path().join(DEFAULT_DATABASE_FILENAME).display())
        );
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load_from_path(Path::new("/nonexistent/letterarchive.toml")).await;
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
