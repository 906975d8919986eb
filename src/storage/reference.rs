//! Self-describing pointer to a stored artifact.
//!
//! Persisted as a JSON envelope `{"backend": "...", "key": "..."}` so a
//! delete issued long after the upload can be routed without any lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StorageError;

/// Which storage backend holds an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// S3-compatible bucket addressed by explicit object keys.
    #[serde(rename = "durable-object-store")]
    ObjectStore,
    /// Managed media host addressed by provider-assigned content ids.
    #[serde(rename = "media-host")]
    MediaHost,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectStore => "durable-object-store",
            Self::MediaHost => "media-host",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "durable-object-store" | "object-store" | "s3" => Ok(Self::ObjectStore),
            "media-host" | "media" => Ok(Self::MediaHost),
            other => Err(StorageError::MalformedReference(format!(
                "unknown backend '{}'",
                other
            ))),
        }
    }
}

/// Backend plus backend-specific key of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageReference {
    pub backend: BackendKind,
    pub key: String,
}

impl StorageReference {
    pub fn new(backend: BackendKind, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Serialize to the persisted JSON envelope.
    pub fn encode(&self) -> String {
        // Both fields are plain strings; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"backend":"{}","key":{}}}"#,
                self.backend,
                serde_json::Value::String(self.key.clone())
            )
        })
    }

    /// Parse the persisted JSON envelope.
    pub fn decode(encoded: &str) -> Result<Self, StorageError> {
        let reference: StorageReference = serde_json::from_str(encoded)
            .map_err(|e| StorageError::MalformedReference(e.to_string()))?;
        if reference.key.is_empty() {
            return Err(StorageError::MalformedReference(
                "empty storage key".to_string(),
            ));
        }
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_schema() {
        let reference = StorageReference::new(BackendKind::ObjectStore, "letters/1700000000000-sk.pdf");
        assert_eq!(
            reference.encode(),
            r#"{"backend":"durable-object-store","key":"letters/1700000000000-sk.pdf"}"#
        );

        let media = StorageReference::new(BackendKind::MediaHost, "letters/abc123");
        assert_eq!(
            media.encode(),
            r#"{"backend":"media-host","key":"letters/abc123"}"#
        );
    }

    #[test]
    fn test_decode_round_trips_awkward_keys() {
        let reference = StorageReference::new(BackendKind::MediaHost, r#"a "quoted" key/ü"#);
        let decoded = StorageReference::decode(&reference.encode()).unwrap();
        assert_eq!(decoded, reference);
    }

    #[test]
    fn test_decode_rejects_unknown_backend() {
        let err = StorageReference::decode(r#"{"backend":"ftp","key":"x"}"#).unwrap_err();
        assert!(matches!(err, StorageError::MalformedReference(_)));
    }

    #[test]
    fn test_decode_rejects_missing_or_extra_fields() {
        assert!(StorageReference::decode(r#"{"backend":"media-host"}"#).is_err());
        assert!(StorageReference::decode(r#"{"key":"x"}"#).is_err());
        assert!(
            StorageReference::decode(r#"{"backend":"media-host","key":"x","url":"y"}"#).is_err()
        );
        assert!(StorageReference::decode(r#"{"backend":"media-host","key":""}"#).is_err());
        assert!(StorageReference::decode("https://example.com/file.pdf").is_err());
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!(
            "durable-object-store".parse::<BackendKind>().unwrap(),
            BackendKind::ObjectStore
        );
        assert_eq!("media-host".parse::<BackendKind>().unwrap(), BackendKind::MediaHost);
        assert!("gcs".parse::<BackendKind>().is_err());
    }
}
