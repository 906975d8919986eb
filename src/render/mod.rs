//! Letter rendering.
//!
//! A renderer turns markup plus a key/value context into the bytes of a
//! finished document. The production renderer fills placeholders and pipes
//! the resulting HTML through an external HTML→PDF converter.

mod pdf;
mod placeholder;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

pub use pdf::{HtmlPdfRenderer, HtmlRenderer, DEFAULT_PDF_BINARY};
pub use placeholder::{placeholder_names, substitute};

/// Errors from rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Renderer not available: {0}")]
    BackendNotAvailable(String),

    #[error("Rendering failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Values available to placeholders while rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl From<BTreeMap<String, String>> for RenderContext {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

/// Output of a renderer.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Bytes,
    pub content_type: String,
    /// File extension without the dot.
    pub extension: String,
}

/// Renders markup into a fixed-layout document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        markup: &str,
        context: &RenderContext,
    ) -> Result<RenderedDocument, RenderError>;
}
