//! HTML renderers.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::placeholder::substitute;
use super::{DocumentRenderer, RenderContext, RenderError, RenderedDocument};

/// Converter used when none is configured.
pub const DEFAULT_PDF_BINARY: &str = "wkhtmltopdf";

/// Fills placeholders and converts the HTML to PDF with an external binary
/// that reads HTML on stdin and writes PDF on stdout.
#[derive(Debug, Clone)]
pub struct HtmlPdfRenderer {
    binary: PathBuf,
    args: Vec<String>,
}

impl HtmlPdfRenderer {
    /// Find `name` on `PATH`.
    pub fn locate(name: &str) -> Result<Self, RenderError> {
        let binary = which::which(name).map_err(|_| {
            RenderError::BackendNotAvailable(format!("{} not found (install {})", name, name))
        })?;
        Ok(Self::with_binary(binary))
    }

    /// Use an explicit converter path.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: vec![
                "--quiet".to_string(),
                "--encoding".to_string(),
                "utf-8".to_string(),
            ],
        }
    }

    /// Replace the arguments placed before the stdin/stdout markers.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn convert(&self, html: String) -> Result<Vec<u8>, RenderError> {
        let spawned = Command::new(&self.binary)
            .args(&self.args)
            .args(["-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::BackendNotAvailable(format!(
                    "{} not found",
                    self.binary.display()
                )))
            }
            Err(e) => return Err(RenderError::Io(e)),
        };

        // Feed stdin from a separate task so a full stdout pipe cannot
        // deadlock the writer.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Failed("converter stdin unavailable".to_string()))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(html.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(RenderError::Io(e)),
            Err(e) => return Err(RenderError::Failed(e.to_string())),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl DocumentRenderer for HtmlPdfRenderer {
    async fn render(
        &self,
        markup: &str,
        context: &RenderContext,
    ) -> Result<RenderedDocument, RenderError> {
        let html = substitute(markup, context.values());
        let pdf = self.convert(html).await?;

        match infer::get(&pdf) {
            Some(kind) if kind.mime_type() == "application/pdf" => {}
            _ => {
                return Err(RenderError::Failed(
                    "converter output is not a PDF".to_string(),
                ))
            }
        }

        debug!(size = pdf.len(), "Rendered PDF");
        Ok(RenderedDocument {
            bytes: Bytes::from(pdf),
            content_type: "application/pdf".to_string(),
            extension: "pdf".to_string(),
        })
    }
}

/// Renderer that stops after placeholder substitution and returns HTML.
/// Used for previews and in environments without a PDF converter.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

#[async_trait]
impl DocumentRenderer for HtmlRenderer {
    async fn render(
        &self,
        markup: &str,
        context: &RenderContext,
    ) -> Result<RenderedDocument, RenderError> {
        let html = substitute(markup, context.values());
        Ok(RenderedDocument {
            bytes: Bytes::from(html.into_bytes()),
            content_type: "text/html; charset=utf-8".to_string(),
            extension: "html".to_string(),
        })
    }
}
