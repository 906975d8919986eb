//! Manual archiving of existing letters.

use serde::Deserialize;
use tracing::info;

use super::dates::parse_document_date;
use super::{require, DocumentLifecycle, IncomingFile, LifecycleResult};
use crate::error::LifecycleError;
use crate::models::{Actor, Direction, DocumentRecord};
use crate::storage::UploadRequest;

/// Caller-supplied metadata for a letter being archived.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveMetadata {
    pub serial_number: String,
    pub title: String,
    pub category: String,
    /// `YYYY-MM-DD` or `day monthName year`.
    pub document_date: String,
    /// `inbound` or `outbound`.
    pub direction: String,
}

impl DocumentLifecycle {
    /// Archive an existing letter file.
    ///
    /// Validation and the serial-number conflict check happen before any
    /// upload. If the record cannot be saved after the upload succeeded,
    /// the upload is deleted again before the error is returned.
    pub async fn archive_existing_document(
        &self,
        tenant_id: &str,
        metadata: ArchiveMetadata,
        file: IncomingFile,
        actor: &Actor,
    ) -> LifecycleResult<DocumentRecord> {
        require("tenant id", tenant_id)?;
        require("serial number", &metadata.serial_number)?;
        require("title", &metadata.title)?;
        require("category", &metadata.category)?;
        let document_date = parse_document_date(&metadata.document_date)?;
        let direction = match Direction::from_str(&metadata.direction) {
            Some(d @ (Direction::Inbound | Direction::Outbound)) => d,
            _ => {
                return Err(LifecycleError::InvalidInput(format!(
                    "direction must be inbound or outbound, got '{}'",
                    metadata.direction
                )))
            }
        };
        if file.bytes.is_empty() {
            return Err(LifecycleError::InvalidInput("file is empty".to_string()));
        }

        let serial_number = metadata.serial_number.trim().to_string();
        if self
            .store
            .find_by_serial(tenant_id, &serial_number)
            .await?
            .is_some()
        {
            return Err(LifecycleError::Conflict(format!(
                "a document with serial number '{}' already exists",
                serial_number
            )));
        }

        let content_type = file.resolved_content_type();
        let mut upload = UploadRequest::new(
            file.bytes,
            content_type,
            file.file_name,
            format!("{}/{}", tenant_id, metadata.category.trim()),
        );
        if let Some(scratch) = file.scratch_file {
            upload = upload.with_scratch_file(scratch);
        }
        let reference = self
            .gateway
            .upload(upload, self.config.archive_backend)
            .await?;

        let record = DocumentRecord::archived(
            tenant_id,
            serial_number,
            metadata.title.trim().to_string(),
            metadata.category.trim().to_string(),
            document_date,
            direction,
            reference.clone(),
            &actor.id,
        );

        match self.store.create(record).await {
            Ok(record) => {
                info!(
                    tenant = %tenant_id,
                    id = %record.id,
                    serial = %record.serial_number,
                    "Archived document"
                );
                Ok(record)
            }
            Err(e) => {
                self.compensate(&reference, "archive").await;
                Err(e.into())
            }
        }
    }
}
