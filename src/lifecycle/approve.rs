//! Approval and rejection of generated letters.

use chrono::{DateTime, Utc};
use tracing::info;

use super::dates::format_long_date;
use super::{DocumentLifecycle, LifecycleResult};
use crate::error::LifecycleError;
use crate::models::{Actor, DocumentRecord, DocumentStatus, BODY_FIELD};
use crate::render::{substitute, RenderContext};
use crate::storage::{StorageError, UploadRequest};

impl DocumentLifecycle {
    /// Render a pending letter, store the file and mark the record approved.
    ///
    /// If the record update fails after the upload, the upload is deleted
    /// and the record stays pending with no file.
    pub async fn generate_and_approve(
        &self,
        tenant_id: &str,
        document_id: &str,
        approver: &Actor,
    ) -> LifecycleResult<DocumentRecord> {
        let record = self.store.find_by_id(tenant_id, document_id).await?;
        if !record.is_pending() {
            return Err(not_pending(&record, "approved"));
        }

        let template_id = record.template_id.as_deref().ok_or_else(|| {
            LifecycleError::MissingConfiguration("document has no template".to_string())
        })?;
        let template = self
            .templates
            .template(tenant_id, template_id)
            .await?
            .ok_or_else(|| {
                LifecycleError::MissingConfiguration(format!(
                    "template '{}' no longer exists",
                    template_id
                ))
            })?;
        let profile = self.tenants.profile(tenant_id).await?.ok_or_else(|| {
            LifecycleError::MissingConfiguration("tenant letterhead is not configured".to_string())
        })?;
        let letterhead = profile.letterhead().ok_or_else(|| {
            LifecycleError::MissingConfiguration(
                "tenant letterhead markup or logo is not configured".to_string(),
            )
        })?;

        let logo_url = self
            .gateway
            .resolve_access_url(letterhead.logo, Some(self.config.signed_url_ttl))
            .await
            .map_err(|e| match e {
                StorageError::NotFound => LifecycleError::MissingConfiguration(
                    "tenant logo file is missing".to_string(),
                ),
                other => other.into(),
            })?;

        let approved_at = Utc::now();
        let form_data = record.rendered_form_data.clone().unwrap_or_default();
        let body = match &record.content {
            Some(content) => content.clone(),
            None => substitute(&template.body, &form_data),
        };
        // The body goes in as a context value so text already filled in at
        // request time is not expanded a second time.
        let context = build_context(
            &record,
            &form_data,
            approver,
            approved_at,
            &logo_url,
            &profile.display_name,
            body,
        );
        let rendered = self.renderer.render(&letterhead.shell(), &context).await?;

        let upload = UploadRequest::new(
            rendered.bytes,
            rendered.content_type,
            format!("{}.{}", record.serial_number, rendered.extension),
            format!("{}/{}", tenant_id, record.category),
        );
        let reference = self
            .gateway
            .upload(upload, self.config.generated_backend)
            .await?;

        match self
            .store
            .approve_with_artifact(tenant_id, document_id, &reference, &approver.id, approved_at)
            .await
        {
            Ok(approved) => {
                info!(
                    tenant = %tenant_id,
                    id = %approved.id,
                    serial = %approved.serial_number,
                    approver = %approver.id,
                    "Approved document"
                );
                Ok(approved)
            }
            Err(e) => {
                self.compensate(&reference, "approve").await;
                Err(e.into())
            }
        }
    }

    /// Reject a pending letter. Storage is never touched.
    pub async fn reject(
        &self,
        tenant_id: &str,
        document_id: &str,
        actor: &Actor,
    ) -> LifecycleResult<DocumentRecord> {
        let record = self
            .store
            .update_status(tenant_id, document_id, DocumentStatus::Rejected, Some(&actor.id))
            .await?;
        info!(
            tenant = %tenant_id,
            id = %record.id,
            actor = %actor.id,
            "Rejected document"
        );
        Ok(record)
    }
}

fn not_pending(record: &DocumentRecord, action: &str) -> LifecycleError {
    let state = record
        .status
        .map(|s| s.as_str())
        .unwrap_or("archived");
    LifecycleError::InvalidStateTransition(format!(
        "document is {}; only pending documents can be {}",
        state, action
    ))
}

fn build_context(
    record: &DocumentRecord,
    form_data: &crate::models::FormData,
    approver: &Actor,
    approved_at: DateTime<Utc>,
    logo_url: &str,
    tenant_name: &str,
    body: String,
) -> RenderContext {
    let mut context = RenderContext::from(form_data.clone());
    context
        .insert("approver_name", approver.name.as_str())
        .insert("approver_role", approver.role.clone().unwrap_or_default())
        .insert("approved_at", approved_at.to_rfc3339())
        .insert("approved_date", format_long_date(approved_at.date_naive()))
        .insert("logo_url", logo_url)
        .insert("serial_number", record.serial_number.as_str())
        .insert("title", record.title.as_str())
        .insert("tenant_name", tenant_name)
        .insert(BODY_FIELD, body);
    context
}
