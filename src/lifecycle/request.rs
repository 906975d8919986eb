//! Requests for generated letters.

use chrono::{Datelike, Utc};
use tracing::info;

use super::serial::format_serial_number;
use super::{require, DocumentLifecycle, LifecycleResult};
use crate::error::LifecycleError;
use crate::models::{Actor, DocumentRecord, FormData};
use crate::render::substitute;

/// Form field that overrides the template name as the letter title.
const TITLE_FIELD: &str = "title";

impl DocumentLifecycle {
    /// Create a pending generated letter from a template and form data.
    ///
    /// Placeholders are filled now (unknown ones are left in place), a
    /// serial number is allocated for the current year, and the record is
    /// saved without a file. The file is produced on approval.
    pub async fn request_generation(
        &self,
        tenant_id: &str,
        template_id: &str,
        form_data: FormData,
        requester: &Actor,
    ) -> LifecycleResult<DocumentRecord> {
        require("tenant id", tenant_id)?;
        require("template id", template_id)?;

        let template = self
            .templates
            .template(tenant_id, template_id)
            .await?
            .ok_or_else(|| {
                LifecycleError::NotFound(format!("template '{}' not found", template_id))
            })?;

        let content = substitute(&template.body, &form_data);

        let year = Utc::now().year();
        let sequence = self
            .sequences
            .next_value(tenant_id, &year.to_string())
            .await?;
        let serial_number = format_serial_number(sequence, tenant_id, year);

        let title = form_data
            .get(TITLE_FIELD)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(template.name.as_str())
            .to_string();

        let record = DocumentRecord::generated(
            tenant_id,
            serial_number,
            title,
            template.category.clone(),
            &template.id,
            form_data,
            content,
            &requester.id,
        );
        let record = self.store.create(record).await?;

        info!(
            tenant = %tenant_id,
            id = %record.id,
            serial = %record.serial_number,
            "Requested document generation"
        );
        Ok(record)
    }
}
