//! Document records for archived and generated letters.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StorageReference;

/// Form values used to fill a template, keyed by placeholder name.
pub type FormData = BTreeMap<String, String>;

/// Approval status of a generated document.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
    Generated,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
            Self::Generated => "generated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbound" | "incoming" => Some(Self::Inbound),
            "outbound" | "outgoing" => Some(Self::Outbound),
            "generated" => Some(Self::Generated),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An archived or generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub tenant_id: String,
    /// Human-facing number, unique per tenant.
    pub serial_number: String,
    pub title: String,
    pub category: String,
    pub document_date: NaiveDate,
    pub direction: Direction,
    /// Set iff a stored artifact exists.
    pub storage_reference: Option<StorageReference>,
    /// `None` for manually archived documents, which have no workflow.
    pub status: Option<DocumentStatus>,
    pub template_id: Option<String>,
    pub rendered_form_data: Option<FormData>,
    /// Template body after placeholder substitution.
    pub content: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// A manually archived document whose file is already stored.
    #[allow(clippy::too_many_arguments)]
    pub fn archived(
        tenant_id: &str,
        serial_number: String,
        title: String,
        category: String,
        document_date: NaiveDate,
        direction: Direction,
        storage_reference: StorageReference,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            serial_number,
            title,
            category,
            document_date,
            direction,
            storage_reference: Some(storage_reference),
            status: None,
            template_id: None,
            rendered_form_data: None,
            content: None,
            created_by: created_by.to_string(),
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A generated document awaiting approval. No file exists yet.
    #[allow(clippy::too_many_arguments)]
    pub fn generated(
        tenant_id: &str,
        serial_number: String,
        title: String,
        category: String,
        template_id: &str,
        form_data: FormData,
        content: String,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            serial_number,
            title,
            category,
            document_date: now.date_naive(),
            direction: Direction::Generated,
            storage_reference: None,
            status: Some(DocumentStatus::Pending),
            template_id: Some(template_id.to_string()),
            rendered_form_data: Some(form_data),
            content: Some(content),
            created_by: created_by.to_string(),
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(DocumentStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Approved));
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Rejected));
        assert!(!DocumentStatus::Pending.can_transition_to(DocumentStatus::Pending));
        assert!(!DocumentStatus::Approved.can_transition_to(DocumentStatus::Rejected));
        assert!(!DocumentStatus::Rejected.can_transition_to(DocumentStatus::Approved));
        assert!(DocumentStatus::Approved.is_terminal());
        assert!(!DocumentStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [DocumentStatus::Pending, DocumentStatus::Approved, DocumentStatus::Rejected] {
            assert_eq!(DocumentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::from_str("PENDING"), Some(DocumentStatus::Pending));
        assert_eq!(DocumentStatus::from_str("revoked"), None);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::from_str(" Inbound "), Some(Direction::Inbound));
        assert_eq!(Direction::from_str("outgoing"), Some(Direction::Outbound));
        assert_eq!(Direction::from_str("sideways"), None);
    }

    #[test]
    fn test_generated_starts_pending_without_artifact() {
        let record = DocumentRecord::generated(
            "school-1",
            "001/SK/school-1/2025".to_string(),
            "Surat Tugas".to_string(),
            "sk".to_string(),
            "tpl-1",
            FormData::new(),
            "<p>body</p>".to_string(),
            "user-1",
        );
        assert!(record.is_pending());
        assert!(record.storage_reference.is_none());
        assert_eq!(record.direction, Direction::Generated);
    }
}
