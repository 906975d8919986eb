//! Letter templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant's letter template with `{field}` placeholders in its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterTemplate {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub category: String,
    pub body: String,
    /// Declared field names, shown to users filling the form.
    pub fields: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LetterTemplate {
    pub fn new(tenant_id: &str, id: &str, name: &str, category: &str, body: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            body: body.to_string(),
            fields: crate::render::placeholder_names(body),
            created_at: now,
            updated_at: now,
        }
    }
}
