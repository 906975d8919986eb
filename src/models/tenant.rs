//! Per-tenant letterhead configuration.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StorageReference;

/// Render context key that receives the letter body.
pub const BODY_FIELD: &str = "body";

/// Placeholder in letterhead markup that receives the letter body.
pub const BODY_PLACEHOLDER: &str = "{body}";

/// A tenant's display name and letterhead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantProfile {
    pub tenant_id: String,
    pub display_name: String,
    pub letterhead_markup: Option<String>,
    pub logo: Option<StorageReference>,
    pub updated_at: DateTime<Utc>,
}

impl TenantProfile {
    pub fn new(tenant_id: &str, display_name: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            display_name: display_name.to_string(),
            letterhead_markup: None,
            logo: None,
            updated_at: Utc::now(),
        }
    }

    /// The letterhead, if both markup and logo are configured.
    pub fn letterhead(&self) -> Option<Letterhead<'_>> {
        Some(Letterhead {
            markup: self.letterhead_markup.as_deref()?,
            logo: self.logo.as_ref()?,
        })
    }
}

/// A complete letterhead borrowed from a [`TenantProfile`].
#[derive(Debug, Clone, Copy)]
pub struct Letterhead<'a> {
    pub markup: &'a str,
    pub logo: &'a StorageReference,
}

impl<'a> Letterhead<'a> {
    /// Letterhead markup with a `{body}` slot. Markup without one gets the
    /// slot appended.
    pub fn shell(&self) -> Cow<'a, str> {
        if self.markup.contains(BODY_PLACEHOLDER) {
            Cow::Borrowed(self.markup)
        } else {
            Cow::Owned(format!("{}\n{}", self.markup, BODY_PLACEHOLDER))
        }
    }
}
