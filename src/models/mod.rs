//! Data models for letterarchive.

mod actor;
mod document;
mod template;
mod tenant;

pub use actor::Actor;
pub use document::{Direction, DocumentRecord, DocumentStatus, FormData};
pub use template::LetterTemplate;
pub use tenant::{Letterhead, TenantProfile, BODY_FIELD, BODY_PLACEHOLDER};
