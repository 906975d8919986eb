//! Repository layer for database persistence.
//!
//! All database access uses Diesel with diesel-async. SQLite is the
//! default backend; PostgreSQL is available behind the `postgres` feature.

pub mod context;
pub mod document;
pub mod models;
pub mod pool;
pub mod template;
pub mod tenant;
pub mod util;

pub use context::DbContext;
pub use document::{
    DieselDocumentRepository, DocumentFilter, DocumentStore, StoreError, StoreResult,
};
pub use pool::{DbError, DbPool};
pub use template::{DieselTemplateRepository, TemplateSource};
pub use tenant::{DieselTenantRepository, TenantDirectory};
pub use util::redact_url_password;
