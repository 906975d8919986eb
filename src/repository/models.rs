//! Diesel row types.
//!
//! Timestamps are stored as RFC 3339 text and dates as `YYYY-MM-DD` so the
//! same schema works on SQLite and PostgreSQL.

use diesel::prelude::*;

use crate::schema;

/// Document row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRow {
    pub id: String,
    pub tenant_id: String,
    pub serial_number: String,
    pub title: String,
    pub category: String,
    pub document_date: String,
    pub direction: String,
    pub storage_reference: Option<String>,
    pub status: Option<String>,
    pub template_id: Option<String>,
    pub rendered_form_data: Option<String>,
    pub content: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New document for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::documents)]
pub struct NewDocument<'a> {
    pub id: &'a str,
    pub tenant_id: &'a str,
    pub serial_number: &'a str,
    pub title: &'a str,
    pub category: &'a str,
    pub document_date: String,
    pub direction: &'a str,
    pub storage_reference: Option<String>,
    pub status: Option<&'a str>,
    pub template_id: Option<&'a str>,
    pub rendered_form_data: Option<String>,
    pub content: Option<&'a str>,
    pub created_by: &'a str,
    pub approved_by: Option<&'a str>,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Letter template row.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::letter_templates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TemplateRow {
    pub tenant_id: String,
    pub id: String,
    pub name: String,
    pub category: String,
    pub body: String,
    pub fields: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Tenant profile row.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::tenant_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TenantProfileRow {
    pub tenant_id: String,
    pub display_name: String,
    pub letterhead_markup: Option<String>,
    pub logo: Option<String>,
    pub updated_at: String,
}
