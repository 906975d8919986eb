//! Letter template store.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::TemplateRow;
use super::pool::{DbError, DbPool};
use super::util::parse_datetime;
use crate::models::LetterTemplate;
use crate::schema::letter_templates;
use crate::with_conn_split;

/// Lookup of letter templates by tenant and id.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn template(
        &self,
        tenant_id: &str,
        template_id: &str,
    ) -> Result<Option<LetterTemplate>, DbError>;
}

impl From<TemplateRow> for LetterTemplate {
    fn from(row: TemplateRow) -> Self {
        LetterTemplate {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            category: row.category,
            body: row.body,
            fields: serde_json::from_str(&row.fields).unwrap_or_default(),
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
        }
    }
}

/// Diesel-backed template repository.
#[derive(Clone)]
pub struct DieselTemplateRepository {
    pool: DbPool,
}

impl DieselTemplateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a template.
    pub async fn save(&self, template: &LetterTemplate) -> Result<(), DbError> {
        let fields = serde_json::to_string(&template.fields).unwrap_or_else(|_| "[]".to_string());
        let created_at = template.created_at.to_rfc3339();
        let updated_at = template.updated_at.to_rfc3339();
        let values = (
            letter_templates::tenant_id.eq(&template.tenant_id),
            letter_templates::id.eq(&template.id),
            letter_templates::name.eq(&template.name),
            letter_templates::category.eq(&template.category),
            letter_templates::body.eq(&template.body),
            letter_templates::fields.eq(&fields),
            letter_templates::created_at.eq(&created_at),
            letter_templates::updated_at.eq(&updated_at),
        );

        with_conn_split!(self.pool,
            sqlite: conn => {
                diesel::replace_into(letter_templates::table)
                    .values(values)
                    .execute(&mut conn)
                    .await?;
                Ok(())
            },
            postgres: conn => {
                diesel::insert_into(letter_templates::table)
                    .values(values)
                    .on_conflict((letter_templates::tenant_id, letter_templates::id))
                    .do_update()
                    .set((
                        letter_templates::name.eq(&template.name),
                        letter_templates::category.eq(&template.category),
                        letter_templates::body.eq(&template.body),
                        letter_templates::fields.eq(&fields),
                        letter_templates::updated_at.eq(&updated_at),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        )
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<LetterTemplate>, DbError> {
        let rows: Vec<TemplateRow> = crate::with_conn!(self.pool, conn => {
            letter_templates::table
                .filter(letter_templates::tenant_id.eq(tenant_id))
                .order(letter_templates::name.asc())
                .select(TemplateRow::as_select())
                .load(&mut conn)
                .await
        })?;
        Ok(rows.into_iter().map(LetterTemplate::from).collect())
    }
}

#[async_trait]
impl TemplateSource for DieselTemplateRepository {
    async fn template(
        &self,
        tenant_id: &str,
        template_id: &str,
    ) -> Result<Option<LetterTemplate>, DbError> {
        let row: Option<TemplateRow> = crate::with_conn!(self.pool, conn => {
            letter_templates::table
                .filter(letter_templates::tenant_id.eq(tenant_id))
                .filter(letter_templates::id.eq(template_id))
                .select(TemplateRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        Ok(row.map(LetterTemplate::from))
    }
}
