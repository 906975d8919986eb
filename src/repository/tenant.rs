//! Tenant profile store (display name, letterhead, logo).

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use super::models::TenantProfileRow;
use super::pool::{DbError, DbPool};
use super::util::parse_datetime;
use crate::models::TenantProfile;
use crate::schema::tenant_profiles;
use crate::storage::StorageReference;
use crate::{with_conn, with_conn_split};

/// Resolves per-tenant letterhead configuration.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn profile(&self, tenant_id: &str) -> Result<Option<TenantProfile>, DbError>;

    /// Swap the logo reference only if it still equals `expected`.
    ///
    /// Returns false when the profile is missing or another writer changed
    /// the logo first.
    async fn replace_logo(
        &self,
        tenant_id: &str,
        expected: Option<&StorageReference>,
        logo: &StorageReference,
    ) -> Result<bool, DbError>;
}

impl From<TenantProfileRow> for TenantProfile {
    fn from(row: TenantProfileRow) -> Self {
        let logo = row.logo.as_deref().and_then(|encoded| {
            StorageReference::decode(encoded)
                .map_err(|e| warn!(tenant = %row.tenant_id, "Ignoring malformed logo reference: {}", e))
                .ok()
        });
        TenantProfile {
            tenant_id: row.tenant_id,
            display_name: row.display_name,
            letterhead_markup: row.letterhead_markup,
            logo,
            updated_at: parse_datetime(&row.updated_at),
        }
    }
}

/// Diesel-backed tenant profile repository.
#[derive(Clone)]
pub struct DieselTenantRepository {
    pool: DbPool,
}

impl DieselTenantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a tenant profile.
    pub async fn save(&self, profile: &TenantProfile) -> Result<(), DbError> {
        let logo = profile.logo.as_ref().map(StorageReference::encode);
        let updated_at = Utc::now().to_rfc3339();
        let values = (
            tenant_profiles::tenant_id.eq(&profile.tenant_id),
            tenant_profiles::display_name.eq(&profile.display_name),
            tenant_profiles::letterhead_markup.eq(profile.letterhead_markup.as_deref()),
            tenant_profiles::logo.eq(logo.as_deref()),
            tenant_profiles::updated_at.eq(&updated_at),
        );

        with_conn_split!(self.pool,
            sqlite: conn => {
                diesel::replace_into(tenant_profiles::table)
                    .values(values)
                    .execute(&mut conn)
                    .await?;
                Ok(())
            },
            postgres: conn => {
                diesel::insert_into(tenant_profiles::table)
                    .values(values)
                    .on_conflict(tenant_profiles::tenant_id)
                    .do_update()
                    .set((
                        tenant_profiles::display_name.eq(&profile.display_name),
                        tenant_profiles::letterhead_markup.eq(profile.letterhead_markup.as_deref()),
                        tenant_profiles::logo.eq(logo.as_deref()),
                        tenant_profiles::updated_at.eq(&updated_at),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        )
    }
}

#[async_trait]
impl TenantDirectory for DieselTenantRepository {
    async fn profile(&self, tenant_id: &str) -> Result<Option<TenantProfile>, DbError> {
        let row: Option<TenantProfileRow> = with_conn!(self.pool, conn => {
            tenant_profiles::table
                .filter(tenant_profiles::tenant_id.eq(tenant_id))
                .select(TenantProfileRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        Ok(row.map(TenantProfile::from))
    }

    async fn replace_logo(
        &self,
        tenant_id: &str,
        expected: Option<&StorageReference>,
        logo: &StorageReference,
    ) -> Result<bool, DbError> {
        let encoded = logo.encode();
        let expected = expected.map(StorageReference::encode);
        let now = Utc::now().to_rfc3339();

        let updated: usize = with_conn!(self.pool, conn => {
            let target = tenant_profiles::table.filter(tenant_profiles::tenant_id.eq(tenant_id));
            match expected.as_deref() {
                Some(old) => {
                    diesel::update(target.filter(tenant_profiles::logo.eq(old)))
                        .set((
                            tenant_profiles::logo.eq(Some(encoded.as_str())),
                            tenant_profiles::updated_at.eq(&now),
                        ))
                        .execute(&mut conn)
                        .await
                }
                None => {
                    diesel::update(target.filter(tenant_profiles::logo.is_null()))
                        .set((
                            tenant_profiles::logo.eq(Some(encoded.as_str())),
                            tenant_profiles::updated_at.eq(&now),
                        ))
                        .execute(&mut conn)
                        .await
                }
            }
        })?;
        Ok(updated > 0)
    }
}
