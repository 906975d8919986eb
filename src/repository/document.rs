//! Document record store.
//!
//! Every query is scoped by tenant. Status changes are single conditional
//! `UPDATE` statements guarded by `status = 'pending'`, so two racing
//! approvals cannot both win and a record is never half-approved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::models::{DocumentRow, NewDocument};
use super::pool::{DbError, DbPool};
use super::util::{is_unique_violation, parse_date, parse_datetime, parse_datetime_opt};
use crate::models::{Direction, DocumentRecord, DocumentStatus, FormData};
use crate::schema::documents;
use crate::storage::StorageReference;
use crate::with_conn;

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serial number '{0}' already exists for this tenant")]
    DuplicateSerialNumber(String),

    #[error("Document not found")]
    NotFound,

    #[error("Cannot change document status from {} to {to}", status_label(.from))]
    InvalidStateTransition {
        from: Option<DocumentStatus>,
        to: DocumentStatus,
    },

    #[error("Corrupt document row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn status_label(status: &Option<DocumentStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("archived")
}

/// Filter for [`DocumentStore::list`].
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub direction: Option<Direction>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Persistence contract for document records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateSerialNumber` when the
    /// tenant already has a record with the same serial number.
    async fn create(&self, record: DocumentRecord) -> StoreResult<DocumentRecord>;

    async fn find_by_id(&self, tenant_id: &str, id: &str) -> StoreResult<DocumentRecord>;

    async fn find_by_serial(
        &self,
        tenant_id: &str,
        serial_number: &str,
    ) -> StoreResult<Option<DocumentRecord>>;

    /// Move a pending record to `new_status`. The approver is recorded only
    /// on approval.
    async fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        new_status: DocumentStatus,
        approver_id: Option<&str>,
    ) -> StoreResult<DocumentRecord>;

    /// Approve a pending record and attach its artifact in one statement.
    async fn approve_with_artifact(
        &self,
        tenant_id: &str,
        id: &str,
        reference: &StorageReference,
        approver_id: &str,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<DocumentRecord>;

    async fn delete(&self, tenant_id: &str, id: &str) -> StoreResult<()>;

    /// List records, newest first.
    async fn list(&self, tenant_id: &str, filter: &DocumentFilter)
        -> StoreResult<Vec<DocumentRecord>>;
}

impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let direction = Direction::from_str(&row.direction)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown direction '{}'", row.direction)))?;
        let status = row
            .status
            .as_deref()
            .map(|s| {
                DocumentStatus::from_str(s)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", s)))
            })
            .transpose()?;
        let storage_reference = row
            .storage_reference
            .as_deref()
            .map(StorageReference::decode)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let rendered_form_data = row
            .rendered_form_data
            .as_deref()
            .map(|s| serde_json::from_str::<FormData>(s))
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("form data: {}", e)))?;
        let document_date = parse_date(&row.document_date)
            .ok_or_else(|| StoreError::Corrupt(format!("bad date '{}'", row.document_date)))?;

        Ok(DocumentRecord {
            id: row.id,
            tenant_id: row.tenant_id,
            serial_number: row.serial_number,
            title: row.title,
            category: row.category,
            document_date,
            direction,
            storage_reference,
            status,
            template_id: row.template_id,
            rendered_form_data,
            content: row.content,
            created_by: row.created_by,
            approved_by: row.approved_by,
            approved_at: parse_datetime_opt(row.approved_at.as_deref()),
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
        })
    }
}

/// Diesel-backed [`DocumentStore`].
#[derive(Clone)]
pub struct DieselDocumentRepository {
    pool: DbPool,
}

impl DieselDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, tenant_id: &str, id: &str) -> StoreResult<Option<DocumentRecord>> {
        let row: Option<DocumentRow> = with_conn!(self.pool, conn => {
            documents::table
                .filter(documents::tenant_id.eq(tenant_id))
                .filter(documents::id.eq(id))
                .select(DocumentRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        row.map(DocumentRecord::try_from).transpose()
    }

    /// Explain why a guarded update touched no rows.
    async fn rejected_transition(
        &self,
        tenant_id: &str,
        id: &str,
        to: DocumentStatus,
    ) -> StoreError {
        match self.load(tenant_id, id).await {
            Ok(Some(record)) => StoreError::InvalidStateTransition {
                from: record.status,
                to,
            },
            Ok(None) => StoreError::NotFound,
            Err(e) => e,
        }
    }
}

#[async_trait]
impl DocumentStore for DieselDocumentRepository {
    async fn create(&self, record: DocumentRecord) -> StoreResult<DocumentRecord> {
        let storage_reference = record.storage_reference.as_ref().map(StorageReference::encode);
        let rendered_form_data = record
            .rendered_form_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("form data: {}", e)))?;

        let new_doc = NewDocument {
            id: &record.id,
            tenant_id: &record.tenant_id,
            serial_number: &record.serial_number,
            title: &record.title,
            category: &record.category,
            document_date: record.document_date.format("%Y-%m-%d").to_string(),
            direction: record.direction.as_str(),
            storage_reference,
            status: record.status.as_ref().map(DocumentStatus::as_str),
            template_id: record.template_id.as_deref(),
            rendered_form_data,
            content: record.content.as_deref(),
            created_by: &record.created_by,
            approved_by: record.approved_by.as_deref(),
            approved_at: record.approved_at.map(|dt| dt.to_rfc3339()),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        };

        let inserted: Result<usize, DbError> = with_conn!(self.pool, conn => {
            diesel::insert_into(documents::table)
                .values(&new_doc)
                .execute(&mut conn)
                .await
        });

        match inserted {
            Ok(_) => {
                debug!(id = %record.id, serial = %record.serial_number, "Created document record");
                Ok(record)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateSerialNumber(record.serial_number))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, tenant_id: &str, id: &str) -> StoreResult<DocumentRecord> {
        self.load(tenant_id, id).await?.ok_or(StoreError::NotFound)
    }

    async fn find_by_serial(
        &self,
        tenant_id: &str,
        serial_number: &str,
    ) -> StoreResult<Option<DocumentRecord>> {
        let row: Option<DocumentRow> = with_conn!(self.pool, conn => {
            documents::table
                .filter(documents::tenant_id.eq(tenant_id))
                .filter(documents::serial_number.eq(serial_number))
                .select(DocumentRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        row.map(DocumentRecord::try_from).transpose()
    }

    async fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        new_status: DocumentStatus,
        approver_id: Option<&str>,
    ) -> StoreResult<DocumentRecord> {
        let current = self.find_by_id(tenant_id, id).await?;
        if new_status == DocumentStatus::Pending || !current.is_pending() {
            return Err(StoreError::InvalidStateTransition {
                from: current.status,
                to: new_status,
            });
        }

        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let (approved_by, approved_at) = match new_status {
            DocumentStatus::Approved => (approver_id, Some(now)),
            _ => (None, None),
        };
        let approved_at_text = approved_at.map(|at| at.to_rfc3339());

        let updated: usize = with_conn!(self.pool, conn => {
            diesel::update(
                documents::table
                    .filter(documents::tenant_id.eq(tenant_id))
                    .filter(documents::id.eq(id))
                    .filter(documents::status.eq(DocumentStatus::Pending.as_str())),
            )
            .set((
                documents::status.eq(new_status.as_str()),
                documents::approved_by.eq(approved_by),
                documents::approved_at.eq(approved_at_text.as_deref()),
                documents::updated_at.eq(&stamp),
            ))
            .execute(&mut conn)
            .await
        })?;

        if updated == 0 {
            return Err(self.rejected_transition(tenant_id, id, new_status).await);
        }
        // The update is committed; nothing fallible may follow it.
        Ok(DocumentRecord {
            status: Some(new_status),
            approved_by: approved_by.map(str::to_string),
            approved_at,
            updated_at: now,
            ..current
        })
    }

    async fn approve_with_artifact(
        &self,
        tenant_id: &str,
        id: &str,
        reference: &StorageReference,
        approver_id: &str,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<DocumentRecord> {
        let current = self.find_by_id(tenant_id, id).await?;
        if !current.is_pending() || current.storage_reference.is_some() {
            return Err(StoreError::InvalidStateTransition {
                from: current.status,
                to: DocumentStatus::Approved,
            });
        }

        let encoded = reference.encode();
        let approved_at_text = approved_at.to_rfc3339();
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        let updated: usize = with_conn!(self.pool, conn => {
            diesel::update(
                documents::table
                    .filter(documents::tenant_id.eq(tenant_id))
                    .filter(documents::id.eq(id))
                    .filter(documents::status.eq(DocumentStatus::Pending.as_str()))
                    .filter(documents::storage_reference.is_null()),
            )
            .set((
                documents::storage_reference.eq(Some(encoded.as_str())),
                documents::status.eq(DocumentStatus::Approved.as_str()),
                documents::approved_by.eq(Some(approver_id)),
                documents::approved_at.eq(Some(approved_at_text.as_str())),
                documents::updated_at.eq(&stamp),
            ))
            .execute(&mut conn)
            .await
        })?;

        if updated == 0 {
            return Err(self
                .rejected_transition(tenant_id, id, DocumentStatus::Approved)
                .await);
        }
        // Built from the row read before the guarded update, so a committed
        // approval is never reported as a failure.
        Ok(DocumentRecord {
            storage_reference: Some(reference.clone()),
            status: Some(DocumentStatus::Approved),
            approved_by: Some(approver_id.to_string()),
            approved_at: Some(approved_at),
            updated_at: now,
            ..current
        })
    }

    async fn delete(&self, tenant_id: &str, id: &str) -> StoreResult<()> {
        let deleted: usize = with_conn!(self.pool, conn => {
            diesel::delete(
                documents::table
                    .filter(documents::tenant_id.eq(tenant_id))
                    .filter(documents::id.eq(id)),
            )
            .execute(&mut conn)
            .await
        })?;

        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: &str,
        filter: &DocumentFilter,
    ) -> StoreResult<Vec<DocumentRecord>> {
        let status = filter.status.map(|s| s.as_str());
        let direction = filter.direction.map(|d| d.as_str());
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = filter.offset.unwrap_or(0);

        let rows: Vec<DocumentRow> = with_conn!(self.pool, conn => {
            let mut query = documents::table
                .filter(documents::tenant_id.eq(tenant_id))
                .select(DocumentRow::as_select())
                .into_boxed();
            if let Some(status) = status {
                query = query.filter(documents::status.eq(status));
            }
            if let Some(direction) = direction {
                query = query.filter(documents::direction.eq(direction));
            }
            query
                .order((documents::created_at.desc(), documents::serial_number.desc()))
                .limit(limit)
                .offset(offset)
                .load(&mut conn)
                .await
        })?;

        rows.into_iter().map(DocumentRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use crate::storage::BackendKind;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselDocumentRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let ctx = DbContext::from_path(&db_path);
        ctx.init_schema().await.unwrap();
        (ctx.documents(), dir)
    }

    fn archived(tenant: &str, serial: &str) -> DocumentRecord {
        DocumentRecord::archived(
            tenant,
            serial.to_string(),
            "Undangan Rapat".to_string(),
            "undangan".to_string(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            Direction::Inbound,
            StorageReference::new(BackendKind::ObjectStore, "undangan/1-a.pdf"),
            "user-1",
        )
    }

    fn pending(tenant: &str, serial: &str) -> DocumentRecord {
        let mut form = FormData::new();
        form.insert("nama".to_string(), "Budi".to_string());
        DocumentRecord::generated(
            tenant,
            serial.to_string(),
            "Surat Tugas".to_string(),
            "sk".to_string(),
            "tpl-1",
            form,
            "<p>Budi</p>".to_string(),
            "user-2",
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (repo, _dir) = setup_test_db().await;
        let record = repo.create(archived("school-1", "12/UND/2025")).await.unwrap();

        let found = repo.find_by_id("school-1", &record.id).await.unwrap();
        assert_eq!(found.serial_number, "12/UND/2025");
        assert_eq!(found.storage_reference, record.storage_reference);
        assert_eq!(found.status, None);

        let by_serial = repo.find_by_serial("school-1", "12/UND/2025").await.unwrap();
        assert_eq!(by_serial.map(|r| r.id), Some(record.id.clone()));

        // Other tenants cannot see it.
        assert!(matches!(
            repo.find_by_id("school-2", &record.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(repo.find_by_serial("school-2", "12/UND/2025").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_serial_is_per_tenant() {
        let (repo, _dir) = setup_test_db().await;
        repo.create(archived("school-1", "001/SK/school-1/2025")).await.unwrap();

        let err = repo
            .create(archived("school-1", "001/SK/school-1/2025"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSerialNumber(s) if s == "001/SK/school-1/2025"));

        repo.create(archived("school-2", "001/SK/school-1/2025")).await.unwrap();
    }

    #[tokio::test]
    async fn test_form_data_round_trip() {
        let (repo, _dir) = setup_test_db().await;
        let record = repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();
        let found = repo.find_by_id("school-1", &record.id).await.unwrap();
        assert_eq!(found.rendered_form_data, record.rendered_form_data);
        assert_eq!(found.content.as_deref(), Some("<p>Budi</p>"));
        assert_eq!(found.status, Some(DocumentStatus::Pending));
        assert!(found.storage_reference.is_none());
    }

    #[tokio::test]
    async fn test_update_status_only_from_pending() {
        let (repo, _dir) = setup_test_db().await;
        let record = repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();

        let rejected = repo
            .update_status("school-1", &record.id, DocumentStatus::Rejected, Some("head"))
            .await
            .unwrap();
        assert_eq!(rejected.status, Some(DocumentStatus::Rejected));
        assert!(rejected.approved_by.is_none());

        let err = repo
            .update_status("school-1", &record.id, DocumentStatus::Approved, Some("head"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidStateTransition {
                from: Some(DocumentStatus::Rejected),
                to: DocumentStatus::Approved
            }
        ));

        let err = repo
            .update_status("school-1", "missing", DocumentStatus::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_update_status_rejects_archived_and_pending_target() {
        let (repo, _dir) = setup_test_db().await;
        let archived = repo.create(archived("school-1", "5/IN/2025")).await.unwrap();
        let err = repo
            .update_status("school-1", &archived.id, DocumentStatus::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStateTransition { from: None, .. }));

        let record = repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();
        let err = repo
            .update_status("school-1", &record.id, DocumentStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_approve_with_artifact_sets_all_fields() {
        let (repo, _dir) = setup_test_db().await;
        let record = repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();
        let reference = StorageReference::new(BackendKind::MediaHost, "abc123");
        let at = Utc::now();

        let approved = repo
            .approve_with_artifact("school-1", &record.id, &reference, "head", at)
            .await
            .unwrap();
        assert_eq!(approved.status, Some(DocumentStatus::Approved));
        assert_eq!(approved.storage_reference, Some(reference.clone()));
        assert_eq!(approved.approved_by.as_deref(), Some("head"));
        assert_eq!(approved.approved_at.map(|t| t.timestamp()), Some(at.timestamp()));

        let err = repo
            .approve_with_artifact("school-1", &record.id, &reference, "head", at)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStateTransition { .. }));
    }

    async fn execute_sql(ctx: &DbContext, sql: &str) -> Result<usize, DbError> {
        crate::with_conn!(ctx.pool(), conn => {
            diesel::sql_query(sql).execute(&mut conn).await
        })
    }

    #[tokio::test]
    async fn test_approval_survives_unreadable_row_after_commit() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.documents();
        let record = repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();

        // Garble the row as soon as it is approved, so any re-read would fail.
        execute_sql(
            &ctx,
            "CREATE TRIGGER garble_after_approve AFTER UPDATE OF status ON documents \
             WHEN NEW.status = 'approved' \
             BEGIN UPDATE documents SET direction = 'garbled' WHERE id = NEW.id; END",
        )
        .await
        .unwrap();

        let reference = StorageReference::new(BackendKind::ObjectStore, "sk/1-letter.pdf");
        let approved = repo
            .approve_with_artifact("school-1", &record.id, &reference, "head", Utc::now())
            .await
            .unwrap();
        assert_eq!(approved.status, Some(DocumentStatus::Approved));
        assert_eq!(approved.storage_reference, Some(reference));
        assert_eq!(approved.id, record.id);

        assert!(matches!(
            repo.find_by_id("school-1", &record.id).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_returns_committed_record() {
        let (repo, _dir) = setup_test_db().await;
        let record = repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();

        let approved = repo
            .update_status("school-1", &record.id, DocumentStatus::Approved, Some("head"))
            .await
            .unwrap();
        let stored = repo.find_by_id("school-1", &record.id).await.unwrap();
        assert_eq!(approved.status, stored.status);
        assert_eq!(approved.approved_by, stored.approved_by);
        assert_eq!(
            approved.approved_at.map(|t| t.timestamp()),
            stored.approved_at.map(|t| t.timestamp())
        );
        assert_eq!(approved.rendered_form_data, stored.rendered_form_data);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let (repo, _dir) = setup_test_db().await;
        let a = repo.create(archived("school-1", "1/IN/2025")).await.unwrap();
        repo.create(pending("school-1", "001/SK/school-1/2025")).await.unwrap();
        repo.create(pending("school-2", "001/SK/school-2/2025")).await.unwrap();

        let all = repo.list("school-1", &DocumentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_pending = repo
            .list(
                "school-1",
                &DocumentFilter {
                    status: Some(DocumentStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(only_pending.len(), 1);
        assert_eq!(only_pending[0].direction, Direction::Generated);

        repo.delete("school-1", &a.id).await.unwrap();
        assert!(matches!(repo.delete("school-1", &a.id).await, Err(StoreError::NotFound)));
        assert_eq!(repo.list("school-1", &DocumentFilter::default()).await.unwrap().len(), 1);
    }
}
