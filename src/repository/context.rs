//! Database context: owns the pool and hands out repositories.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::document::DieselDocumentRepository;
use super::pool::{DbError, DbPool, SqliteConn};
use super::template::DieselTemplateRepository;
use super::tenant::DieselTenantRepository;
use crate::sequence::DatabaseCounterStore;
use crate::with_conn_split;

#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

/// Database context that manages the connection pool and provides
/// repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("letters.db")?;
/// ctx.init_schema().await?;
/// let record = ctx.documents().find_by_id("school-1", &id).await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database file path (SQLite only).
    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: DbPool::sqlite_from_path(db_path),
        }
    }

    /// Create a context from a database URL.
    ///
    /// Supports:
    /// - SQLite: file paths or `sqlite:` URLs
    /// - PostgreSQL: `postgres://` or `postgresql://` URLs
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        Ok(Self {
            pool: DbPool::from_url(url)?,
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn documents(&self) -> DieselDocumentRepository {
        DieselDocumentRepository::new(self.pool.clone())
    }

    pub fn templates(&self) -> DieselTemplateRepository {
        DieselTemplateRepository::new(self.pool.clone())
    }

    pub fn tenants(&self) -> DieselTenantRepository {
        DieselTenantRepository::new(self.pool.clone())
    }

    pub fn counters(&self) -> DatabaseCounterStore {
        DatabaseCounterStore::new(self.pool.clone())
    }

    /// Create all tables if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                Self::init_sqlite_schema(&mut conn).await
            },
            postgres: conn => {
                Self::init_postgres_schema(&mut conn).await
            }
        )
    }

    async fn init_sqlite_schema(conn: &mut SqliteConn) -> Result<(), DbError> {
        conn.batch_execute(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                serial_number TEXT NOT NULL,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                document_date TEXT NOT NULL,
                direction TEXT NOT NULL,
                storage_reference TEXT,
                status TEXT,
                template_id TEXT,
                rendered_form_data TEXT,
                content TEXT,
                created_by TEXT NOT NULL,
                approved_by TEXT,
                approved_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(tenant_id, serial_number)
            );

            CREATE TABLE IF NOT EXISTS letter_templates (
                tenant_id TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                body TEXT NOT NULL,
                fields TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, id)
            );

            CREATE TABLE IF NOT EXISTS tenant_profiles (
                tenant_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                letterhead_markup TEXT,
                logo TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sequence_counters (
                tenant_id TEXT NOT NULL,
                period TEXT NOT NULL,
                value INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (tenant_id, period)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_tenant_status ON documents(tenant_id, status);
            CREATE INDEX IF NOT EXISTS idx_documents_tenant_created ON documents(tenant_id, created_at);
            "#,
        )
        .await
    }

    #[cfg(feature = "postgres")]
    async fn init_postgres_schema(conn: &mut AsyncPgConnection) -> Result<(), DbError> {
        use diesel_async::RunQueryDsl;

        // PostgreSQL requires separate statements
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                serial_number TEXT NOT NULL,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                document_date TEXT NOT NULL,
                direction TEXT NOT NULL,
                storage_reference TEXT,
                status TEXT,
                template_id TEXT,
                rendered_form_data TEXT,
                content TEXT,
                created_by TEXT NOT NULL,
                approved_by TEXT,
                approved_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(tenant_id, serial_number)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS letter_templates (
                tenant_id TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                body TEXT NOT NULL,
                fields TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, id)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS tenant_profiles (
                tenant_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                letterhead_markup TEXT,
                logo TEXT,
                updated_at TEXT NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS sequence_counters (
                tenant_id TEXT NOT NULL,
                period TEXT NOT NULL,
                value BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (tenant_id, period)
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_documents_tenant_status ON documents(tenant_id, status)",
            "CREATE INDEX IF NOT EXISTS idx_documents_tenant_created ON documents(tenant_id, created_at)",
        ];

        for stmt in statements {
            diesel::sql_query(stmt).execute(conn).await?;
        }
        Ok(())
    }

    /// Names of all tables in the database.
    pub async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                let rows: Vec<TableName> = diesel_async::RunQueryDsl::load(
                    diesel::sql_query(
                        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                    ),
                    &mut conn,
                )
                .await?;
                Ok(rows.into_iter().map(|r| r.name).collect())
            },
            postgres: conn => {
                use diesel_async::RunQueryDsl;
                let rows: Vec<TableName> = diesel::sql_query(
                    "SELECT tablename as name FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
                )
                .load(&mut conn)
                .await?;
                Ok(rows.into_iter().map(|r| r.name).collect())
            }
        )
    }
}

#[derive(diesel::QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}
