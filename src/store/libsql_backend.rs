//! libSQL backend: async `EntryStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DatabaseError, EntryError};
use crate::sinks::{EntryStore, NewEntry};
use crate::store::migrations;

/// libSQL-backed content entry store.
///
/// Stores a single connection that is reused for all operations. The
/// connection carries at most one open transaction, so access is serialized.
pub struct LibSqlEntryStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Mutex<Connection>,
}

impl LibSqlEntryStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        store.init_schema().await?;
        info!(path = %path.display(), "Entry database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        store.init_schema().await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
        })
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;
        migrations::run_migrations(&conn).await
    }

    /// Register a section / entry-type pair so entries can be filed under it.
    pub async fn ensure_entry_type(&self, section: &str, entry_type: &str) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO sections (handle) VALUES (?1)",
            params![section],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("ensure section: {e}")))?;
        conn.execute(
            "INSERT OR IGNORE INTO entry_types (section_handle, handle) VALUES (?1, ?2)",
            params![section, entry_type],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("ensure entry type: {e}")))?;
        debug!(section, entry_type, "Entry type registered");
        Ok(())
    }

    /// Number of saved entries in a section.
    pub async fn count_entries(&self, section: &str) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().await;
        scalar(
            &conn,
            "SELECT COUNT(*) FROM entries WHERE section_handle = ?1",
            params![section],
        )
        .await
    }

    /// Read a single field value back.
    pub async fn field_value(&self, entry_id: &str, handle: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT value FROM entry_fields WHERE entry_id = ?1 AND handle = ?2",
                params![entry_id, handle],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("field_value: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("field_value: {e}")))?
        {
            Some(row) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("field_value: {e}"))),
            None => Ok(None),
        }
    }
}

/// First column of the first row as an integer, 0 when there is no row.
async fn scalar(conn: &Connection, sql: &str, params: impl libsql::params::IntoParams) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(sql, params)
        .await
        .map_err(|e| DatabaseError::Query(format!("{sql}: {e}")))?;
    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{sql}: {e}")))?;
    match row {
        Some(row) => row.get(0).map_err(|e| DatabaseError::Query(format!("{sql}: {e}"))),
        None => Ok(0),
    }
}

#[async_trait]
impl EntryStore for LibSqlEntryStore {
    async fn create_entry(&self, entry: &NewEntry) -> Result<String, EntryError> {
        let section = &entry.target.section;
        let entry_type = &entry.target.entry_type;

        // Held until commit: checks and inserts see one consistent state.
        let conn = self.conn.lock().await;

        if scalar(&conn, "SELECT COUNT(*) FROM sections WHERE handle = ?1", params![section.as_str()])
            .await?
            == 0
        {
            return Err(EntryError::SectionNotFound {
                section: section.clone(),
            });
        }

        if scalar(
            &conn,
            "SELECT COUNT(*) FROM entry_types WHERE section_handle = ?1 AND handle = ?2",
            params![section.as_str(), entry_type.as_str()],
        )
        .await?
            == 0
        {
            return Err(EntryError::EntryTypeNotFound {
                section: section.clone(),
                entry_type: entry_type.clone(),
            });
        }

        if entry.title.trim().is_empty() {
            return Err(EntryError::Rejected("Title cannot be blank.".into()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("begin create_entry: {e}")))?;

        tx.execute(
            "INSERT INTO entries (id, section_handle, entry_type_handle, title, slug, enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.clone(),
                section.as_str(),
                entry_type.as_str(),
                entry.title.as_str(),
                entry.slug.as_str(),
                i64::from(entry.enabled),
                now,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert entry: {e}")))?;

        for (handle, value) in &entry.fields {
            tx.execute(
                "INSERT INTO entry_fields (entry_id, handle, value) VALUES (?1, ?2, ?3)",
                params![id.clone(), handle.as_str(), value.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert entry field {handle}: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit create_entry: {e}")))?;

        debug!(id = %id, section = %section, title = %entry.title, "Entry saved");
        Ok(id)
    }
}
