//! SQLite Message Store
//!
//! Stores every published message in a single `messages` table with an
//! auto-incrementing id. Queries run on tokio's blocking pool so the
//! publish path never blocks a runtime worker on disk I/O.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::{StorageError, StorageResult};
use super::sink::MessageSink;
use super::types::StoredMessage;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages(channel, id);
";

/// SQLite-backed message history
#[derive(Clone)]
pub struct SqliteMessageStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteMessageStore {
    /// Open or create a message database at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // Configure for performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!(path = ?path, "Opened message store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Create a throwaway in-memory store
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Total number of recorded messages
    pub async fn count(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StorageError::Lock(e.to_string()))?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl MessageSink for SqliteMessageStore {
    async fn append(&self, channel: &str, content: &str) -> StorageResult<i64> {
        let channel = channel.to_string();
        let content = content.to_string();

        let id = self
            .with_conn(move |conn| {
                let created_at = Utc::now().timestamp_millis();
                conn.prepare_cached(
                    "INSERT INTO messages (channel, content, created_at) VALUES (?1, ?2, ?3)",
                )?
                .execute(params![channel, content, created_at])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::trace!(message_id = id, "Message recorded");
        Ok(id)
    }

    async fn recent(&self, channel: &str, limit: usize) -> StorageResult<Vec<StoredMessage>> {
        let channel = channel.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, channel, content, created_at FROM messages
                 WHERE channel = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt.query_map(params![channel, limit], |row| {
                let millis: i64 = row.get(3)?;
                let created_at = DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, millis))?;

                Ok(StoredMessage {
                    id: row.get(0)?,
                    channel: row.get(1)?,
                    content: row.get(2)?,
                    created_at,
                })
            })?;

            let messages = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for SqliteMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMessageStore")
            .field("path", &self.path)
            .finish()
    }
}
