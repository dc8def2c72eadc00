use crate::error::{CounselError, Result};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

pub mod types;
pub use types::{ConsultationSession, Exchange, NewExchange};

/// Persistence contract used by the consultation service
///
/// Exchanges are append-only. `append_exchange` records the exchange and
/// advances the owning session's `updated_at` as one unit.
#[async_trait]
pub trait ConsultationStore: Send + Sync {
    /// Create a new session owned by `user_id`
    async fn create_session(&self, user_id: &str) -> Result<ConsultationSession>;

    /// Find a session by id, only if it is owned by `user_id`
    async fn find_session(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<ConsultationSession>>;

    /// Persist an exchange and touch its session
    async fn append_exchange(&self, exchange: NewExchange) -> Result<Exchange>;

    /// Exchanges of a session, oldest first
    async fn list_exchanges(&self, session_id: &str) -> Result<Vec<Exchange>>;

    /// Sessions owned by `user_id`, most recently updated first
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ConsultationSession>>;
}

/// Storage backend for consultation history
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

fn storage_err(e: anyhow::Error) -> CounselError {
    CounselError::Storage(format!("{:#}", e))
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ConsultationSession> {
    Ok(ConsultationSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: parse_timestamp(row, 2)?,
        updated_at: parse_timestamp(row, 3)?,
    })
}

fn exchange_from_row(row: &Row<'_>) -> rusqlite::Result<Exchange> {
    Ok(Exchange {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        message: row.get(3)?,
        response: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("CAMPUS_COUNSEL_HISTORY_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("edu", "campus-counsel", "campus-counsel")
            .ok_or_else(|| CounselError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(storage_err)?;

        Self::new_with_path(data_dir.join("consultations.db"))
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use campus_counsel::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("c.db")).unwrap();
    /// assert!(storage.db_path().exists());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(storage_err)?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Open the configured database, or the default one when none is set
    pub fn from_config(config: &crate::config::StorageConfig) -> Result<Self> {
        match &config.db_path {
            Some(path) => Self::new_with_path(path),
            None => Self::new(),
        }
    }

    /// Path of the backing database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(storage_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(storage_err)?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS consultation_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user
                ON consultation_sessions (user_id, updated_at);
            CREATE TABLE IF NOT EXISTS consultations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL REFERENCES consultation_sessions(id),
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_consultations_session
                ON consultations (session_id, created_at);",
        )
        .context("Failed to create tables")
        .map_err(storage_err)?;

        Ok(())
    }

    /// Create a new session owned by `user_id`
    pub fn create_session_sync(&self, user_id: &str) -> Result<ConsultationSession> {
        let conn = self.open()?;
        let created_at = now();
        let session = ConsultationSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at,
            updated_at: created_at,
        };

        conn.execute(
            "INSERT INTO consultation_sessions (id, user_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)",
            params![session.id, session.user_id, format_timestamp(&created_at)],
        )
        .context("Failed to insert session")
        .map_err(storage_err)?;

        tracing::debug!(session_id = %session.id, "Created consultation session");
        Ok(session)
    }

    /// Find a session by id and owner
    pub fn find_session_sync(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<ConsultationSession>> {
        let conn = self.open()?;
        let session = conn
            .query_row(
                "SELECT id, user_id, created_at, updated_at
                FROM consultation_sessions
                WHERE id = ?1 AND user_id = ?2",
                params![session_id, user_id],
                session_from_row,
            )
            .optional()
            .context("Failed to query session")
            .map_err(storage_err)?;
        Ok(session)
    }

    /// Record an exchange and advance the session's `updated_at`
    pub fn append_exchange_sync(&self, new: NewExchange) -> Result<Exchange> {
        let mut conn = self.open()?;
        let exchange = Exchange {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: new.session_id,
            user_id: new.user_id,
            message: new.message,
            response: new.response,
            created_at: now(),
        };
        let created_at = format_timestamp(&exchange.created_at);

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(storage_err)?;

        tx.execute(
            "INSERT INTO consultations (id, session_id, user_id, message, response, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exchange.id,
                exchange.session_id,
                exchange.user_id,
                exchange.message,
                exchange.response,
                created_at
            ],
        )
        .context("Failed to insert consultation")
        .map_err(storage_err)?;

        // updated_at never moves backwards
        let touched = tx
            .execute(
                "UPDATE consultation_sessions SET updated_at = max(updated_at, ?1) WHERE id = ?2",
                params![created_at, exchange.session_id],
            )
            .context("Failed to touch session")
            .map_err(storage_err)?;
        if touched == 0 {
            return Err(CounselError::SessionNotFound(exchange.session_id).into());
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(storage_err)?;

        Ok(exchange)
    }

    /// Exchanges of a session, oldest first
    pub fn list_exchanges_sync(&self, session_id: &str) -> Result<Vec<Exchange>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, user_id, message, response, created_at
                FROM consultations
                WHERE session_id = ?1
                ORDER BY created_at ASC, seq ASC",
            )
            .context("Failed to prepare statement")
            .map_err(storage_err)?;

        let exchanges = stmt
            .query_map(params![session_id], exchange_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .context("Failed to query consultations")
            .map_err(storage_err)?;
        Ok(exchanges)
    }

    /// Sessions owned by `user_id`, most recently updated first
    pub fn list_sessions_sync(&self, user_id: &str) -> Result<Vec<ConsultationSession>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, created_at, updated_at
                FROM consultation_sessions
                WHERE user_id = ?1
                ORDER BY updated_at DESC",
            )
            .context("Failed to prepare statement")
            .map_err(storage_err)?;

        let sessions = stmt
            .query_map(params![user_id], session_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .context("Failed to query sessions")
            .map_err(storage_err)?;
        Ok(sessions)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteStorage) -> Result<T> + Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || f(storage))
            .await
            .map_err(|e| CounselError::Storage(format!("Storage task failed: {}", e)))?
    }
}

#[async_trait]
impl ConsultationStore for SqliteStorage {
    async fn create_session(&self, user_id: &str) -> Result<ConsultationSession> {
        let user_id = user_id.to_string();
        self.blocking(move |s| s.create_session_sync(&user_id)).await
    }

    async fn find_session(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<ConsultationSession>> {
        let (session_id, user_id) = (session_id.to_string(), user_id.to_string());
        self.blocking(move |s| s.find_session_sync(&session_id, &user_id))
            .await
    }

    async fn append_exchange(&self, exchange: NewExchange) -> Result<Exchange> {
        self.blocking(move |s| s.append_exchange_sync(exchange)).await
    }

    async fn list_exchanges(&self, session_id: &str) -> Result<Vec<Exchange>> {
        let session_id = session_id.to_string();
        self.blocking(move |s| s.list_exchanges_sync(&session_id)).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ConsultationSession>> {
        let user_id = user_id.to_string();
        self.blocking(move |s| s.list_sessions_sync(&user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("consultations.db");
        let storage = SqliteStorage::new_with_path(db_path).expect("failed to create storage");
        (storage, dir)
    }

    fn new_exchange(session_id: &str, message: &str) -> NewExchange {
        NewExchange {
            session_id: session_id.to_string(),
            user_id: "u1".to_string(),
            message: message.to_string(),
            response: format!("reply to {}", message),
        }
    }

    #[test]
    fn test_init_creates_tables() {
        let (storage, _dir) = create_test_storage();
        let conn = Connection::open(storage.db_path()).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                AND name IN ('consultation_sessions', 'consultations')",
                [],
                |row| row.get(0),
            )
            .expect("query tables");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_create_and_find_session() {
        let (storage, _dir) = create_test_storage();
        let session = storage.create_session_sync("u1").unwrap();
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
        assert_eq!(session.created_at, session.updated_at);

        let found = storage.find_session_sync(&session.id, "u1").unwrap();
        assert_eq!(found, Some(session));
    }

    #[test]
    fn test_find_session_respects_owner() {
        let (storage, _dir) = create_test_storage();
        let session = storage.create_session_sync("u1").unwrap();
        assert!(storage.find_session_sync(&session.id, "u2").unwrap().is_none());
        assert!(storage.find_session_sync("missing", "u1").unwrap().is_none());
    }

    #[test]
    fn test_append_exchange_touches_session() {
        let (storage, _dir) = create_test_storage();
        let session = storage.create_session_sync("u1").unwrap();

        let exchange = storage
            .append_exchange_sync(new_exchange(&session.id, "hello"))
            .unwrap();
        assert_eq!(exchange.session_id, session.id);

        let reloaded = storage.find_session_sync(&session.id, "u1").unwrap().unwrap();
        assert!(reloaded.updated_at >= reloaded.created_at);
        assert_eq!(reloaded.updated_at, exchange.created_at);
    }

    #[test]
    fn test_append_exchange_unknown_session_persists_nothing() {
        let (storage, _dir) = create_test_storage();
        assert!(storage
            .append_exchange_sync(new_exchange("no-such-session", "hello"))
            .is_err());
        assert!(storage.list_exchanges_sync("no-such-session").unwrap().is_empty());
    }

    #[test]
    fn test_list_exchanges_in_insertion_order() {
        let (storage, _dir) = create_test_storage();
        let session = storage.create_session_sync("u1").unwrap();
        for message in ["first", "second", "third"] {
            storage
                .append_exchange_sync(new_exchange(&session.id, message))
                .unwrap();
        }

        let exchanges = storage.list_exchanges_sync(&session.id).unwrap();
        let messages: Vec<&str> = exchanges.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(exchanges
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn test_list_sessions_most_recent_first() {
        let (storage, _dir) = create_test_storage();
        let older = storage.create_session_sync("u1").unwrap();
        let newer = storage.create_session_sync("u1").unwrap();
        storage.create_session_sync("u2").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        storage
            .append_exchange_sync(new_exchange(&older.id, "bump"))
            .unwrap();

        let sessions = storage.list_sessions_sync("u1").unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![older.id.as_str(), newer.id.as_str()]);
    }

    #[tokio::test]
    async fn test_store_trait_roundtrip() {
        let (storage, _dir) = create_test_storage();
        let store: &dyn ConsultationStore = &storage;
        let session = store.create_session("u1").await.unwrap();
        store
            .append_exchange(new_exchange(&session.id, "hi"))
            .await
            .unwrap();
        assert_eq!(store.list_exchanges(&session.id).await.unwrap().len(), 1);
        assert_eq!(store.list_sessions("u1").await.unwrap().len(), 1);
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("override.db");
        env::set_var("CAMPUS_COUNSEL_HISTORY_DB", &db_path);

        let storage = SqliteStorage::new().expect("storage from env");
        assert_eq!(storage.db_path(), db_path.as_path());

        env::remove_var("CAMPUS_COUNSEL_HISTORY_DB");
    }
}
