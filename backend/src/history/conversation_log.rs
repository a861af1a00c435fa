use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use shared::{ConversationEntry, EntryKind};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Conversation store unavailable: {0}")]
    StorageUnavailable(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

/// Append-only log of AI exchanges, keyed by an auto-incrementing id.
///
/// Every operation takes the connection lock on a blocking thread, so concurrent
/// appends from independent requests are serialised and none are lost.
#[derive(Clone)]
pub struct ConversationLog {
    conn: Option<Arc<Mutex<Connection>>>,
    unavailable_reason: Arc<str>,
}

impl ConversationLog {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// A log whose every operation fails with `StorageUnavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            conn: None,
            unavailable_reason: Arc::from(reason.into()),
        }
    }

    fn from_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                request TEXT NOT NULL,
                response TEXT NOT NULL,
                kind TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Some(Arc::new(Mutex::new(conn))),
            unavailable_reason: Arc::from(""),
        })
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    /// Runs `op` against the connection on the blocking pool. The guard is dropped
    /// when `op` returns, whichever way it returns.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, HistoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, HistoryError> + Send + 'static,
    {
        let conn = self
            .conn
            .clone()
            .ok_or_else(|| HistoryError::StorageUnavailable(self.unavailable_reason.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| HistoryError::StorageUnavailable("connection lock poisoned".into()))?;
            op(&guard)
        })
        .await
        .map_err(|e| HistoryError::StorageUnavailable(e.to_string()))?
    }

    pub async fn append(
        &self,
        kind: EntryKind,
        request: &str,
        response: &str,
    ) -> Result<i64, HistoryError> {
        let request = request.to_string();
        let response = response.to_string();
        let timestamp = Utc::now().to_rfc3339();

        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (timestamp, request, response, kind) VALUES (?1, ?2, ?3, ?4)",
                    params![timestamp, request, response, kind.as_ref()],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        log::debug!("Appended {} exchange #{} to conversation log", kind, id);
        Ok(id)
    }

    /// Every entry in insertion order.
    pub async fn all(&self) -> Result<Vec<ConversationEntry>, HistoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, request, response, kind FROM conversations ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], row_to_raw)?;
            rows.map(|row| row?.into_entry()).collect()
        })
        .await
    }

    /// The last `n` entries, oldest first (most-recent-last).
    pub async fn recent(&self, n: usize) -> Result<Vec<ConversationEntry>, HistoryError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);

        let mut entries = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, request, response, kind FROM conversations ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], row_to_raw)?;
                rows.map(|row| row?.into_entry())
                    .collect::<Result<Vec<_>, HistoryError>>()
            })
            .await?;

        entries.reverse();
        Ok(entries)
    }

    pub async fn count(&self) -> Result<usize, HistoryError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
            Ok(count.max(0) as usize)
        })
        .await
    }

    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM conversations", [])?;
            Ok(())
        })
        .await?;
        log::info!("Conversation log cleared");
        Ok(())
    }
}

struct RawEntry {
    id: i64,
    timestamp: String,
    request: String,
    response: String,
    kind: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        request: row.get(2)?,
        response: row.get(3)?,
        kind: row.get(4)?,
    })
}

impl RawEntry {
    fn into_entry(self) -> Result<ConversationEntry, HistoryError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| HistoryError::InvalidData(format!("timestamp of #{}: {}", self.id, e)))?
            .with_timezone(&Utc);
        let kind = EntryKind::from_str(&self.kind)
            .map_err(|_| HistoryError::InvalidData(format!("kind of #{}: {}", self.id, self.kind)))?;

        Ok(ConversationEntry {
            id: self.id,
            timestamp,
            request: self.request,
            response: self.response,
            kind,
        })
    }
}
