//! Session store: in-memory ownership plus durable snapshots.
//!
//! The store exclusively owns `Session` values behind per-session locks.
//! Every mutation is followed by a snapshot write; snapshots are JSON files
//! written atomically (temp file + rename). Answer, evaluation, and
//! interruption records additionally land in an append-only SQLite event
//! log.

use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::state::Session;

/// Tables accepted by `append_event`.
const EVENT_TABLES: [&str; 4] = ["answers", "evaluations", "interruptions", "audio_files"];

/// Durable persistence surface: key/value snapshots keyed by session id,
/// plus append-only event logs.
pub trait SnapshotStore: Send + Sync {
    /// Write one session snapshot.
    fn save_session(&self, session_id: &str, blob: &str) -> Result<()>;

    /// Load all snapshots, keyed by session id.
    fn load_all(&self) -> Result<HashMap<String, String>>;

    /// Append a record to one of the event tables.
    fn append_event(&self, table: &str, record: &Value) -> Result<()>;
}

/// Filesystem-backed store: one JSON snapshot file per session in a
/// directory, and a SQLite database for the event log.
pub struct FsSnapshotStore {
    dir: PathBuf,
    conn: StdMutex<Connection>,
}

impl FsSnapshotStore {
    /// Open or create the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::Persistence(format!("failed to create {}: {}", dir.display(), e)))?;

        let conn = Connection::open(dir.join("events.db"))
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Self::initialize_schema(&conn)?;

        Ok(Self {
            dir,
            conn: StdMutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<()> {
        for table in EVENT_TABLES {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        recorded_at TEXT NOT NULL,
                        record TEXT NOT NULL
                    )",
                    table
                ),
                [],
            )
            .map_err(|e| Error::Persistence(e.to_string()))?;
        }
        Ok(())
    }

    fn snapshot_path(&self, session_id: &str) -> PathBuf {
        // session ids are caller-supplied; keep only filesystem-safe chars
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn save_session(&self, session_id: &str, blob: &str) -> Result<()> {
        let path = self.snapshot_path(session_id);
        let tmp = path.with_extension("json.tmp");

        std::fs::write(&tmp, blob)
            .map_err(|e| Error::Persistence(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| Error::Persistence(format!("rename {}: {}", path.display(), e)))?;
        Ok(())
    }

    fn load_all(&self) -> Result<HashMap<String, String>> {
        let mut snapshots = HashMap::new();

        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| Error::Persistence(format!("read {}: {}", self.dir.display(), e)))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(blob) => {
                    snapshots.insert(stem.to_string(), blob);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
            }
        }

        Ok(snapshots)
    }

    fn append_event(&self, table: &str, record: &Value) -> Result<()> {
        if !EVENT_TABLES.contains(&table) {
            return Err(Error::Persistence(format!("unknown event table: {}", table)));
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("failed to lock connection: {}", e)))?;
        conn.execute(
            &format!("INSERT INTO {} (recorded_at, record) VALUES (?1, ?2)", table),
            params![chrono::Utc::now().to_rfc3339(), record.to_string()],
        )
        .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: StdMutex<HashMap<String, String>>,
    events: StdMutex<Vec<(String, Value)>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events appended so far (table, record) — test inspection hook.
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save_session(&self, session_id: &str, blob: &str) -> Result<()> {
        self.snapshots
            .lock()
            .map_err(|e| Error::Internal(e.to_string()))?
            .insert(session_id.to_string(), blob.to_string());
        Ok(())
    }

    fn load_all(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .snapshots
            .lock()
            .map_err(|e| Error::Internal(e.to_string()))?
            .clone())
    }

    fn append_event(&self, table: &str, record: &Value) -> Result<()> {
        if !EVENT_TABLES.contains(&table) {
            return Err(Error::Persistence(format!("unknown event table: {}", table)));
        }
        self.events
            .lock()
            .map_err(|e| Error::Internal(e.to_string()))?
            .push((table.to_string(), record.clone()));
        Ok(())
    }
}

/// In-memory session registry with per-session locks and snapshot-on-write.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl SessionStore {
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            snapshots,
        }
    }

    /// Restore all persisted sessions into memory. Unparseable snapshots are
    /// skipped with a warning. Returns the number restored.
    pub async fn restore(&self) -> Result<usize> {
        let blobs = self.snapshots.load_all()?;
        let mut sessions = self.sessions.write().await;
        let mut restored = 0;

        for (id, blob) in blobs {
            match serde_json::from_str::<Session>(&blob) {
                Ok(session) => {
                    sessions.insert(session.session_id.clone(), Arc::new(Mutex::new(session)));
                    restored += 1;
                }
                Err(e) => warn!(session_id = %id, error = %e, "could not restore session"),
            }
        }

        debug!(restored, "restored sessions from snapshots");
        Ok(restored)
    }

    /// Register a new session, returning its handle.
    pub async fn insert(&self, session: Session) -> Arc<Mutex<Session>> {
        let id = session.session_id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    /// Look up a session handle by id.
    pub async fn handle(&self, session_id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// All known session ids.
    pub async fn session_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Write a snapshot of the session, retrying once on failure. The
    /// in-memory session stays authoritative either way.
    pub fn persist(&self, session: &Session) -> Result<()> {
        let blob = serde_json::to_string(session)?;
        match self.snapshots.save_session(&session.session_id, &blob) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(session_id = %session.session_id, error = %first, "snapshot write failed, retrying");
                self.snapshots.save_session(&session.session_id, &blob)
            }
        }
    }

    /// Append a record to an event log table. Log failures are reported but
    /// never block the interview.
    pub fn append_event(&self, table: &str, record: &Value) {
        if let Err(e) = self.snapshots.append_event(table, record) {
            warn!(table, error = %e, "event append failed");
        }
    }

    /// Drop sessions idle longer than `idle_timeout` after a final snapshot
    /// flush. Returns the pruned session ids.
    pub async fn prune_idle(&self, idle_timeout: Duration) -> Vec<String> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::hours(24));

        let handles: Vec<(String, Arc<Mutex<Session>>)> = {
            let sessions = self.sessions.read().await;
            sessions.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut pruned = Vec::new();
        for (id, handle) in handles {
            let session = handle.lock().await;
            if session.last_activity < cutoff {
                if let Err(e) = self.persist(&session) {
                    warn!(session_id = %id, error = %e, "final flush failed during pruning");
                }
                pruned.push(id);
            }
        }

        if !pruned.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &pruned {
                sessions.remove(id);
            }
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RoundKind;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = SessionStore::new(Arc::new(MemorySnapshotStore::new()));
        store
            .insert(Session::new("sess_1", RoundKind::Hr, None))
            .await;

        let handle = store.handle("sess_1").await.unwrap();
        assert_eq!(handle.lock().await.session_id, "sess_1");

        let missing = store.handle("sess_2").await;
        assert!(matches!(missing, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_through_store() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let store = SessionStore::new(snapshots.clone());

        let mut session = Session::new("sess_1", RoundKind::Technical, None);
        session.actual_question_number = 2;
        store.persist(&session).unwrap();
        store.insert(session.clone()).await;

        // a fresh store over the same snapshots restores the session
        let store2 = SessionStore::new(snapshots);
        assert_eq!(store2.restore().await.unwrap(), 1);
        let restored = store2.handle("sess_1").await.unwrap();
        assert_eq!(&*restored.lock().await, &session);
    }

    #[tokio::test]
    async fn test_fs_store_atomic_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let fs_store = FsSnapshotStore::open(dir.path()).unwrap();

        let session = Session::new("sess_fs", RoundKind::SystemDesign, None);
        let blob = serde_json::to_string(&session).unwrap();
        fs_store.save_session("sess_fs", &blob).unwrap();

        let loaded = fs_store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        let restored: Session = serde_json::from_str(&loaded["sess_fs"]).unwrap();
        assert_eq!(restored, session);

        // no temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_event_log_rejects_unknown_table() {
        let dir = tempfile::tempdir().unwrap();
        let fs_store = FsSnapshotStore::open(dir.path()).unwrap();

        let record = serde_json::json!({"answer": "hello"});
        fs_store.append_event("answers", &record).unwrap();
        assert!(fs_store.append_event("nope", &record).is_err());
    }

    #[tokio::test]
    async fn test_prune_idle_flushes_and_removes() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let store = SessionStore::new(snapshots.clone());

        let mut session = Session::new("sess_old", RoundKind::Hr, None);
        session.last_activity = chrono::Utc::now() - chrono::Duration::hours(48);
        store.insert(session).await;
        store
            .insert(Session::new("sess_fresh", RoundKind::Hr, None))
            .await;

        let pruned = store.prune_idle(Duration::from_secs(24 * 60 * 60)).await;
        assert_eq!(pruned, vec!["sess_old".to_string()]);
        assert!(store.handle("sess_old").await.is_err());
        assert!(store.handle("sess_fresh").await.is_ok());
        // final flush happened
        assert!(snapshots.load_all().unwrap().contains_key("sess_old"));
    }
}
