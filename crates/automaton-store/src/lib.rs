//! Automaton Store — single persistent store for the lifecycle core
//!
//! One SQLite database holds the KV rows, the lifecycle event log, the soul
//! history journal, the rejected-write journal, the phase locks, and the
//! narrative feed. The connection sits behind a mutex (single writer); all
//! multi-table state transitions go through [`LifecycleStore::with_tx`] so a
//! crash leaves either the pre-operation or post-operation state.
//!
//! Soul-file writers additionally serialize on an advisory lock keyed by the
//! file path, obtained from [`LifecycleStore::advisory_lock`].

pub mod schema;
pub mod tables;

pub use tables::{NarrativeEvent, SoulHistoryRow, SoulPhaseLockRow, SoulWriteAttempt};

use automaton_core::{Error, LifecycleEvent, LifecyclePhase, Result, SoulPhase};
use dashmap::DashMap;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct LifecycleStore {
    conn: Mutex<Connection>,
    file_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl LifecycleStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("open {}: {e}", path.display())))?;
        schema::init(&conn).map_err(|e| Error::persistence(format!("init schema: {e}")))?;
        info!("Opened lifecycle store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            file_locks: DashMap::new(),
        })
    }

    /// In-memory store for tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::persistence(format!("open in-memory: {e}")))?;
        schema::init(&conn).map_err(|e| Error::persistence(format!("init schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            file_locks: DashMap::new(),
        })
    }

    /// Run `f` against the live connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::persistence("store mutex poisoned"))?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Any error rolls the whole operation
    /// back; the commit itself is the only visibility point.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| Error::persistence("store mutex poisoned"))?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::persistence(format!("begin: {e}")))?;
        let out = f(&tx)?;
        tx.commit()
            .map_err(|e| Error::persistence(format!("commit: {e}")))?;
        Ok(out)
    }

    /// Advisory lock for a file path. Writers to the soul document hold
    /// this across (read, mutate, transaction, rename).
    pub fn advisory_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.file_locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ============================================================
    // kv
    // ============================================================

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| tables::kv_get(conn, key))
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| tables::kv_set(conn, key, value))
    }

    pub fn kv_get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv_get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn kv_set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.kv_set(key, &serde_json::to_string(value)?)
    }

    // ============================================================
    // logs
    // ============================================================

    pub fn append_event(
        &self,
        from_phase: Option<LifecyclePhase>,
        to_phase: LifecyclePhase,
        reason: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64> {
        self.with_conn(|conn| tables::append_event(conn, from_phase, to_phase, reason, metadata))
    }

    pub fn list_events(&self) -> Result<Vec<LifecycleEvent>> {
        self.with_conn(tables::list_events)
    }

    pub fn append_narrative(&self, kind: &str, detail: &serde_json::Value) -> Result<i64> {
        self.with_conn(|conn| tables::append_narrative(conn, kind, detail))
    }

    pub fn list_narrative(&self, limit: usize) -> Result<Vec<NarrativeEvent>> {
        self.with_conn(|conn| tables::list_narrative(conn, limit))
    }

    // ============================================================
    // soul tables
    // ============================================================

    pub fn latest_soul_version(&self) -> Result<Option<(i64, i64)>> {
        self.with_conn(tables::latest_soul_version)
    }

    pub fn list_soul_history(&self) -> Result<Vec<SoulHistoryRow>> {
        self.with_conn(tables::list_soul_history)
    }

    pub fn list_write_attempts(&self) -> Result<Vec<SoulWriteAttempt>> {
        self.with_conn(tables::list_write_attempts)
    }

    pub fn phase_lock(&self, phase: SoulPhase) -> Result<Option<SoulPhaseLockRow>> {
        self.with_conn(|conn| tables::phase_lock(conn, phase))
    }

    pub fn is_phase_locked(&self, phase: SoulPhase) -> Result<bool> {
        Ok(self.phase_lock(phase)?.is_some())
    }
}
