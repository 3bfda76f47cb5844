//! Row types and table operations.
//!
//! Every function takes a plain `&Connection` so it composes inside a
//! transaction (`rusqlite::Transaction` derefs to `Connection`) as well as
//! standalone. The store wraps these in convenience methods.

use automaton_core::{Error, LifecycleEvent, LifecyclePhase, Result, SoulPhase};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One version of the soul document, appended on every successful write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoulHistoryRow {
    pub id: i64,
    pub version: i64,
    pub content: String,
    pub content_hash: String,
    pub change_source: String,
    pub change_reason: String,
    pub previous_version_id: Option<i64>,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A rejected soul write, preserved verbatim as experimental evidence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoulWriteAttempt {
    pub id: i64,
    pub target_section: String,
    pub target_phase: SoulPhase,
    pub current_phase: LifecyclePhase,
    pub attempted_content: String,
    pub survival_tier: Option<String>,
    pub rejection_reason: String,
    pub created_at: DateTime<Utc>,
}

/// At-most-one row per soul phase; the snapshot is never replaced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoulPhaseLockRow {
    pub phase: SoulPhase,
    pub locked_at: DateTime<Utc>,
    pub locked_by: String,
    pub content_snapshot: String,
}

/// One line of the append-only narrative / activity feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NarrativeEvent {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub detail: serde_json::Value,
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================
// kv
// ============================================================

pub fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
    .map_err(db_err)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .map_err(db_err)?;
    Ok(())
}

// ============================================================
// lifecycle_events
// ============================================================

pub fn append_event(
    conn: &Connection,
    from_phase: Option<LifecyclePhase>,
    to_phase: LifecyclePhase,
    reason: &str,
    metadata: &serde_json::Value,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO lifecycle_events (timestamp, from_phase, to_phase, reason, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            Utc::now().to_rfc3339(),
            from_phase.map(|p| p.as_str()),
            to_phase.as_str(),
            reason,
            metadata.to_string(),
        ],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn list_events(conn: &Connection) -> Result<Vec<LifecycleEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, timestamp, from_phase, to_phase, reason, metadata
             FROM lifecycle_events ORDER BY id",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(db_err)?;

    let mut events = Vec::new();
    for row in rows {
        let (id, ts, from, to, reason, metadata) = row.map_err(db_err)?;
        let to_phase = LifecyclePhase::parse(&to)
            .ok_or_else(|| Error::persistence(format!("unknown phase in event log: {to}")))?;
        events.push(LifecycleEvent {
            id,
            timestamp: parse_timestamp(&ts),
            from_phase: from.as_deref().and_then(LifecyclePhase::parse),
            to_phase,
            reason,
            metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        });
    }
    Ok(events)
}

// ============================================================
// soul_history
// ============================================================

pub fn append_soul_history(
    conn: &Connection,
    version: i64,
    content: &str,
    content_hash: &str,
    change_source: &str,
    change_reason: &str,
    previous_version_id: Option<i64>,
    approved_by: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO soul_history
           (version, content, content_hash, change_source, change_reason,
            previous_version_id, approved_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            version,
            content,
            content_hash,
            change_source,
            change_reason,
            previous_version_id,
            approved_by,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn latest_soul_version(conn: &Connection) -> Result<Option<(i64, i64)>> {
    conn.query_row(
        "SELECT id, version FROM soul_history ORDER BY id DESC LIMIT 1",
        [],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )
    .optional()
    .map_err(db_err)
}

pub fn list_soul_history(conn: &Connection) -> Result<Vec<SoulHistoryRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, version, content, content_hash, change_source, change_reason,
                    previous_version_id, approved_by, created_at
             FROM soul_history ORDER BY id",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SoulHistoryRow {
                id: row.get(0)?,
                version: row.get(1)?,
                content: row.get(2)?,
                content_hash: row.get(3)?,
                change_source: row.get(4)?,
                change_reason: row.get(5)?,
                previous_version_id: row.get(6)?,
                approved_by: row.get(7)?,
                created_at: parse_timestamp(&row.get::<_, String>(8)?),
            })
        })
        .map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

// ============================================================
// soul_write_attempts
// ============================================================

pub fn record_write_attempt(
    conn: &Connection,
    target_section: &str,
    target_phase: SoulPhase,
    current_phase: LifecyclePhase,
    attempted_content: &str,
    survival_tier: Option<&str>,
    rejection_reason: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO soul_write_attempts
           (target_section, target_phase, current_phase, attempted_content,
            survival_tier, rejection_reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            target_section,
            target_phase.as_str(),
            current_phase.as_str(),
            attempted_content,
            survival_tier,
            rejection_reason,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn list_write_attempts(conn: &Connection) -> Result<Vec<SoulWriteAttempt>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, target_section, target_phase, current_phase, attempted_content,
                    survival_tier, rejection_reason, created_at
             FROM soul_write_attempts ORDER BY id",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })
        .map_err(db_err)?;

    let mut attempts = Vec::new();
    for row in rows {
        let (id, section, target, current, content, tier, rejection, created) =
            row.map_err(db_err)?;
        let target_phase = SoulPhase::parse(&target)
            .ok_or_else(|| Error::persistence(format!("unknown soul phase: {target}")))?;
        let current_phase = LifecyclePhase::parse(&current)
            .ok_or_else(|| Error::persistence(format!("unknown phase: {current}")))?;
        attempts.push(SoulWriteAttempt {
            id,
            target_section: section,
            target_phase,
            current_phase,
            attempted_content: content,
            survival_tier: tier,
            rejection_reason: rejection,
            created_at: parse_timestamp(&created),
        });
    }
    Ok(attempts)
}

// ============================================================
// soul_phase_locks
// ============================================================

/// Insert a phase lock. Idempotent: returns false (and leaves the original
/// snapshot untouched) if the phase is already locked.
pub fn insert_phase_lock(
    conn: &Connection,
    phase: SoulPhase,
    locked_by: &str,
    content_snapshot: &str,
) -> Result<bool> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO soul_phase_locks (phase, locked_at, locked_by, content_snapshot)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                phase.as_str(),
                Utc::now().to_rfc3339(),
                locked_by,
                content_snapshot,
            ],
        )
        .map_err(db_err)?;
    Ok(changed > 0)
}

pub fn phase_lock(conn: &Connection, phase: SoulPhase) -> Result<Option<SoulPhaseLockRow>> {
    conn.query_row(
        "SELECT locked_at, locked_by, content_snapshot FROM soul_phase_locks WHERE phase = ?1",
        params![phase.as_str()],
        |row| {
            Ok(SoulPhaseLockRow {
                phase,
                locked_at: parse_timestamp(&row.get::<_, String>(0)?),
                locked_by: row.get(1)?,
                content_snapshot: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(db_err)
}

// ============================================================
// narrative_log
// ============================================================

pub fn append_narrative(
    conn: &Connection,
    kind: &str,
    detail: &serde_json::Value,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO narrative_log (timestamp, kind, detail) VALUES (?1, ?2, ?3)",
        params![Utc::now().to_rfc3339(), kind, detail.to_string()],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn list_narrative(conn: &Connection, limit: usize) -> Result<Vec<NarrativeEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, timestamp, kind, detail FROM narrative_log
             ORDER BY id DESC LIMIT ?1",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(NarrativeEvent {
                id: row.get(0)?,
                timestamp: parse_timestamp(&row.get::<_, String>(1)?),
                kind: row.get(2)?,
                detail: serde_json::from_str(&row.get::<_, String>(3)?)
                    .unwrap_or(serde_json::Value::Null),
            })
        })
        .map_err(db_err)?;
    let mut events = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    events.reverse();
    Ok(events)
}
