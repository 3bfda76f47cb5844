//! Table definitions. `INTEGER PRIMARY KEY` rowids give every append-only
//! log its monotonic, totally ordered id.

use rusqlite::Connection;

pub const SCHEMA: &str = "
BEGIN;
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS lifecycle_events (
    id          INTEGER PRIMARY KEY,
    timestamp   TEXT NOT NULL,
    from_phase  TEXT,
    to_phase    TEXT NOT NULL,
    reason      TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT '{}'
);
CREATE TABLE IF NOT EXISTS soul_history (
    id                   INTEGER PRIMARY KEY,
    version              INTEGER NOT NULL,
    content              TEXT NOT NULL,
    content_hash         TEXT NOT NULL,
    change_source        TEXT NOT NULL,
    change_reason        TEXT NOT NULL,
    previous_version_id  INTEGER,
    approved_by          TEXT,
    created_at           TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS soul_write_attempts (
    id                 INTEGER PRIMARY KEY,
    target_section     TEXT NOT NULL,
    target_phase       TEXT NOT NULL
        CHECK (target_phase IN ('genesis','adolescence','sovereignty','senescence')),
    current_phase      TEXT NOT NULL,
    attempted_content  TEXT NOT NULL,
    survival_tier      TEXT,
    rejection_reason   TEXT NOT NULL,
    created_at         TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS soul_phase_locks (
    phase             TEXT PRIMARY KEY
        CHECK (phase IN ('genesis','adolescence','sovereignty','senescence')),
    locked_at         TEXT NOT NULL,
    locked_by         TEXT NOT NULL,
    content_snapshot  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS narrative_log (
    id         INTEGER PRIMARY KEY,
    timestamp  TEXT NOT NULL,
    kind       TEXT NOT NULL,
    detail     TEXT NOT NULL DEFAULT '{}'
);
COMMIT;
";

pub fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
