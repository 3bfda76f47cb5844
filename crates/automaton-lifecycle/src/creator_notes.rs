//! Creator notes — the one-way channel from creator to agent.
//!
//! Notes are markdown bullets in `CREATOR-NOTES.md`. A KV cursor tracks
//! how many have been surfaced; the context builder shows the top three
//! unread. The daily sync only ensures the file exists — fetching new
//! notes is the registry collaborator's job — and every caller tolerates
//! its failure.

use automaton_core::Result;
use automaton_store::LifecycleStore;
use std::path::Path;
use tracing::debug;

pub const KV_NOTES_READ: &str = "creator_notes.read_index";
pub const SURFACE_LIMIT: usize = 3;

/// Best-effort daily sync. Failure is logged by the caller and ignored.
pub fn sync(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, "# Creator Notes\n")?;
        debug!("Created empty creator notes at {}", path.display());
    }
    Ok(())
}

fn all_notes(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty())
        .collect()
}

/// Top unread notes, oldest first.
pub fn unread(path: &Path, store: &LifecycleStore) -> Result<Vec<String>> {
    let read_index: usize = store
        .kv_get(KV_NOTES_READ)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    Ok(all_notes(path)
        .into_iter()
        .skip(read_index)
        .take(SURFACE_LIMIT)
        .collect())
}

/// Advance the cursor past `count` surfaced notes.
pub fn mark_read(store: &LifecycleStore, count: usize) -> Result<()> {
    let read_index: usize = store
        .kv_get(KV_NOTES_READ)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    store.kv_set(KV_NOTES_READ, &(read_index + count).to_string())
}
