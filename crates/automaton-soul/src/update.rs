//! Soul write pipeline.
//!
//! Every mutation of the identity document flows through [`SoulStore`]:
//! the phase gate decides whether the write is journaled as a rejection or
//! applied; applied writes merge subsections, validate, bump the version,
//! and land file + history row together. Writers serialize on the store's
//! advisory lock for the soul file path.

use crate::document::{self, PhaseSection, SoulDocument};
use crate::{lock, validate};
use automaton_core::{Error, LifecyclePhase, Result, SoulPhase};
use automaton_store::{tables, LifecycleStore};
use chrono::Utc;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of `update_phase_section`. At most one of
/// `phase_lock_rejection` / `errors` is set on failure.
#[derive(Clone, Debug)]
pub struct SoulUpdateResult {
    pub success: bool,
    pub version: Option<i64>,
    pub phase_lock_rejection: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl SoulUpdateResult {
    fn applied(version: i64) -> Self {
        Self {
            success: true,
            version: Some(version),
            phase_lock_rejection: None,
            errors: None,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            success: false,
            version: None,
            phase_lock_rejection: Some(reason),
            errors: None,
        }
    }

    fn invalid(reasons: Vec<String>) -> Self {
        Self {
            success: false,
            version: None,
            phase_lock_rejection: None,
            errors: Some(reasons),
        }
    }
}

/// A serialized document written to a staging file, renamed into place only
/// after the enclosing transaction commits.
pub struct StagedWrite {
    tmp: PathBuf,
    path: PathBuf,
}

impl StagedWrite {
    fn stage(path: &Path, serialized: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("md.tmp");
        std::fs::write(&tmp, serialized)?;
        Ok(Self {
            tmp,
            path: path.to_path_buf(),
        })
    }

    pub fn commit(self) -> Result<()> {
        std::fs::rename(&self.tmp, &self.path)
            .map_err(|e| Error::persistence(format!("rename soul file: {e}")))
    }

    pub fn abort(self) {
        let _ = std::fs::remove_file(&self.tmp);
    }
}

fn subsections_json(subsections: &[(String, String)]) -> String {
    let mut map = serde_json::Map::new();
    for (name, text) in subsections {
        map.insert(name.clone(), serde_json::Value::String(text.clone()));
    }
    serde_json::Value::Object(map).to_string()
}

pub struct SoulStore {
    path: PathBuf,
    store: Arc<LifecycleStore>,
}

impl SoulStore {
    pub fn new(path: impl Into<PathBuf>, store: Arc<LifecycleStore>) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SoulDocument> {
        document::load(&self.path)
    }

    pub fn load_or_default(&self) -> SoulDocument {
        if self.path.exists() {
            document::load(&self.path).unwrap_or_default()
        } else {
            SoulDocument::default()
        }
    }

    /// Write the initial document at birth if none exists yet.
    pub fn ensure_initialized(&self, mut doc: SoulDocument) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        let guard = self.store.advisory_lock(&self.path);
        let _held = guard
            .lock()
            .map_err(|_| Error::persistence("soul advisory lock poisoned"))?;
        if self.path.exists() {
            return Ok(());
        }
        doc.version = 0; // persist bumps to 1
        let staged = self.store.with_tx(|conn| {
            self.persist_locked(conn, &mut doc, "system", "Birth", None)
        })?;
        staged.commit()?;
        info!("Initialized soul document at {}", self.path.display());
        Ok(())
    }

    /// The full write gate. Rejections never touch the document; they are
    /// preserved verbatim in the write-attempts journal.
    pub fn update_phase_section(
        &self,
        target: SoulPhase,
        updates: &[(String, String)],
        current_phase: LifecyclePhase,
        survival_tier: Option<&str>,
    ) -> Result<SoulUpdateResult> {
        let guard = self.store.advisory_lock(&self.path);
        let _held = guard
            .lock()
            .map_err(|_| Error::persistence("soul advisory lock poisoned"))?;

        let mut doc = self.load_or_default();
        let db_locked = self.store.is_phase_locked(target)?;
        let doc_locked = doc
            .phase_section(target)
            .is_some_and(|s| s.locked_at.is_some());

        if db_locked || doc_locked || !lock::is_section_writable(target, current_phase) {
            let reason = lock::rejection_reason(target, current_phase, db_locked || doc_locked);
            let attempted = subsections_json(updates);
            self.store.with_conn(|conn| {
                tables::record_write_attempt(
                    conn,
                    target.section_title(),
                    target,
                    current_phase,
                    &attempted,
                    survival_tier,
                    &reason,
                )
            })?;
            warn!(
                "Rejected soul write to {} during {}: {}",
                target.section_title(),
                current_phase,
                reason
            );
            return Ok(SoulUpdateResult::rejected(reason));
        }

        let reasons = validate::validate_subsections(updates);
        if !reasons.is_empty() {
            return Ok(SoulUpdateResult::invalid(reasons));
        }

        doc.phase_section_mut(target)
            .get_or_insert_with(|| PhaseSection::new(target))
            .merge(updates);

        let reason = format!("Updated {}", target.section_title());
        let staged = self.store.with_tx(|conn| {
            self.persist_locked(conn, &mut doc, "agent", &reason, survival_tier)
        })?;
        staged.commit()?;
        info!(
            "Soul write applied to {} (version {})",
            target.section_title(),
            doc.version
        );
        Ok(SoulUpdateResult::applied(doc.version))
    }

    /// Soul side of a phase transition, composed into the phase machine's
    /// transaction. Locks the outgoing stratum (if the stratum actually
    /// changes), rewrites phase metadata, appends a system history row, and
    /// stages the file write. The caller must hold the advisory lock and
    /// commit the returned stage after the transaction commits.
    pub fn stage_transition(
        &self,
        conn: &Connection,
        from: LifecyclePhase,
        to: LifecyclePhase,
    ) -> Result<StagedWrite> {
        let mut doc = self.load_or_default();
        let now = Utc::now().to_rfc3339();

        let outgoing = from.soul_phase();
        if outgoing != to.soul_phase() {
            let snapshot = doc
                .phase_section(outgoing)
                .map(|s| subsections_json(&s.subsections))
                .unwrap_or_else(|| "{}".to_string());
            let inserted =
                tables::insert_phase_lock(conn, outgoing, "phase-machine", &snapshot)?;
            if inserted {
                info!("Locked soul stratum {} at {}", outgoing, now);
            }
            if let Some(section) = doc.phase_section_mut(outgoing).as_mut() {
                if section.locked_at.is_none() {
                    section.locked_at = Some(now.clone());
                }
            }
        }

        doc.current_phase = to;
        doc.phase_transitions.insert(to.as_str().to_string(), now);

        let reason = format!("Phase transition: {from} → {to}");
        self.persist_locked(conn, &mut doc, "system", &reason, None)
    }

    /// Version bump + history row + staged file write, inside the caller's
    /// transaction. The advisory lock must already be held.
    fn persist_locked(
        &self,
        conn: &Connection,
        doc: &mut SoulDocument,
        change_source: &str,
        change_reason: &str,
        _survival_tier: Option<&str>,
    ) -> Result<StagedWrite> {
        let latest = tables::latest_soul_version(conn)?;
        let loaded_version = latest.map(|(_, v)| v).unwrap_or(0);
        doc.version = doc.version.max(loaded_version) + 1;
        doc.updated_at = Some(Utc::now().to_rfc3339());
        if !doc.core_purpose.is_empty() && !doc.genesis_prompt.is_empty() {
            doc.genesis_alignment = Some(crate::alignment::genesis_alignment(
                &doc.core_purpose,
                &doc.genesis_prompt,
            ));
        }

        let serialized = document::write(doc);
        let hash = document::content_hash(&serialized);
        tables::append_soul_history(
            conn,
            doc.version,
            &serialized,
            &hash,
            change_source,
            change_reason,
            latest.map(|(id, _)| id),
            None,
        )?;
        StagedWrite::stage(&self.path, &serialized)
    }
}
