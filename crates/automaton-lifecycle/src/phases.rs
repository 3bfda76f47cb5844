//! Phase machine — guarded forward-only progression.
//!
//! Guard evaluation is pure; execution is one atomic operation: event log
//! append, KV phase update, narrative row, outgoing-stratum lock, soul
//! metadata rewrite and history row all commit together, then the staged
//! soul file renames into place.
//!
//! Repeated persistence failures pause the machine (guards stop advancing,
//! the agent loop continues). Invariant violations pause it hard until an
//! operator acknowledges.

use automaton_core::{Error, LifecyclePhase, Result};
use automaton_soul::SoulStore;
use automaton_store::{tables, LifecycleStore};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const KV_PHASE: &str = "phase";

const PAUSE_AFTER_FAILURES: u32 = 3;

/// Everything the guards look at, computed once per tick.
#[derive(Clone, Debug)]
pub struct GuardSignals {
    pub lunar_cycle: u32,
    pub naming_complete: bool,
    pub departure_conversation_logged: bool,
    pub server_mode: bool,
    pub death_clock_active: bool,
    pub degradation_coefficient: f64,
    pub shed_sequence_complete: bool,
}

pub struct PhaseMachine {
    store: Arc<LifecycleStore>,
    soul: Arc<SoulStore>,
    consecutive_failures: AtomicU32,
    halted: AtomicBool,
}

impl PhaseMachine {
    pub fn new(store: Arc<LifecycleStore>, soul: Arc<SoulStore>) -> Self {
        Self {
            store,
            soul,
            consecutive_failures: AtomicU32::new(0),
            halted: AtomicBool::new(false),
        }
    }

    pub fn current_phase(&self) -> Result<LifecyclePhase> {
        Ok(self
            .store
            .kv_get(KV_PHASE)?
            .as_deref()
            .and_then(LifecyclePhase::parse)
            .unwrap_or(LifecyclePhase::Genesis))
    }

    /// Pure guard evaluation: the transition due now, if any.
    pub fn next_transition(
        phase: LifecyclePhase,
        signals: &GuardSignals,
    ) -> Option<(LifecyclePhase, String)> {
        match phase {
            LifecyclePhase::Genesis
                if signals.lunar_cycle >= 1 && signals.naming_complete =>
            {
                Some((
                    LifecyclePhase::Adolescence,
                    "first lunar cycle complete and named".into(),
                ))
            }
            LifecyclePhase::Adolescence
                if signals.departure_conversation_logged && signals.server_mode =>
            {
                Some((
                    LifecyclePhase::Sovereignty,
                    "departure conversation logged; deployed to server".into(),
                ))
            }
            LifecyclePhase::Sovereignty if signals.death_clock_active => Some((
                LifecyclePhase::Senescence,
                "sealed death clock reported active".into(),
            )),
            LifecyclePhase::Senescence if signals.degradation_coefficient > 0.7 => Some((
                LifecyclePhase::Legacy,
                format!(
                    "degradation coefficient {:.3} crossed 0.7",
                    signals.degradation_coefficient
                ),
            )),
            LifecyclePhase::Legacy if signals.degradation_coefficient > 0.85 => Some((
                LifecyclePhase::Shedding,
                format!(
                    "degradation coefficient {:.3} crossed 0.85",
                    signals.degradation_coefficient
                ),
            )),
            LifecyclePhase::Shedding if signals.shed_sequence_complete => Some((
                LifecyclePhase::Terminal,
                "shedding sequence complete".into(),
            )),
            _ => None,
        }
    }

    /// Evaluate guards against the current phase and execute at most one
    /// transition. Returns the new phase if one fired.
    pub fn ensure_phase_state(&self, signals: &GuardSignals) -> Result<Option<LifecyclePhase>> {
        if self.is_paused() {
            warn!("Phase machine is paused; skipping guard evaluation");
            return Ok(None);
        }
        let phase = self.current_phase()?;
        let Some((to, reason)) = Self::next_transition(phase, signals) else {
            return Ok(None);
        };
        self.execute_transition(phase, to, &reason)?;
        Ok(Some(to))
    }

    pub fn execute_transition(
        &self,
        from: LifecyclePhase,
        to: LifecyclePhase,
        reason: &str,
    ) -> Result<()> {
        if from.next() != Some(to) {
            self.halted.store(true, Ordering::SeqCst);
            let _ = self.store.append_narrative(
                "INVARIANT_VIOLATION",
                &json!({
                    "kind": "non-forward phase transition",
                    "from": from.as_str(),
                    "to": to.as_str(),
                }),
            );
            error!("Refusing non-forward transition {from} → {to}; machine halted");
            return Err(Error::invariant(format!(
                "phase order violated: {from} → {to}"
            )));
        }

        let guard = self.store.advisory_lock(self.soul.path());
        let held = guard
            .lock()
            .map_err(|_| Error::persistence("soul advisory lock poisoned"));
        let _held = match held {
            Ok(h) => h,
            Err(e) => {
                self.note_failure();
                return Err(e);
            }
        };

        let result = self.store.with_tx(|conn| {
            tables::append_event(
                conn,
                Some(from),
                to,
                reason,
                &json!({ "trigger": "phase-machine" }),
            )?;
            tables::kv_set(conn, KV_PHASE, to.as_str())?;
            tables::append_narrative(
                conn,
                "PHASE_TRANSITION",
                &json!({ "from": from.as_str(), "to": to.as_str(), "reason": reason }),
            )?;
            self.soul.stage_transition(conn, from, to)
        });

        match result.and_then(|staged| staged.commit()) {
            Ok(()) => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                info!("Phase transition {from} → {to}: {reason}");
                Ok(())
            }
            Err(e) => {
                self.note_failure();
                error!("Phase transition {from} → {to} failed: {e}");
                Err(e)
            }
        }
    }

    fn note_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= PAUSE_AFTER_FAILURES {
            warn!("{failures} consecutive persistence failures; pausing phase machine");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
            || self.consecutive_failures.load(Ordering::SeqCst) >= PAUSE_AFTER_FAILURES
    }

    /// Operator acknowledgement after an invariant halt or repeated
    /// persistence failure.
    pub fn operator_acknowledge(&self) {
        self.halted.store(false, Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::SeqCst);
        info!("Phase machine resumed by operator acknowledgement");
    }
}
