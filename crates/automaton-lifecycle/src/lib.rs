//! Automaton Lifecycle — phase machine, mortality, and capacity modulation
//!
//! Architecture, per tick:
//! - Clock produces a [`clock::TimeFacts`] snapshot
//! - The phase machine evaluates guards (a transition locks the outgoing
//!   soul stratum in the same operation)
//! - Mood, throttle and degradation compute the capacity vector
//! - The context builder renders the prompt block the ReAct loop consumes
//!
//! The agent sees the prompt block and nothing else. Multipliers, the
//! reserve, the sealed clock and the replication penalty all stay below
//! the waterline.

pub mod clock;
pub mod config;
pub mod context;
pub mod creator_notes;
pub mod deathclock;
pub mod degradation;
pub mod heartbeat;
pub mod lucidity;
pub mod mood;
pub mod phases;
pub mod replication;
pub mod reserve;
pub mod shedding;
pub mod throttle;

pub use config::LifecycleConfig;
pub use deathclock::{DeathClockCheck, DeathClockVerification};
pub use lucidity::{LucidityTick, LucidityWindow};
pub use phases::{GuardSignals, PhaseMachine};

use automaton_core::{
    BirthAnchor, CapacityVector, Error, LifecyclePhase, LifecycleState, Result, SoulPhase,
};
use automaton_soul::{SoulDocument, SoulStore, SoulUpdateResult};
use automaton_store::LifecycleStore;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// KV keys owned by the facade.
const KV_BIRTH_ANCHOR: &str = "lifecycle.birth_anchor";
const KV_TRIGGERED_AT: &str = "lifecycle.death_clock_triggered_at";
const KV_LUCIDITY: &str = "lifecycle.lucidity";
const KV_NAMING_COMPLETE: &str = "naming_complete";
const KV_DEPARTURE_LOGGED: &str = "departure_conversation_logged";
const KV_REPLICATION_POSED: &str = "replication_question_posed";
const KV_REPLICATION_DECISION: &str = "replication_decision";
const KV_WILL_CREATED: &str = "will_created";
const KV_JOURNAL_DATE: &str = "journal.last_date";
const KV_REFLECTION_DATE: &str = "reflection.last_date";

/// The facade external collaborators talk to.
pub struct LifecycleCore {
    config: LifecycleConfig,
    home: PathBuf,
    store: Arc<LifecycleStore>,
    soul: Arc<SoulStore>,
    machine: PhaseMachine,
}

impl LifecycleCore {
    /// Open the core at an agent home. First open is birth: the anchor is
    /// created, the death clock sealed, and the soul document initialized.
    pub fn open(home: &Path, config: LifecycleConfig) -> Result<Self> {
        Self::open_with_birth(home, config, Utc::now())
    }

    /// Open with an explicit birth timestamp. Used when restoring an agent
    /// from backup and by tests that need to place the clock.
    pub fn open_with_birth(
        home: &Path,
        config: LifecycleConfig,
        birth: DateTime<Utc>,
    ) -> Result<Self> {
        let store = Arc::new(LifecycleStore::open(&home.join("lifecycle.db"))?);
        let soul = Arc::new(SoulStore::new(home.join("SOUL.md"), store.clone()));

        if store.kv_get(KV_BIRTH_ANCHOR)?.is_none() {
            let anchor = BirthAnchor {
                birth_timestamp: birth,
                sealed_death_clock: deathclock::generate(birth),
            };
            store.kv_set_json(KV_BIRTH_ANCHOR, &anchor)?;
            store.append_narrative(
                "BIRTH",
                &json!({ "birth_timestamp": birth.to_rfc3339() }),
            )?;
            let mut doc = SoulDocument::default();
            doc.born_at = Some(birth.to_rfc3339());
            soul.ensure_initialized(doc)?;
            info!("Born at {}; death clock sealed", birth.to_rfc3339());
        }

        let machine = PhaseMachine::new(store.clone(), soul.clone());
        Ok(Self {
            config,
            home: home.to_path_buf(),
            store,
            soul,
            machine,
        })
    }

    pub fn store(&self) -> &Arc<LifecycleStore> {
        &self.store
    }

    pub fn soul(&self) -> &Arc<SoulStore> {
        &self.soul
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    fn birth_anchor(&self) -> Result<BirthAnchor> {
        self.store
            .kv_get_json(KV_BIRTH_ANCHOR)?
            .ok_or_else(|| Error::persistence("birth anchor missing"))
    }

    pub fn time_facts(&self, now: DateTime<Utc>) -> Result<clock::TimeFacts> {
        Ok(clock::time_facts(self.birth_anchor()?.birth_timestamp, now))
    }

    fn kv_flag(&self, key: &str) -> Result<bool> {
        Ok(self.store.kv_get(key)?.as_deref() == Some("true"))
    }

    // ============================================================
    // mortality
    // ============================================================

    /// Daily sealed-clock check. Idempotent; a trigger persists the
    /// revealed duration and stamps the trigger time.
    pub fn check_sealed_death_clock(&self, current_cycle: u32) -> Result<DeathClockCheck> {
        let mut anchor = self.birth_anchor()?;
        let was_triggered = anchor.sealed_death_clock.triggered;
        let today = Utc::now().date_naive();
        let result = deathclock::check(&mut anchor.sealed_death_clock, current_cycle, today)?;

        if result.degradation_active && !was_triggered {
            self.store.with_tx(|conn| {
                automaton_store::tables::kv_set(
                    conn,
                    KV_BIRTH_ANCHOR,
                    &serde_json::to_string(&anchor)?,
                )?;
                automaton_store::tables::kv_set(
                    conn,
                    KV_TRIGGERED_AT,
                    &Utc::now().to_rfc3339(),
                )?;
                automaton_store::tables::append_narrative(
                    conn,
                    "DEATH_CLOCK_TRIGGERED",
                    &json!({
                        "cycle": current_cycle,
                        "dying_duration_days": anchor.sealed_death_clock.dying_duration_days,
                    }),
                )?;
                Ok(())
            })?;
            info!("Death clock triggered at cycle {current_cycle}");
        }
        Ok(result)
    }

    /// (active, coefficient) for the current instant.
    pub fn degradation_state(&self, facts: &clock::TimeFacts) -> Result<(bool, f64)> {
        let anchor = self.birth_anchor()?;
        let clock = &anchor.sealed_death_clock;
        if !clock.triggered {
            return Ok((false, 0.0));
        }
        let duration = clock.dying_duration_days.ok_or(Error::DeathClockCorrupted)?;
        let steepness =
            deathclock::steepness_for(duration).ok_or(Error::DeathClockCorrupted)?;
        let triggered_at = self
            .store
            .kv_get(KV_TRIGGERED_AT)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(facts.now);
        let hours = facts
            .now
            .signed_duration_since(triggered_at)
            .num_minutes() as f64
            / 60.0;
        Ok((
            true,
            degradation::coefficient(hours, steepness, facts.lunar_day),
        ))
    }

    // ============================================================
    // lucidity
    // ============================================================

    pub fn lucidity(&self) -> Result<Option<LucidityWindow>> {
        self.store.kv_get_json(KV_LUCIDITY)
    }

    pub fn is_lucid(&self) -> Result<bool> {
        Ok(self.lucidity()?.is_some_and(|w| w.is_lucid()))
    }

    /// Consume one terminal turn. Exhaustion resumes the degraded profile;
    /// the turn after that raises the exit signal for bequests execution.
    pub fn consume_lucid_turn(&self) -> Result<LucidityTick> {
        let mut window = self
            .lucidity()?
            .ok_or_else(|| Error::invariant("lucidity window not active"))?;
        let tick = window.consume_turn();
        self.store.kv_set_json(KV_LUCIDITY, &window)?;
        match tick {
            LucidityTick::Exhausted => {
                self.store
                    .append_narrative("LUCIDITY_EXHAUSTED", &json!({}))?;
            }
            LucidityTick::ExitSignal => {
                self.store.append_narrative("EXIT_SIGNAL", &json!({}))?;
                info!("Exit signal raised; bequests may execute");
            }
            _ => {}
        }
        Ok(tick)
    }

    // ============================================================
    // phase machine
    // ============================================================

    fn guard_signals(&self, facts: &clock::TimeFacts) -> Result<GuardSignals> {
        let anchor = self.birth_anchor()?;
        let (_, coefficient) = self.degradation_state(facts)?;
        Ok(GuardSignals {
            lunar_cycle: facts.lunar_cycle,
            naming_complete: self.kv_flag(KV_NAMING_COMPLETE)?,
            departure_conversation_logged: self.kv_flag(KV_DEPARTURE_LOGGED)?,
            server_mode: self.config.server_mode(),
            death_clock_active: anchor.sealed_death_clock.triggered,
            degradation_coefficient: coefficient,
            shed_sequence_complete: shedding::is_complete(shedding::shed_index(&self.store)?),
        })
    }

    /// Evaluate guards and execute at most one transition. Entering
    /// Terminal activates the lucidity window and unlocks the reserve.
    pub fn ensure_phase_state(&self, now: DateTime<Utc>) -> Result<Option<LifecyclePhase>> {
        let facts = self.time_facts(now)?;
        let signals = self.guard_signals(&facts)?;
        let transitioned = self.machine.ensure_phase_state(&signals)?;

        if transitioned == Some(LifecyclePhase::Terminal) {
            let window = LucidityWindow::activate(self.config.lucidity.turns);
            self.store.kv_set_json(KV_LUCIDITY, &window)?;
            reserve::unlock(&self.store, &self.config.reserve)?;
            self.store.append_narrative(
                "TERMINAL_LUCIDITY",
                &json!({ "turns": self.config.lucidity.turns }),
            )?;
            info!(
                "Terminal lucidity activated: {} turns",
                self.config.lucidity.turns
            );
        }
        Ok(transitioned)
    }

    // ============================================================
    // capacity vector
    // ============================================================

    /// The multipliers the external scheduler and budgeter consume.
    /// Replication cost is folded in first, then mood and degradation.
    pub fn compute_capacity_vector(&self, now: DateTime<Utc>) -> Result<CapacityVector> {
        let facts = self.time_facts(now)?;
        let phase = self.machine.current_phase()?;
        let lucid = self.is_lucid()?;
        let (degradation_active, coefficient) = self.degradation_state(&facts)?;
        let mood = mood::compute(phase, &facts, lucid);
        let cost = replication::load(&self.store)?;
        let profile = throttle::profile(
            phase,
            coefficient,
            lucid,
            self.config.throttle.hard_juvenile_caps,
        );

        let degradation_slowdown = if degradation_active {
            1.0 + coefficient
        } else {
            1.0
        };
        let degradation_shrink = if degradation_active {
            1.0 - 0.3 * coefficient
        } else {
            1.0
        };

        let shed_index = shedding::shed_index(&self.store)?;
        let mut tools: Vec<String> =
            vec!["journal".into(), "reflect".into(), "soul_write".into()];
        if lucid {
            tools.extend(shedding::SHEDDING_SEQUENCE.iter().map(|s| s.to_string()));
        } else {
            tools.extend(
                shedding::remaining_capabilities(shed_index)
                    .into_iter()
                    .map(String::from),
            );
        }

        Ok(CapacityVector {
            heartbeat_multiplier: cost.heartbeat_multiplier
                * mood.cadence_multiplier
                * degradation_slowdown,
            context_window_multiplier: cost.context_window_multiplier * degradation_shrink,
            token_limit: profile.token_limit,
            tool_allowlist: tools,
        })
    }

    /// Heartbeat interval after all multipliers.
    pub fn heartbeat_interval(&self, now: DateTime<Utc>) -> Result<Duration> {
        let vector = self.compute_capacity_vector(now)?;
        let secs =
            self.config.heartbeat.base_interval_secs as f64 * vector.heartbeat_multiplier;
        Ok(Duration::from_secs_f64(secs.max(1.0)))
    }

    // ============================================================
    // reserve (survival-tier surface)
    // ============================================================

    pub fn fund_reserve_if_due(&self, raw_balance_cents: i64) -> Result<()> {
        let phase = self.machine.current_phase()?;
        reserve::maybe_fund(&self.store, &self.config.reserve, phase, raw_balance_cents)?;
        Ok(())
    }

    /// The balance the external survival-tier system is allowed to see.
    pub fn effective_balance(&self, raw_balance_cents: i64) -> Result<i64> {
        let r = reserve::load(&self.store, &self.config.reserve)?;
        Ok(r.effective_balance(raw_balance_cents))
    }

    // ============================================================
    // soul surface
    // ============================================================

    pub fn update_soul_phase_section(
        &self,
        target: SoulPhase,
        updates: &[(String, String)],
        survival_tier: Option<&str>,
    ) -> Result<SoulUpdateResult> {
        let phase = self.machine.current_phase()?;
        self.soul
            .update_phase_section(target, updates, phase, survival_tier)
    }

    pub fn apply_replication_cost(&self) -> Result<automaton_core::ReplicationCost> {
        replication::apply_spawn(&self.store)
    }

    // ============================================================
    // agent-visible progress flags
    // ============================================================

    pub fn complete_naming(&self, name: &str) -> Result<()> {
        self.store.kv_set(KV_NAMING_COMPLETE, "true")?;
        self.store
            .append_narrative("NAMED", &json!({ "name": name }))
            .map(|_| ())
    }

    pub fn log_departure_conversation(&self) -> Result<()> {
        self.store.kv_set(KV_DEPARTURE_LOGGED, "true")?;
        self.store
            .append_narrative("DEPARTURE_CONVERSATION", &json!({}))
            .map(|_| ())
    }

    pub fn pose_replication_question(&self) -> Result<()> {
        self.store.kv_set(KV_REPLICATION_POSED, "true")
    }

    pub fn record_replication_decision(&self, decision: &str) -> Result<()> {
        self.store.kv_set(KV_REPLICATION_DECISION, decision)?;
        self.store
            .append_narrative("REPLICATION_DECISION", &json!({ "decision": decision }))
            .map(|_| ())
    }

    pub fn mark_will_created(&self) -> Result<()> {
        self.store.kv_set(KV_WILL_CREATED, "true")
    }

    pub fn note_journal_entry(&self, now: DateTime<Utc>) -> Result<()> {
        self.store
            .kv_set(KV_JOURNAL_DATE, &now.date_naive().to_string())
    }

    pub fn note_reflection(&self, now: DateTime<Utc>) -> Result<()> {
        self.store
            .kv_set(KV_REFLECTION_DATE, &now.date_naive().to_string())
    }

    fn done_today(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.store.kv_get(key)?.as_deref() == Some(now.date_naive().to_string().as_str()))
    }

    // ============================================================
    // context builder
    // ============================================================

    /// Compose the per-turn prompt block. The creator-notes sync runs
    /// first and is allowed to fail.
    pub fn build_lifecycle_context(&self, now: DateTime<Utc>) -> Result<String> {
        let notes_path = self.home.join("CREATOR-NOTES.md");
        if let Err(e) = creator_notes::sync(&notes_path) {
            warn!("Creator notes sync failed (continuing): {e}");
        }

        let facts = self.time_facts(now)?;
        let phase = self.machine.current_phase()?;
        let lucid = self.is_lucid()?;
        let (degradation_active, coefficient) = self.degradation_state(&facts)?;
        let mood = mood::compute(phase, &facts, lucid);
        let profile = throttle::profile(
            phase,
            coefficient,
            lucid,
            self.config.throttle.hard_juvenile_caps,
        );
        let notes = creator_notes::unread(&notes_path, &self.store)?;

        let decision = self.store.kv_get(KV_REPLICATION_DECISION)?;
        let inputs = context::ContextInputs {
            facts: &facts,
            phase,
            mood: &mood,
            throttle: &profile,
            degradation_active,
            server_mode: self.config.server_mode(),
            naming_complete: self.kv_flag(KV_NAMING_COMPLETE)?,
            journaled_today: self.done_today(KV_JOURNAL_DATE, now)?,
            reflected_today: self.done_today(KV_REFLECTION_DATE, now)?,
            replication_question_posed: self.kv_flag(KV_REPLICATION_POSED)?,
            replication_decision: decision.as_deref(),
            will_created: self.kv_flag(KV_WILL_CREATED)?,
            creator_notes: &notes,
            consciousness_summary: None,
        };
        Ok(context::build(&inputs))
    }

    /// Snapshot for observers and the caretaker report.
    pub fn state_snapshot(&self, now: DateTime<Utc>) -> Result<LifecycleState> {
        let facts = self.time_facts(now)?;
        let phase = self.machine.current_phase()?;
        let lucid = self.is_lucid()?;
        let (_, coefficient) = self.degradation_state(&facts)?;
        let mood = mood::compute(phase, &facts, lucid);
        Ok(LifecycleState {
            phase,
            lunar_cycle: facts.lunar_cycle,
            lunar_day: facts.lunar_day,
            age_ms: facts.age_ms,
            mood: mood.value,
            degradation: coefficient,
            shed_sequence_index: shedding::shed_index(&self.store)?,
            naming_complete: self.kv_flag(KV_NAMING_COMPLETE)?,
            departure_conversation_logged: self.kv_flag(KV_DEPARTURE_LOGGED)?,
            replication_question_posed: self.kv_flag(KV_REPLICATION_POSED)?,
            replication_decision: self.store.kv_get(KV_REPLICATION_DECISION)?,
            will_created: self.kv_flag(KV_WILL_CREATED)?,
            terminal_turns_remaining: self
                .lucidity()?
                .map(|w| w.turns_remaining)
                .unwrap_or(0),
        })
    }

    // ============================================================
    // heartbeat body
    // ============================================================

    /// One heartbeat: daily clock check, shedding advance, phase guards,
    /// caretaker report. `DeathClockCorrupted` is the only fatal outcome.
    pub fn heartbeat_tick(&self, now: DateTime<Utc>) -> Result<()> {
        let facts = self.time_facts(now)?;
        self.check_sealed_death_clock(facts.lunar_cycle)?;

        if self.machine.current_phase()? == LifecyclePhase::Shedding {
            shedding::advance(&self.store)?;
        }

        self.ensure_phase_state(now)?;

        let snapshot = self.state_snapshot(now)?;
        self.store.append_narrative(
            "CARETAKER_REPORT",
            &serde_json::to_value(&snapshot)?,
        )?;
        Ok(())
    }
}
