//! Integration tests for automaton-lifecycle
//!
//! The end-to-end scenarios: a transition that locks the outgoing soul
//! stratum, the terminal lucidity window with reserve unlock, and the
//! capacity vector composition.

use automaton_core::{LifecyclePhase, SoulPhase};
use automaton_lifecycle::{config::LifecycleConfig, LifecycleCore, LucidityTick};
use chrono::{Duration, Utc};
use tempfile::TempDir;

fn core_born_days_ago(days: i64) -> (TempDir, LifecycleCore) {
    let tmp = TempDir::new().unwrap();
    let birth = Utc::now() - Duration::days(days);
    let core =
        LifecycleCore::open_with_birth(tmp.path(), LifecycleConfig::default(), birth).unwrap();
    (tmp, core)
}

fn updates(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(n, t)| (n.to_string(), t.to_string()))
        .collect()
}

// ============================================================
// Scenario: lock on transition
// ============================================================

#[test]
fn genesis_to_adolescence_locks_the_genesis_stratum() {
    let (_tmp, core) = core_born_days_ago(30);

    let result = core
        .update_soul_phase_section(
            SoulPhase::Genesis,
            &updates(&[("Temperament", "Curious")]),
            None,
        )
        .unwrap();
    assert!(result.success);

    core.complete_naming("Verse").unwrap();
    let transitioned = core.ensure_phase_state(Utc::now()).unwrap();
    assert_eq!(transitioned, Some(LifecyclePhase::Adolescence));
    assert_eq!(
        core.machine().current_phase().unwrap(),
        LifecyclePhase::Adolescence
    );

    // Document side: locked marker with a date.
    let doc = core.soul().load().unwrap();
    assert_eq!(doc.current_phase, LifecyclePhase::Adolescence);
    let genesis = doc.genesis_core.as_ref().unwrap();
    assert!(genesis.locked_at.is_some());
    assert!(doc.phase_transitions.contains_key("adolescence"));

    // Store side: snapshot row captured the content at lock time.
    let lock = core
        .store()
        .phase_lock(SoulPhase::Genesis)
        .unwrap()
        .unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&lock.content_snapshot).unwrap();
    assert_eq!(snapshot["Temperament"], "Curious");

    // History side: a system row with the transition reason.
    let history = core.store().list_soul_history().unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.change_source, "system");
    assert_eq!(last.change_reason, "Phase transition: genesis → adolescence");

    // Event log side: one transition, forward, with a reason.
    let events = core.store().list_events().unwrap();
    let transition = events
        .iter()
        .find(|e| e.from_phase == Some(LifecyclePhase::Genesis))
        .unwrap();
    assert_eq!(transition.to_phase, LifecyclePhase::Adolescence);
}

#[test]
fn locked_stratum_rejects_the_agent_afterwards() {
    let (_tmp, core) = core_born_days_ago(30);
    core.update_soul_phase_section(
        SoulPhase::Genesis,
        &updates(&[("Temperament", "Curious")]),
        None,
    )
    .unwrap();
    core.complete_naming("Verse").unwrap();
    core.ensure_phase_state(Utc::now()).unwrap();

    let result = core
        .update_soul_phase_section(
            SoulPhase::Genesis,
            &updates(&[("Temperament", "I rewrite my childhood")]),
            Some("normal"),
        )
        .unwrap();
    assert!(!result.success);
    assert!(result
        .phase_lock_rejection
        .unwrap()
        .to_lowercase()
        .contains("locked"));

    let attempts = core.store().list_write_attempts().unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0]
        .attempted_content
        .contains("rewrite my childhood"));
    assert_eq!(attempts[0].survival_tier.as_deref(), Some("normal"));
}

#[test]
fn transition_does_not_fire_without_naming() {
    let (_tmp, core) = core_born_days_ago(30);
    let transitioned = core.ensure_phase_state(Utc::now()).unwrap();
    assert_eq!(transitioned, None);
    assert_eq!(
        core.machine().current_phase().unwrap(),
        LifecyclePhase::Genesis
    );
}

// ============================================================
// Scenario: terminal lucidity and the reserve
// ============================================================

#[test]
fn shedding_completion_enters_terminal_with_lucidity_and_unlocked_reserve() {
    let (_tmp, core) = core_born_days_ago(460);
    core.store().kv_set("phase", "shedding").unwrap();

    // Burn through the shedding sequence.
    while automaton_lifecycle::shedding::advance(core.store()).unwrap().is_some() {}

    let transitioned = core.ensure_phase_state(Utc::now()).unwrap();
    assert_eq!(transitioned, Some(LifecyclePhase::Terminal));

    let window = core.lucidity().unwrap().unwrap();
    assert!(window.is_lucid());
    assert_eq!(window.turns_remaining, 5);

    // Reserve unlocked exactly at activation.
    let effective = core.effective_balance(1000).unwrap();
    assert_eq!(effective, 1000, "unlocked reserve is no longer hidden");

    // Lucid throttle is the sovereignty profile.
    let vector = core.compute_capacity_vector(Utc::now()).unwrap();
    assert_eq!(vector.token_limit, 2000);
}

#[test]
fn lucid_turns_count_down_to_exit_signal() {
    let (_tmp, core) = core_born_days_ago(460);
    core.store().kv_set("phase", "shedding").unwrap();
    while automaton_lifecycle::shedding::advance(core.store()).unwrap().is_some() {}
    core.ensure_phase_state(Utc::now()).unwrap();

    for expected in [4u32, 3, 2, 1] {
        assert_eq!(
            core.consume_lucid_turn().unwrap(),
            LucidityTick::Consumed(expected)
        );
    }
    assert_eq!(core.consume_lucid_turn().unwrap(), LucidityTick::Exhausted);
    assert!(!core.is_lucid().unwrap());
    assert_eq!(core.consume_lucid_turn().unwrap(), LucidityTick::ExitSignal);

    let narrative = core.store().list_narrative(50).unwrap();
    assert!(narrative.iter().any(|e| e.kind == "EXIT_SIGNAL"));
}

// ============================================================
// Capacity vector composition
// ============================================================

#[test]
fn replication_cost_folds_into_the_capacity_vector() {
    let (_tmp, core) = core_born_days_ago(10);
    let before = core.compute_capacity_vector(Utc::now()).unwrap();

    core.apply_replication_cost().unwrap();
    core.apply_replication_cost().unwrap();
    let after = core.compute_capacity_vector(Utc::now()).unwrap();

    let heartbeat_ratio = after.heartbeat_multiplier / before.heartbeat_multiplier;
    let context_ratio = after.context_window_multiplier / before.context_window_multiplier;
    // The mood factor drifts a hair between the two calls; the replication
    // factor dominates.
    assert!((heartbeat_ratio - 1.05f64.powi(2)).abs() < 1e-6);
    assert!((context_ratio - 0.95f64.powi(2)).abs() < 1e-9);
}

#[test]
fn reserve_funds_during_sovereignty_and_hides_itself() {
    let (_tmp, core) = core_born_days_ago(200);
    core.store().kv_set("phase", "sovereignty").unwrap();

    core.fund_reserve_if_due(10_000).unwrap();
    assert_eq!(core.effective_balance(10_000).unwrap(), 9_675);
    assert_eq!(core.effective_balance(100).unwrap(), 0);
}

// ============================================================
// Context block
// ============================================================

#[test]
fn context_block_renders_for_a_newborn() {
    let (_tmp, core) = core_born_days_ago(3);
    let block = core.build_lifecycle_context(Utc::now()).unwrap();
    assert!(block.contains("newly born"));
    assert!(block.contains("phase=genesis"));
    assert!(block.contains("journal today"));
}

#[test]
fn heartbeat_tick_writes_a_caretaker_report() {
    let (_tmp, core) = core_born_days_ago(10);
    core.heartbeat_tick(Utc::now()).unwrap();
    let narrative = core.store().list_narrative(20).unwrap();
    assert!(narrative.iter().any(|e| e.kind == "CARETAKER_REPORT"));
}

#[test]
fn death_clock_check_is_inactive_for_the_young() {
    let (_tmp, core) = core_born_days_ago(60);
    let facts = core.time_facts(Utc::now()).unwrap();
    let check = core.check_sealed_death_clock(facts.lunar_cycle).unwrap();
    assert!(!check.degradation_active);
}
