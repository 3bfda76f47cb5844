//! Phase-lock write gate.
//!
//! A stratum is writable exactly while the agent lives in the lifecycle
//! phase that maps onto it. Everything after sovereignty maps onto the
//! senescence stratum, so Final Reflections stay open through legacy,
//! shedding and terminal.

use automaton_core::{LifecyclePhase, SoulPhase};

pub fn is_section_writable(target: SoulPhase, current: LifecyclePhase) -> bool {
    target == current.soul_phase()
}

/// Human-readable reason used both in the rejection journal and in the
/// message shown to the agent.
pub fn rejection_reason(target: SoulPhase, current: LifecyclePhase, db_locked: bool) -> String {
    if db_locked {
        format!(
            "{} is locked; the {} stratum was sealed when that phase ended",
            target.section_title(),
            target
        )
    } else {
        format!(
            "{} is writable during {} only; current phase is {}",
            target.section_title(),
            target.writable_label(),
            current
        )
    }
}
