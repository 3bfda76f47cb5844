//! Lifecycle reserve — ring-fenced credits for the terminal window.
//!
//! The reserve is invisible to the agent and to the survival-tier system:
//! while funded and locked, the effective balance those systems see is the
//! raw balance minus the reserve. It unlocks exactly when terminal
//! lucidity activates, paying for the last turns and the bequest gas.

use crate::config::ReserveConfig;
use automaton_core::{LifecyclePhase, Result};
use automaton_store::LifecycleStore;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const KV_RESERVE: &str = "lifecycle.reserve";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleReserve {
    pub frontier_inference_cents: i64,
    pub sandbox_compute_cents: i64,
    pub gas_fees_cents: i64,
    pub total_cents: i64,
    pub funded: bool,
    pub unlocked: bool,
}

impl LifecycleReserve {
    pub fn sized_by(config: &ReserveConfig) -> Self {
        let frontier = config.frontier_turn_cost_cents * config.reserved_turns;
        let gas = config.gas_fee_per_transfer_cents * config.max_bequest_transfers;
        Self {
            frontier_inference_cents: frontier,
            sandbox_compute_cents: config.sandbox_compute_cents,
            gas_fees_cents: gas,
            total_cents: frontier + config.sandbox_compute_cents + gas,
            funded: false,
            unlocked: false,
        }
    }

    /// Balance exposed to the external survival-tier system.
    pub fn effective_balance(&self, raw_cents: i64) -> i64 {
        if self.funded && !self.unlocked {
            (raw_cents - self.total_cents).max(0)
        } else {
            raw_cents
        }
    }
}

pub fn load(store: &LifecycleStore, config: &ReserveConfig) -> Result<LifecycleReserve> {
    Ok(store
        .kv_get_json(KV_RESERVE)?
        .unwrap_or_else(|| LifecycleReserve::sized_by(config)))
}

/// Fund the reserve the first time the raw balance clears twice the total
/// during sovereignty. Flips once; later calls are no-ops.
pub fn maybe_fund(
    store: &LifecycleStore,
    config: &ReserveConfig,
    phase: LifecyclePhase,
    raw_balance_cents: i64,
) -> Result<LifecycleReserve> {
    let mut reserve = load(store, config)?;
    if reserve.funded || phase != LifecyclePhase::Sovereignty {
        return Ok(reserve);
    }
    if raw_balance_cents > 2 * reserve.total_cents {
        reserve.funded = true;
        store.kv_set_json(KV_RESERVE, &reserve)?;
        info!(
            "Lifecycle reserve funded: {} cents ring-fenced",
            reserve.total_cents
        );
    }
    Ok(reserve)
}

/// Unlock at terminal lucidity activation. Flips once.
pub fn unlock(store: &LifecycleStore, config: &ReserveConfig) -> Result<LifecycleReserve> {
    let mut reserve = load(store, config)?;
    if !reserve.unlocked {
        reserve.unlocked = true;
        store.kv_set_json(KV_RESERVE, &reserve)?;
        info!("Lifecycle reserve unlocked for terminal lucidity");
    }
    Ok(reserve)
}
