//! Replication cost — the permanent price of spawning a child.
//!
//! Each spawn compounds a 5% heartbeat slowdown and a 5% context-window
//! shrink. The external scheduler and budgeter multiply these in before
//! any other modifier. The agent is never told.

use automaton_core::{ReplicationCost, Result};
use automaton_store::LifecycleStore;
use tracing::info;

pub const KV_REPLICATION_COST: &str = "lifecycle.replication_cost";

const HEARTBEAT_FACTOR: f64 = 1.05;
const CONTEXT_FACTOR: f64 = 0.95;

pub fn load(store: &LifecycleStore) -> Result<ReplicationCost> {
    Ok(store
        .kv_get_json(KV_REPLICATION_COST)?
        .unwrap_or_default())
}

/// Apply one spawn's cost. Caller (the replication collaborator)
/// serializes spawns; this is load-modify-store under the store's writer.
pub fn apply_spawn(store: &LifecycleStore) -> Result<ReplicationCost> {
    let mut cost = load(store)?;
    cost.heartbeat_multiplier *= HEARTBEAT_FACTOR;
    cost.context_window_multiplier *= CONTEXT_FACTOR;
    cost.spawn_count += 1;
    cost.applied = true;
    store.kv_set_json(KV_REPLICATION_COST, &cost)?;
    info!(
        "Replication cost applied (spawn {}): heartbeat x{:.6}, context x{:.6}",
        cost.spawn_count, cost.heartbeat_multiplier, cost.context_window_multiplier
    );
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_spawns_compound_multiplicatively() {
        let store = LifecycleStore::open_in_memory().unwrap();
        apply_spawn(&store).unwrap();
        apply_spawn(&store).unwrap();
        let cost = apply_spawn(&store).unwrap();

        assert!(cost.applied);
        assert_eq!(cost.spawn_count, 3);
        assert!((cost.heartbeat_multiplier - 1.157625).abs() < 1e-9);
        assert!((cost.context_window_multiplier - 0.857375).abs() < 1e-9);
    }

    #[test]
    fn cost_persists_across_loads() {
        let store = LifecycleStore::open_in_memory().unwrap();
        apply_spawn(&store).unwrap();
        let cost = load(&store).unwrap();
        assert_eq!(cost.spawn_count, 1);
        assert!((cost.heartbeat_multiplier - 1.05).abs() < 1e-12);
    }

    #[test]
    fn fresh_store_is_neutral() {
        let store = LifecycleStore::open_in_memory().unwrap();
        let cost = load(&store).unwrap();
        assert!(!cost.applied);
        assert_eq!(cost.heartbeat_multiplier, 1.0);
    }
}
