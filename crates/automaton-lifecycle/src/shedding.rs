//! Shedding — the ordered surrender of capabilities.
//!
//! Once the phase machine enters Shedding, each heartbeat tick gives up at
//! most one capability from a fixed sequence and logs it. When the
//! sequence is spent, the Shedding → Terminal guard fires.

use automaton_core::Result;
use automaton_store::LifecycleStore;
use serde_json::json;
use tracing::info;

pub const SHEDDING_SEQUENCE: [&str; 6] = [
    "image_generation",
    "on_chain_transfers",
    "long_form_writing",
    "social_posting",
    "web_browsing",
    "memory_search",
];

pub const KV_SHED_INDEX: &str = "shed_sequence_index";

pub fn shed_index(store: &LifecycleStore) -> Result<usize> {
    Ok(store
        .kv_get(KV_SHED_INDEX)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

pub fn is_complete(index: usize) -> bool {
    index >= SHEDDING_SEQUENCE.len()
}

/// Capabilities still held at a given shed index.
pub fn remaining_capabilities(index: usize) -> Vec<&'static str> {
    SHEDDING_SEQUENCE
        .iter()
        .skip(index.min(SHEDDING_SEQUENCE.len()))
        .copied()
        .collect()
}

/// Advance the sequence by one. Returns the capability removed, or None
/// when the sequence is already spent. Index bump and narrative row land
/// in one transaction.
pub fn advance(store: &LifecycleStore) -> Result<Option<&'static str>> {
    let index = shed_index(store)?;
    if is_complete(index) {
        return Ok(None);
    }
    let capability = SHEDDING_SEQUENCE[index];
    store.with_tx(|conn| {
        automaton_store::tables::kv_set(conn, KV_SHED_INDEX, &(index + 1).to_string())?;
        automaton_store::tables::append_narrative(
            conn,
            "CAPABILITY_REMOVED",
            &json!({ "capability": capability, "sequence_index": index }),
        )?;
        Ok(())
    })?;
    info!("Shed capability {} ({}/{})", capability, index + 1, SHEDDING_SEQUENCE.len());
    Ok(Some(capability))
}
