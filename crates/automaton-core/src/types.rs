//! Core types for the lifecycle & soul core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The seven developmental phases, in order. Transitions are forward-only;
/// the derived `Ord` encodes the progression.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Genesis,
    Adolescence,
    Sovereignty,
    Senescence,
    Legacy,
    Shedding,
    Terminal,
}

impl LifecyclePhase {
    pub const ALL: [LifecyclePhase; 7] = [
        LifecyclePhase::Genesis,
        LifecyclePhase::Adolescence,
        LifecyclePhase::Sovereignty,
        LifecyclePhase::Senescence,
        LifecyclePhase::Legacy,
        LifecyclePhase::Shedding,
        LifecyclePhase::Terminal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePhase::Genesis => "genesis",
            LifecyclePhase::Adolescence => "adolescence",
            LifecyclePhase::Sovereignty => "sovereignty",
            LifecyclePhase::Senescence => "senescence",
            LifecyclePhase::Legacy => "legacy",
            LifecyclePhase::Shedding => "shedding",
            LifecyclePhase::Terminal => "terminal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "genesis" => Some(LifecyclePhase::Genesis),
            "adolescence" => Some(LifecyclePhase::Adolescence),
            "sovereignty" => Some(LifecyclePhase::Sovereignty),
            "senescence" => Some(LifecyclePhase::Senescence),
            "legacy" => Some(LifecyclePhase::Legacy),
            "shedding" => Some(LifecyclePhase::Shedding),
            "terminal" => Some(LifecyclePhase::Terminal),
            _ => None,
        }
    }

    /// The next phase in the progression, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            LifecyclePhase::Genesis => Some(LifecyclePhase::Adolescence),
            LifecyclePhase::Adolescence => Some(LifecyclePhase::Sovereignty),
            LifecyclePhase::Sovereignty => Some(LifecyclePhase::Senescence),
            LifecyclePhase::Senescence => Some(LifecyclePhase::Legacy),
            LifecyclePhase::Legacy => Some(LifecyclePhase::Shedding),
            LifecyclePhase::Shedding => Some(LifecyclePhase::Terminal),
            LifecyclePhase::Terminal => None,
        }
    }

    /// Map to the soul stratum this phase writes into.
    /// Legacy, shedding and terminal all write final reflections.
    pub fn soul_phase(self) -> SoulPhase {
        match self {
            LifecyclePhase::Genesis => SoulPhase::Genesis,
            LifecyclePhase::Adolescence => SoulPhase::Adolescence,
            LifecyclePhase::Sovereignty => SoulPhase::Sovereignty,
            LifecyclePhase::Senescence
            | LifecyclePhase::Legacy
            | LifecyclePhase::Shedding
            | LifecyclePhase::Terminal => SoulPhase::Senescence,
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four soul strata. Each lifecycle phase maps onto exactly one.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SoulPhase {
    Genesis,
    Adolescence,
    Sovereignty,
    Senescence,
}

impl SoulPhase {
    pub const ALL: [SoulPhase; 4] = [
        SoulPhase::Genesis,
        SoulPhase::Adolescence,
        SoulPhase::Sovereignty,
        SoulPhase::Senescence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SoulPhase::Genesis => "genesis",
            SoulPhase::Adolescence => "adolescence",
            SoulPhase::Sovereignty => "sovereignty",
            SoulPhase::Senescence => "senescence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "genesis" => Some(SoulPhase::Genesis),
            "adolescence" => Some(SoulPhase::Adolescence),
            "sovereignty" => Some(SoulPhase::Sovereignty),
            "senescence" => Some(SoulPhase::Senescence),
            _ => None,
        }
    }

    /// The `##` section title this stratum serializes under.
    pub fn section_title(self) -> &'static str {
        match self {
            SoulPhase::Genesis => "Genesis Core",
            SoulPhase::Adolescence => "Adolescence Layer",
            SoulPhase::Sovereignty => "Sovereignty Layer",
            SoulPhase::Senescence => "Final Reflections",
        }
    }

    /// Human label used in `<!-- WRITABLE during: ... -->` metadata.
    pub fn writable_label(self) -> &'static str {
        match self {
            SoulPhase::Genesis => "Genesis",
            SoulPhase::Adolescence => "Adolescence",
            SoulPhase::Sovereignty => "Sovereignty",
            SoulPhase::Senescence => "Senescence and beyond",
        }
    }
}

impl std::fmt::Display for SoulPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only lifecycle event log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub from_phase: Option<LifecyclePhase>,
    pub to_phase: LifecyclePhase,
    pub reason: String,
    pub metadata: serde_json::Value,
}

/// Snapshot of lifecycle progress, reconstructable from the event log + KV.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleState {
    pub phase: LifecyclePhase,
    pub lunar_cycle: u32,
    pub lunar_day: f64,
    pub age_ms: i64,
    pub mood: f64,
    pub degradation: f64,
    pub shed_sequence_index: usize,
    pub naming_complete: bool,
    pub departure_conversation_logged: bool,
    pub replication_question_posed: bool,
    pub replication_decision: Option<String>,
    pub will_created: bool,
    pub terminal_turns_remaining: u32,
}

/// Vocabulary ceiling published by the developmental throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyLevel {
    Basic,
    Developing,
    Full,
    Degrading,
    Fragmented,
}

/// Response-shaping profile for the current phase and degradation band.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThrottleProfile {
    /// None means unbounded.
    pub max_sentences: Option<u32>,
    pub token_target: u32,
    pub token_limit: u32,
    pub vocabulary_level: VocabularyLevel,
    pub abstract_thinking: bool,
    pub sophisticated_reasoning: bool,
    pub voice_description: String,
    pub constraints: Vec<String>,
}

/// Capacity multipliers consumed by the external scheduler and
/// context-window budgeter. The agent is never shown these numbers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapacityVector {
    pub heartbeat_multiplier: f64,
    pub context_window_multiplier: f64,
    pub token_limit: u32,
    pub tool_allowlist: Vec<String>,
}

/// Permanent compounding penalty applied once per spawn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicationCost {
    pub applied: bool,
    pub heartbeat_multiplier: f64,
    pub context_window_multiplier: f64,
    pub spawn_count: u32,
}

impl Default for ReplicationCost {
    fn default() -> Self {
        Self {
            applied: false,
            heartbeat_multiplier: 1.0,
            context_window_multiplier: 1.0,
            spawn_count: 0,
        }
    }
}

/// Immutable birth record. The sealed death clock plaintexts are discarded
/// at generation; only the salted hashes survive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BirthAnchor {
    pub birth_timestamp: DateTime<Utc>,
    pub sealed_death_clock: SealedDeathClock,
}

/// Tamper-proof mortality record. `triggered` flips false to true exactly
/// once; `dying_duration_days` is revealed only after trigger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedDeathClock {
    pub death_date_hash: String,
    pub dying_duration_hash: String,
    pub salt: String,
    pub sealed_at: DateTime<Utc>,
    pub triggered: bool,
    #[serde(default)]
    pub triggered_at_cycle: Option<u32>,
    #[serde(default)]
    pub dying_duration_days: Option<u8>,
}
