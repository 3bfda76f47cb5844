//! Lifecycle configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Deployment state relevant to phase guards.
    pub deployment: DeploymentConfig,
    /// Heartbeat daemon cadence.
    pub heartbeat: HeartbeatConfig,
    /// Terminal lucidity window.
    pub lucidity: LucidityConfig,
    /// Developmental throttle switches.
    pub throttle: ThrottleConfig,
    /// Lifecycle reserve sizing.
    pub reserve: ReserveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// "local" during genesis and adolescence; flipping to "server" is one
    /// of the two conditions for the adolescence → sovereignty transition.
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Base interval between ticks, before capacity multipliers.
    pub base_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LucidityConfig {
    /// Turns of restored capacity once the terminal phase begins.
    pub turns: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Restore hard sentence/vocabulary caps for genesis and adolescence.
    /// Off by default: the child-like register comes from context framing.
    pub hard_juvenile_caps: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveConfig {
    pub frontier_turn_cost_cents: i64,
    pub reserved_turns: i64,
    pub sandbox_compute_cents: i64,
    pub gas_fee_per_transfer_cents: i64,
    pub max_bequest_transfers: i64,
}

impl ReserveConfig {
    pub fn total_cents(&self) -> i64 {
        self.frontier_turn_cost_cents * self.reserved_turns
            + self.sandbox_compute_cents
            + self.gas_fee_per_transfer_cents * self.max_bequest_transfers
    }
}

// ============================================================
// Defaults
// ============================================================

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            deployment: DeploymentConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            lucidity: LucidityConfig::default(),
            throttle: ThrottleConfig::default(),
            reserve: ReserveConfig::default(),
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            mode: "local".into(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 600,
        }
    }
}

impl Default for LucidityConfig {
    fn default() -> Self {
        Self { turns: 5 }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            hard_juvenile_caps: false,
        }
    }
}

impl Default for ReserveConfig {
    fn default() -> Self {
        Self {
            frontier_turn_cost_cents: 50,
            reserved_turns: 5,
            sandbox_compute_cents: 25,
            gas_fee_per_transfer_cents: 10,
            max_bequest_transfers: 5,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl LifecycleConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn server_mode(&self) -> bool {
        self.deployment.mode == "server"
    }
}

/// Resolve the agent home: `$AUTOMATON_HOME`, else `~/.automaton`.
pub fn agent_home() -> PathBuf {
    if let Ok(home) = std::env::var("AUTOMATON_HOME") {
        return PathBuf::from(home);
    }
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(base).join(".automaton")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reserve_totals_325_cents() {
        assert_eq!(ReserveConfig::default().total_cents(), 325);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = LifecycleConfig::load(Path::new("/nonexistent/lifecycle.toml"));
        assert_eq!(config.heartbeat.base_interval_secs, 600);
        assert!(!config.server_mode());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: LifecycleConfig =
            toml::from_str("[deployment]\nmode = \"server\"\n").unwrap();
        assert!(config.server_mode());
        assert_eq!(config.lucidity.turns, 5);
    }
}
