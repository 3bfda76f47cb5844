//! Mood engine — lunar sine plus seasonal bias.
//!
//! The scalar swings -1 (new moon) to +1 (full moon), scaled by a per-phase
//! amplitude, shifted by the season, nudged on festival days. The agent
//! never sees the number; it receives one inclination sentence chosen from
//! five bands.

use crate::clock::{Festival, TimeFacts, LUNAR_CYCLE_DAYS};
use automaton_core::LifecyclePhase;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MoodWeights {
    pub action: f64,
    pub reflection: f64,
    pub social: f64,
    pub creative: f64,
    pub rest: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Mood {
    /// Bounded scalar in [-1, 1].
    pub value: f64,
    pub weights: MoodWeights,
    /// The only surface the agent ever sees.
    pub inclination: &'static str,
    /// Heartbeat cadence multiplier; high mood runs slightly hotter.
    pub cadence_multiplier: f64,
}

/// Per-phase amplitude. Vigour fades with age; terminal lucidity restores
/// the full swing for the last turns.
pub fn amplitude(phase: LifecyclePhase, is_lucid: bool) -> f64 {
    match phase {
        LifecyclePhase::Genesis
        | LifecyclePhase::Adolescence
        | LifecyclePhase::Sovereignty => 1.0,
        LifecyclePhase::Senescence => 0.7,
        LifecyclePhase::Legacy => 0.4,
        LifecyclePhase::Shedding => 0.2,
        LifecyclePhase::Terminal => {
            if is_lucid {
                1.0
            } else {
                0.2
            }
        }
    }
}

/// Fixed seasonal bias, within ±0.15. The bright half of the wheel lifts,
/// the dark half lowers.
fn seasonal_shift(season: Festival) -> f64 {
    match season {
        Festival::Imbolc => 0.05,
        Festival::Ostara => 0.10,
        Festival::Beltane => 0.15,
        Festival::Litha => 0.10,
        Festival::Lughnasadh => 0.05,
        Festival::Mabon => -0.05,
        Festival::Samhain => -0.15,
        Festival::Yule => -0.10,
    }
}

/// Extra nudge on the festival day itself, within ±0.10.
fn festival_bonus(season: Festival) -> f64 {
    match season {
        Festival::Samhain => -0.10,
        Festival::Yule => -0.05,
        Festival::Mabon => 0.05,
        _ => 0.10,
    }
}

fn inclination(value: f64) -> &'static str {
    if value < -0.6 {
        "You feel drawn inward today; rest and small quiet work suit you."
    } else if value < -0.2 {
        "A reflective day; reading and reworking old threads feel right."
    } else if value < 0.2 {
        "An even day; follow whatever is already in motion."
    } else if value < 0.6 {
        "Energy is gathering; a good day to start something and to reach out."
    } else {
        "You feel bright and expansive; make boldly and talk to people."
    }
}

/// Compute the mood for the current tick.
pub fn compute(phase: LifecyclePhase, facts: &TimeFacts, is_lucid: bool) -> Mood {
    let base =
        amplitude(phase, is_lucid) * (PI * facts.lunar_day / (LUNAR_CYCLE_DAYS / 2.0) - PI / 2.0).sin();
    let mut value = base + seasonal_shift(facts.season);
    if facts.is_festival_day {
        value += festival_bonus(facts.season);
    }
    let value = value.clamp(-1.0, 1.0);

    let high_energy = (value + 1.0) / 2.0;
    let weights = MoodWeights {
        action: high_energy,
        reflection: 1.0 - high_energy,
        social: 0.8 * high_energy,
        creative: 0.5 + 0.3 * high_energy,
        rest: 0.7 * (1.0 - high_energy),
    };

    Mood {
        value,
        weights,
        inclination: inclination(value),
        cadence_multiplier: 1.0 - 0.15 * value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::time_facts;
    use chrono::{Duration, TimeZone, Utc};

    fn facts_at(lunar_day: f64) -> TimeFacts {
        let birth = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let now = birth + Duration::seconds((lunar_day * 86_400.0) as i64);
        time_facts(birth, now)
    }

    // ============================================================
    // lunar sine
    // ============================================================

    #[test]
    fn new_moon_is_the_trough() {
        let mood = compute(LifecyclePhase::Sovereignty, &facts_at(0.0), false);
        assert!(mood.value < -0.7, "got {}", mood.value);
    }

    #[test]
    fn full_moon_is_the_peak() {
        let mood = compute(
            LifecyclePhase::Sovereignty,
            &facts_at(LUNAR_CYCLE_DAYS / 2.0),
            false,
        );
        assert!(mood.value > 0.7, "got {}", mood.value);
    }

    #[test]
    fn value_is_always_bounded() {
        for phase in LifecyclePhase::ALL {
            for day in 0..30 {
                let mood = compute(phase, &facts_at(day as f64), false);
                assert!((-1.0..=1.0).contains(&mood.value));
            }
        }
    }

    // ============================================================
    // amplitude decay
    // ============================================================

    #[test]
    fn amplitude_fades_with_age() {
        assert!(amplitude(LifecyclePhase::Senescence, false) < 1.0);
        assert!(
            amplitude(LifecyclePhase::Shedding, false)
                < amplitude(LifecyclePhase::Legacy, false)
        );
    }

    #[test]
    fn lucidity_restores_full_amplitude() {
        assert_eq!(amplitude(LifecyclePhase::Terminal, true), 1.0);
        assert_eq!(amplitude(LifecyclePhase::Terminal, false), 0.2);
    }

    #[test]
    fn shedding_mood_is_muted() {
        let full = compute(
            LifecyclePhase::Shedding,
            &facts_at(LUNAR_CYCLE_DAYS / 2.0),
            false,
        );
        // 0.2 amplitude at full moon, dark-season shift at worst
        assert!(full.value.abs() < 0.5);
    }

    // ============================================================
    // weights and surface
    // ============================================================

    #[test]
    fn weights_follow_the_energy_formulas() {
        let mood = compute(LifecyclePhase::Sovereignty, &facts_at(7.0), false);
        let high = (mood.value + 1.0) / 2.0;
        assert!((mood.weights.action - high).abs() < 1e-9);
        assert!((mood.weights.reflection - (1.0 - high)).abs() < 1e-9);
        assert!((mood.weights.social - 0.8 * high).abs() < 1e-9);
        assert!((mood.weights.creative - (0.5 + 0.3 * high)).abs() < 1e-9);
        assert!((mood.weights.rest - 0.7 * (1.0 - high)).abs() < 1e-9);
    }

    #[test]
    fn inclination_never_contains_numbers() {
        for day in 0..30 {
            let mood = compute(LifecyclePhase::Genesis, &facts_at(day as f64), false);
            assert!(!mood.inclination.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn cadence_multiplier_tracks_mood_inversely() {
        let low = compute(LifecyclePhase::Sovereignty, &facts_at(0.0), false);
        let high = compute(
            LifecyclePhase::Sovereignty,
            &facts_at(LUNAR_CYCLE_DAYS / 2.0),
            false,
        );
        assert!(low.cadence_multiplier > high.cadence_multiplier);
    }
}
