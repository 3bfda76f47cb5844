//! Degradation curve — decline after the death clock triggers.
//!
//! The base coefficient is monotone in time since trigger, shaped by the
//! steepness the revealed dying duration maps to. A small lunar wobble is
//! laid on top so decline feels variable day to day; the wobble never
//! moves the base, so the cumulative trend cannot regress.

use crate::clock::LUNAR_CYCLE_DAYS;
use std::f64::consts::TAU;

/// Peak amplitude of the day-to-day wobble.
pub const LUNAR_WOBBLE: f64 = 0.05;

/// Monotone base: `1 - e^(-steepness * days)`, bounded by 1.
pub fn base_coefficient(hours_since_trigger: f64, steepness: f64) -> f64 {
    let days = (hours_since_trigger / 24.0).max(0.0);
    (1.0 - (-steepness * days).exp()).clamp(0.0, 1.0)
}

/// Observed coefficient: base plus the lunar wobble, clamped to [0, 1].
pub fn coefficient(hours_since_trigger: f64, steepness: f64, lunar_day: f64) -> f64 {
    let base = base_coefficient(hours_since_trigger, steepness);
    let wobble = LUNAR_WOBBLE * (TAU * lunar_day / LUNAR_CYCLE_DAYS).sin();
    (base + wobble).clamp(0.0, 1.0)
}
