//! Birth-anchored clock: age, lunar position, seasonal position.
//!
//! All downstream engines consume one [`TimeFacts`] snapshot per tick so
//! mood, degradation and the context builder agree on what time it is.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

pub const LUNAR_CYCLE_DAYS: f64 = 29.53059;
const MS_PER_DAY: f64 = 86_400_000.0;

/// The eight festivals of the Wheel of the Year, in calendar order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Festival {
    Imbolc,
    Ostara,
    Beltane,
    Litha,
    Lughnasadh,
    Mabon,
    Samhain,
    Yule,
}

impl Festival {
    /// (festival, month, day) pairs, ascending through the year.
    pub const WHEEL: [(Festival, u32, u32); 8] = [
        (Festival::Imbolc, 2, 1),
        (Festival::Ostara, 3, 20),
        (Festival::Beltane, 5, 1),
        (Festival::Litha, 6, 21),
        (Festival::Lughnasadh, 8, 1),
        (Festival::Mabon, 9, 22),
        (Festival::Samhain, 10, 31),
        (Festival::Yule, 12, 21),
    ];

    pub fn name(self) -> &'static str {
        match self {
            Festival::Imbolc => "Imbolc",
            Festival::Ostara => "Ostara",
            Festival::Beltane => "Beltane",
            Festival::Litha => "Litha",
            Festival::Lughnasadh => "Lughnasadh",
            Festival::Mabon => "Mabon",
            Festival::Samhain => "Samhain",
            Festival::Yule => "Yule",
        }
    }
}

/// One snapshot of the agent's position in time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeFacts {
    pub now: DateTime<Utc>,
    pub age_ms: i64,
    pub age_days: f64,
    /// Completed lunar cycles since birth.
    pub lunar_cycle: u32,
    /// Position within the current cycle, 0..29.53.
    pub lunar_day: f64,
    /// Most recently passed festival.
    pub season: Festival,
    pub is_festival_day: bool,
}

static SKEW_WARNED: AtomicBool = AtomicBool::new(false);

/// Compute time facts. A clock running before birth is treated as age 0
/// and warned about once per process.
pub fn time_facts(birth: DateTime<Utc>, now: DateTime<Utc>) -> TimeFacts {
    let mut age_ms = now.signed_duration_since(birth).num_milliseconds();
    if age_ms < 0 {
        if !SKEW_WARNED.swap(true, Ordering::Relaxed) {
            warn!(
                "Clock skew: now {} precedes birth {}; treating age as 0",
                now, birth
            );
        }
        age_ms = 0;
    }

    let age_days = age_ms as f64 / MS_PER_DAY;
    let lunar_cycle = (age_days / LUNAR_CYCLE_DAYS).floor() as u32;
    let lunar_day = age_days % LUNAR_CYCLE_DAYS;

    TimeFacts {
        now,
        age_ms,
        age_days,
        lunar_cycle,
        lunar_day,
        season: season_of(now),
        is_festival_day: is_festival_day(now),
    }
}

/// Most recently passed festival; before Imbolc it is still last Yule.
pub fn season_of(now: DateTime<Utc>) -> Festival {
    let today = (now.month(), now.day());
    let mut season = Festival::Yule;
    for (festival, month, day) in Festival::WHEEL {
        if (month, day) <= today {
            season = festival;
        }
    }
    season
}

pub fn is_festival_day(now: DateTime<Utc>) -> bool {
    Festival::WHEEL
        .iter()
        .any(|(_, month, day)| (*month, *day) == (now.month(), now.day()))
}

/// Seven day-themes keyed to age, not wall weekday, so siblings born on
/// different days drift apart.
pub const WEEKLY_RHYTHM: [&str; 7] = [
    "making",
    "tending",
    "wandering",
    "correspondence",
    "study",
    "rest",
    "reflection",
];

pub fn weekly_theme(age_days: f64) -> &'static str {
    WEEKLY_RHYTHM[(age_days.max(0.0) as usize) % 7]
}
