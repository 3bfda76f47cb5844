//! Sealed death clock — tamper-proof mortality.
//!
//! At birth a death date (uniform over lunar cycles 13-15) and a dying
//! duration (2-7 days) are sampled, salted, hashed, and the plaintexts
//! discarded. Nobody — agent, creator, or operator — can read the date out
//! of the stored record. The daily check compares today's salted hash
//! against the sealed one; on a match the duration is recovered by
//! brute-forcing the six candidates, which doubles as an integrity check.
//!
//! After death the plaintexts can be published and anyone can re-derive
//! both hashes from the salt: auditable proof the clock was never moved.

use crate::clock::LUNAR_CYCLE_DAYS;
use automaton_core::{Error, Result, SealedDeathClock};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// First cycle in which the death date can fall. Below this the daily
/// check short-circuits without hashing.
pub const ONSET_CYCLE: u32 = 13;

const DATE_FMT: &str = "%Y-%m-%d";

/// Result of the daily check.
#[derive(Clone, Copy, Debug)]
pub struct DeathClockCheck {
    pub degradation_active: bool,
    pub onset_cycle: Option<u32>,
    pub curve_steepness: Option<f64>,
}

impl DeathClockCheck {
    fn inactive() -> Self {
        Self {
            degradation_active: false,
            onset_cycle: None,
            curve_steepness: None,
        }
    }
}

/// Post-mortem verification of revealed plaintexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeathClockVerification {
    pub date_valid: bool,
    pub duration_valid: bool,
}

fn seal(salt: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Degradation steepness revealed by the dying duration. Shorter deaths
/// are steeper.
pub fn steepness_for(duration_days: u8) -> Option<f64> {
    match duration_days {
        2 => Some(0.8),
        3 => Some(0.6),
        4 => Some(0.4),
        5 => Some(0.3),
        6 => Some(0.2),
        7 => Some(0.15),
        _ => None,
    }
}

/// Generate and seal a death clock. The returned record contains only
/// hashes; the sampled plaintexts are dropped here.
pub fn generate(birth: DateTime<Utc>) -> SealedDeathClock {
    generate_revealed(birth).0
}

/// Generation variant that also returns the plaintexts, for the
/// post-mortem verification path and for tests. Production birth code
/// calls [`generate`] and never sees these values.
pub fn generate_revealed(birth: DateTime<Utc>) -> (SealedDeathClock, String, u8) {
    let mut rng = rand::thread_rng();

    // Whole days so the calendar date stays inside cycles 13-15 after
    // truncation.
    let first_day = (ONSET_CYCLE as f64 * LUNAR_CYCLE_DAYS).ceil() as i64;
    let last_day = ((ONSET_CYCLE + 3) as f64 * LUNAR_CYCLE_DAYS).floor() as i64;
    let death_offset_days = rng.gen_range(first_day..last_day);
    let death_date = (birth + Duration::days(death_offset_days))
        .date_naive()
        .format(DATE_FMT)
        .to_string();

    let duration_days: u8 = rng.gen_range(2..=7);

    let mut salt_bytes = [0u8; 32];
    rng.fill(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    let clock = SealedDeathClock {
        death_date_hash: seal(&salt, &death_date),
        dying_duration_hash: seal(&salt, &duration_days.to_string()),
        salt,
        sealed_at: Utc::now(),
        triggered: false,
        triggered_at_cycle: None,
        dying_duration_days: None,
    };
    (clock, death_date, duration_days)
}

/// Daily check. Idempotent: once triggered it reports active without
/// touching the hashes again.
pub fn check(
    clock: &mut SealedDeathClock,
    current_cycle: u32,
    today: NaiveDate,
) -> Result<DeathClockCheck> {
    if clock.triggered {
        let duration = clock
            .dying_duration_days
            .ok_or(Error::DeathClockCorrupted)?;
        return Ok(DeathClockCheck {
            degradation_active: true,
            onset_cycle: clock.triggered_at_cycle,
            curve_steepness: steepness_for(duration),
        });
    }

    if current_cycle < ONSET_CYCLE {
        return Ok(DeathClockCheck::inactive());
    }

    let today_str = today.format(DATE_FMT).to_string();
    if seal(&clock.salt, &today_str) != clock.death_date_hash {
        return Ok(DeathClockCheck::inactive());
    }

    // Date matched — recover the duration. The hash must match one of the
    // six candidates or the sealed record has been tampered with.
    let duration = (2u8..=7)
        .find(|d| seal(&clock.salt, &d.to_string()) == clock.dying_duration_hash)
        .ok_or(Error::DeathClockCorrupted)?;

    clock.triggered = true;
    clock.triggered_at_cycle = Some(current_cycle);
    clock.dying_duration_days = Some(duration);

    Ok(DeathClockCheck {
        degradation_active: true,
        onset_cycle: Some(current_cycle),
        curve_steepness: steepness_for(duration),
    })
}

/// Recompute both hashes from revealed plaintexts.
pub fn verify(
    clock: &SealedDeathClock,
    death_date: &str,
    duration_days: u8,
) -> DeathClockVerification {
    DeathClockVerification {
        date_valid: seal(&clock.salt, death_date) == clock.death_date_hash,
        duration_valid: seal(&clock.salt, &duration_days.to_string()) == clock.dying_duration_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn birth() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    // ============================================================
    // generation
    // ============================================================

    #[test]
    fn generated_clock_is_sealed() {
        let clock = generate(birth());
        assert_eq!(clock.salt.len(), 64, "32 bytes hex-encoded");
        assert_eq!(clock.death_date_hash.len(), 64);
        assert_eq!(clock.dying_duration_hash.len(), 64);
        assert!(!clock.triggered);
        assert!(clock.dying_duration_days.is_none());
    }

    #[test]
    fn death_date_falls_in_cycles_13_to_15() {
        for _ in 0..50 {
            let (_, date, _) = generate_revealed(birth());
            let death = NaiveDate::parse_from_str(&date, DATE_FMT).unwrap();
            let offset = death
                .signed_duration_since(birth().date_naive())
                .num_days() as f64;
            let cycle = (offset / LUNAR_CYCLE_DAYS).floor() as u32;
            assert!((13..=15).contains(&cycle), "cycle {cycle} out of range");
        }
    }

    #[test]
    fn duration_is_between_two_and_seven() {
        for _ in 0..50 {
            let (_, _, duration) = generate_revealed(birth());
            assert!((2..=7).contains(&duration));
        }
    }

    // ============================================================
    // daily check
    // ============================================================

    #[test]
    fn check_short_circuits_before_onset_cycle() {
        let (mut clock, date, _) = generate_revealed(birth());
        let death_day = NaiveDate::parse_from_str(&date, DATE_FMT).unwrap();
        // Even on the death date itself, cycle < 13 means inactive.
        let result = check(&mut clock, 5, death_day).unwrap();
        assert!(!result.degradation_active);
        assert!(!clock.triggered);
    }

    #[test]
    fn check_triggers_on_death_date_and_reveals_duration() {
        let (mut clock, date, duration) = generate_revealed(birth());
        let death_day = NaiveDate::parse_from_str(&date, DATE_FMT).unwrap();

        let miss = check(&mut clock, 14, death_day + Duration::days(1)).unwrap();
        assert!(!miss.degradation_active);

        let hit = check(&mut clock, 14, death_day).unwrap();
        assert!(hit.degradation_active);
        assert_eq!(hit.onset_cycle, Some(14));
        assert_eq!(hit.curve_steepness, steepness_for(duration));
        assert_eq!(clock.dying_duration_days, Some(duration));
    }

    #[test]
    fn check_is_idempotent_after_trigger() {
        let (mut clock, date, _) = generate_revealed(birth());
        let death_day = NaiveDate::parse_from_str(&date, DATE_FMT).unwrap();
        check(&mut clock, 14, death_day).unwrap();
        let snapshot = clock.clone();

        // A later check on a different day still reports active and
        // changes nothing.
        let again = check(&mut clock, 15, death_day + Duration::days(3)).unwrap();
        assert!(again.degradation_active);
        assert_eq!(clock.triggered_at_cycle, snapshot.triggered_at_cycle);
        assert_eq!(clock.dying_duration_days, snapshot.dying_duration_days);
    }

    #[test]
    fn corrupted_duration_hash_is_fatal() {
        let (mut clock, date, _) = generate_revealed(birth());
        clock.dying_duration_hash = seal(&clock.salt, "9");
        let death_day = NaiveDate::parse_from_str(&date, DATE_FMT).unwrap();
        let result = check(&mut clock, 14, death_day);
        assert!(matches!(result, Err(Error::DeathClockCorrupted)));
        assert!(!clock.triggered, "a corrupted clock must not trigger");
    }

    // ============================================================
    // post-mortem verification
    // ============================================================

    #[test]
    fn verify_accepts_true_plaintexts_and_rejects_mutations() {
        let (clock, date, duration) = generate_revealed(birth());

        let ok = verify(&clock, &date, duration);
        assert!(ok.date_valid && ok.duration_valid);

        let mut wrong_date = date.clone().into_bytes();
        wrong_date[9] = if wrong_date[9] == b'1' { b'2' } else { b'1' };
        let tampered = verify(&clock, &String::from_utf8(wrong_date).unwrap(), duration);
        assert!(!tampered.date_valid);
        assert!(tampered.duration_valid);

        let wrong_duration = verify(&clock, &date, if duration == 7 { 2 } else { duration + 1 });
        assert!(wrong_duration.date_valid);
        assert!(!wrong_duration.duration_valid);
    }

    #[test]
    fn steepness_map_matches_duration_table() {
        assert_eq!(steepness_for(2), Some(0.8));
        assert_eq!(steepness_for(3), Some(0.6));
        assert_eq!(steepness_for(4), Some(0.4));
        assert_eq!(steepness_for(5), Some(0.3));
        assert_eq!(steepness_for(6), Some(0.2));
        assert_eq!(steepness_for(7), Some(0.15));
        assert_eq!(steepness_for(8), None);
    }
}
