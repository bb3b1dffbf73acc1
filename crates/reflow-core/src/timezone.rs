//! Timezone boundary (A4): converts zone-less [`LocalDateTime`] values to and
//! from `DateTime<Utc>`. The reflow core itself never touches a timezone —
//! this module exists only for the façade/adapter boundary that stores and
//! displays instants in UTC while the core reasons in local wall-clock time.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::CoreError;
use crate::time::{LocalDate, LocalDateTime, LocalTime};

pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Converts a zone-less local value to UTC in `timezone`.
///
/// Ambiguous local times (fall-back) resolve to the *earliest* of the two
/// UTC instants; nonexistent local times (spring-forward gap) resolve to the
/// first valid local time at or after the gap (e.g. `02:30` on the
/// `America/New_York` spring-forward date resolves to `03:00`, not to
/// `02:30` shifted by the gap's width), matching the teacher's
/// `handle_dst_transition`.
pub fn to_utc(local: LocalDateTime, timezone: &str) -> Result<DateTime<Utc>, CoreError> {
    let tz = validate_timezone(timezone)?;
    if let Some(resolved) = tz.from_local_datetime(&local.inner()).earliest() {
        return Ok(resolved.with_timezone(&Utc));
    }

    // Spring-forward gaps are at most a couple of hours wide; walk forward
    // minute by minute to the first valid local time past the gap.
    let mut probe = local;
    for _ in 0..180 {
        probe = probe.add_minutes(1);
        if let Some(resolved) = tz.from_local_datetime(&probe.inner()).earliest() {
            return Ok(resolved.with_timezone(&Utc));
        }
    }
    Err(CoreError::InvalidTimezone(format!("{local} has no valid resolution in {timezone}")))
}

/// Converts a UTC instant to the zone-less local value it represents in `timezone`.
pub fn from_utc(instant: DateTime<Utc>, timezone: &str) -> Result<LocalDateTime, CoreError> {
    let tz = validate_timezone(timezone)?;
    let naive = instant.with_timezone(&tz).naive_local();
    Ok(LocalDateTime::from_naive(naive))
}

/// Whether `timezone` is currently observing DST, compared against its
/// January offset (a fixed reference month with no DST in either hemisphere's
/// typical rules).
pub fn is_dst_active(timezone: &str, at: DateTime<Utc>) -> Result<bool, CoreError> {
    use chrono::{Datelike, Offset};

    let tz = validate_timezone(timezone)?;
    let current_offset = at.with_timezone(&tz).offset().fix();

    let january = at.date_naive().with_month(1).and_then(|d| d.with_day(1)).unwrap_or(at.date_naive());
    let january_noon = january.and_hms_opt(12, 0, 0).expect("valid time");
    let january_offset = tz.from_utc_datetime(&january_noon).offset().fix();

    Ok(current_offset != january_offset)
}

/// Reconstructs a [`LocalDate`]/[`LocalTime`] pair from the boundary — used
/// when a collaborator (e.g. a reminder fire check) only has the components
/// rather than a full `LocalDateTime`.
pub fn combine(date: LocalDate, time: LocalTime) -> LocalDateTime {
    date.at(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::LocalTime;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> LocalDateTime {
        LocalDate::new(y, m, d).unwrap().at(LocalTime::new(h, mi, 0).unwrap())
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert!(validate_timezone("Not/AZone").is_err());
    }

    #[test]
    fn round_trips_through_a_fixed_offset_zone() {
        let local = dt(2025, 6, 15, 9, 0);
        let utc = to_utc(local, "UTC").unwrap();
        let back = from_utc(utc, "UTC").unwrap();
        assert_eq!(local, back);
    }

    #[test]
    fn spring_forward_gap_resolves_to_the_boundary_after_the_gap() {
        // America/New_York: 2025-03-09 clocks jump from 02:00 to 03:00; any
        // local time inside the gap resolves to 03:00, not to itself shifted
        // forward by the gap's width.
        let gap = dt(2025, 3, 9, 2, 30);
        let resolved = to_utc(gap, "America/New_York").unwrap();
        let back = from_utc(resolved, "America/New_York").unwrap();
        assert_eq!(back, dt(2025, 3, 9, 3, 0));
    }

    #[test]
    fn fall_back_ambiguity_resolves_to_earliest_instant() {
        // America/New_York: 2025-11-02 01:30 occurs twice; earliest is EDT (UTC-4).
        let ambiguous = dt(2025, 11, 2, 1, 30);
        let resolved = to_utc(ambiguous, "America/New_York").unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn unaffected_time_on_a_transition_date_is_unchanged() {
        let unaffected = dt(2025, 3, 9, 10, 0);
        let resolved = to_utc(unaffected, "America/New_York").unwrap();
        let back = from_utc(resolved, "America/New_York").unwrap();
        assert_eq!(back, unaffected);
    }
}
