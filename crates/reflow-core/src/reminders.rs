//! Reminder fire-time computation (§3 Reminder, §8 boundary behaviors).
//!
//! The crate does not run a background scheduler (SPEC_FULL.md Non-goals);
//! this module only supplies the pure function a façade/CLI poller would
//! call to decide whether a reminder is due, grounded on the same
//! zone-less-arithmetic style as [`crate::chain::derive_child_time`].

use crate::models::Reminder;
use crate::time::{LocalDateTime, LocalTimeConst, Minutes};

/// Whether `instance.allDay` matters: an all-day instance has no wall-clock
/// time of its own, so its fire time is always midnight some number of whole
/// days earlier rather than an offset from a clock time.
pub fn fire_time(reminder: &Reminder, instance_time: LocalDateTime, all_day: bool) -> LocalDateTime {
    if all_day {
        let days_before = reminder.minutes_before / 1440;
        let midnight = crate::time::LocalTime::from_const(LocalTimeConst(0, 0, 0));
        instance_time.date().add_days(-days_before).at(midnight)
    } else {
        instance_time.add_minutes(-reminder.minutes_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{LocalDate, LocalTime};
    use uuid::Uuid;

    fn reminder(minutes_before: Minutes) -> Reminder {
        Reminder { id: Uuid::now_v7(), series_id: Uuid::now_v7(), minutes_before }
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> LocalDateTime {
        LocalDate::new(y, m, d).unwrap().at(LocalTime::new(h, mi, 0).unwrap())
    }

    #[test]
    fn zero_minutes_before_fires_at_instance_time() {
        let instance = dt(2025, 1, 15, 9, 0);
        assert_eq!(fire_time(&reminder(0), instance, false), instance);
    }

    #[test]
    fn non_zero_minutes_before_subtracts_from_instance_time() {
        let instance = dt(2025, 1, 15, 9, 0);
        assert_eq!(fire_time(&reminder(30), instance, false), dt(2025, 1, 15, 8, 30));
    }

    #[test]
    fn all_day_1440_fires_at_midnight_previous_day() {
        let instance = dt(2025, 1, 15, 0, 0);
        assert_eq!(fire_time(&reminder(1440), instance, true), dt(2025, 1, 14, 0, 0));
    }

    #[test]
    fn all_day_2880_fires_two_days_before_midnight() {
        let instance = dt(2025, 1, 15, 0, 0);
        assert_eq!(fire_time(&reminder(2880), instance, true), dt(2025, 1, 13, 0, 0));
    }

    #[test]
    fn all_day_zero_minutes_before_fires_at_midnight_of_the_instance_date() {
        let instance = dt(2025, 1, 15, 0, 0);
        assert_eq!(fire_time(&reminder(0), instance, true), dt(2025, 1, 15, 0, 0));
    }
}
