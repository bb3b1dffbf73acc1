//! Pattern expansion and condition evaluation (C2).

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::models::{Comparison, Completion, Condition, Pattern, PatternKind, Series, SeriesRef};
use crate::time::LocalDate;

/// A closed date range `[start, end]`, both inclusive.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: LocalDate,
    pub end: LocalDate,
}

/// Expands `pattern` bounded by `range` and the owning series' start/end,
/// returning a sorted, deduplicated set of dates satisfying the pattern's
/// calendar predicate and its condition tree, if any (§4.1).
pub fn expand(
    pattern: &Pattern,
    series: &Series,
    range: DateRange,
    completions: &[Completion],
) -> Vec<LocalDate> {
    let effective_start = match series.start_date {
        Some(s) if s > range.start => s,
        _ => range.start,
    };
    let effective_end = match series.end_date {
        // end_date is exclusive: the last valid date is end_date - 1 day.
        Some(e) => {
            let last = e.pred();
            if last < range.end { last } else { range.end }
        }
        None => range.end,
    };

    if effective_start > effective_end {
        return Vec::new();
    }

    let mut dates = Vec::new();
    let mut cursor = effective_start;
    loop {
        if matches_calendar(&pattern.kind, cursor) {
            let satisfied = match &pattern.condition {
                Some(cond) => evaluate_condition(cond, series.id, cursor, completions),
                None => true,
            };
            if satisfied {
                dates.push(cursor);
            }
        }
        if cursor >= effective_end {
            break;
        }
        cursor = cursor.succ();
    }
    dates
}

fn matches_calendar(kind: &PatternKind, date: LocalDate) -> bool {
    match kind {
        PatternKind::Daily => true,
        PatternKind::Weekly { days_of_week } => days_of_week.contains(&date.day_of_week_sun0()),
        PatternKind::Monthly { day_of_month } => {
            date.day() == effective_day_of_month(date, *day_of_month)
        }
        PatternKind::Yearly { month, day } => {
            date.month() == *month && date.day() == effective_day_of_month_in_month(date, *month, *day)
        }
    }
}

/// Clamps a target day-of-month to the last day of the given month, so a
/// "31st of every month" pattern still fires in February.
fn effective_day_of_month(date: LocalDate, target_day: u32) -> u32 {
    let days_in_month = days_in_month(date.year(), date.month());
    target_day.min(days_in_month)
}

fn effective_day_of_month_in_month(date: LocalDate, month: u32, target_day: u32) -> u32 {
    let days_in_month = days_in_month(date.year(), month);
    target_day.min(days_in_month)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let is_leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => if is_leap { 29 } else { 28 },
        _ => 30,
    }
}

/// Evaluates a condition tree for a single candidate date. `self_series` is
/// the series owning the pattern currently being expanded, used to resolve
/// `SeriesRef::SelfSeries`.
pub fn evaluate_condition(
    condition: &Condition,
    self_series: Uuid,
    date: LocalDate,
    completions: &[Completion],
) -> bool {
    match condition {
        Condition::And(children) => children.iter().all(|c| evaluate_condition(c, self_series, date, completions)),
        Condition::Or(children) => children.iter().any(|c| evaluate_condition(c, self_series, date, completions)),
        Condition::Not(inner) => !evaluate_condition(inner, self_series, date, completions),
        Condition::Weekday(days) => days.contains(&date.day_of_week_sun0()),
        Condition::CompletionCount { series_ref, comparison, value, window_days } => {
            let target = match series_ref {
                SeriesRef::SelfSeries => self_series,
                SeriesRef::Other(id) => *id,
            };
            let window_start = date.add_days(-(*window_days as i64));
            let count = completions
                .iter()
                .filter(|c| c.series_id == target)
                .filter(|c| c.instance_date > window_start && c.instance_date <= date)
                .count() as i64;
            comparison.apply(count, *value)
        }
    }
}

/// All weekday labels, 0=Sun..6=Sat.
pub fn all_weekdays() -> BTreeSet<u8> {
    (0..=6).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> LocalDate {
        LocalDate::new(y, m, d).unwrap()
    }

    fn series(id: Uuid, start: Option<LocalDate>, end: Option<LocalDate>) -> Series {
        Series {
            id,
            title: "t".into(),
            start_date: start,
            end_date: end,
            locked: false,
            tags: vec![],
            cycling: None,
        }
    }

    fn daily_pattern(series_id: Uuid) -> Pattern {
        Pattern {
            id: Uuid::new_v4(),
            series_id,
            kind: PatternKind::Daily,
            time: None,
            duration_minutes: 30,
            fixed: false,
            all_day: false,
            time_window: None,
            days_before: 0,
            days_after: 0,
            condition: None,
            adaptive_duration: false,
        }
    }

    #[test]
    fn daily_expands_every_day_in_range() {
        let sid = Uuid::new_v4();
        let s = series(sid, None, None);
        let p = daily_pattern(sid);
        let range = DateRange { start: date(2025, 1, 1), end: date(2025, 1, 5) };
        let dates = expand(&p, &s, range, &[]);
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[0], date(2025, 1, 1));
        assert_eq!(dates[4], date(2025, 1, 5));
    }

    #[test]
    fn end_date_is_exclusive() {
        let sid = Uuid::new_v4();
        // end_date == start_date + 1 day => exactly one instance (the start date).
        let s = series(sid, Some(date(2025, 1, 1)), Some(date(2025, 1, 2)));
        let p = daily_pattern(sid);
        let range = DateRange { start: date(2025, 1, 1), end: date(2025, 1, 31) };
        let dates = expand(&p, &s, range, &[]);
        assert_eq!(dates, vec![date(2025, 1, 1)]);
    }

    #[test]
    fn weekly_restricts_to_days_of_week() {
        let sid = Uuid::new_v4();
        let s = series(sid, None, None);
        let mut p = daily_pattern(sid);
        // 2025-01-19 is Sunday (0), 2025-01-20 is Monday (1).
        p.kind = PatternKind::Weekly { days_of_week: [1].into_iter().collect() };
        let range = DateRange { start: date(2025, 1, 19), end: date(2025, 1, 26) };
        let dates = expand(&p, &s, range, &[]);
        assert_eq!(dates, vec![date(2025, 1, 20)]);
    }

    #[test]
    fn monthly_clamps_to_last_day_of_short_month() {
        let sid = Uuid::new_v4();
        let s = series(sid, None, None);
        let mut p = daily_pattern(sid);
        p.kind = PatternKind::Monthly { day_of_month: 31 };
        let range = DateRange { start: date(2025, 2, 1), end: date(2025, 2, 28) };
        let dates = expand(&p, &s, range, &[]);
        assert_eq!(dates, vec![date(2025, 2, 28)]);
    }

    #[rstest]
    #[case(0, true)]
    #[case(2, false)]
    fn completion_count_condition(#[case] completions_logged: usize, #[case] expect_fire: bool) {
        let sid = Uuid::new_v4();
        let s = series(sid, None, None);
        let mut p = daily_pattern(sid);
        // Fire only if fewer than 2 completions logged in the trailing 7 days.
        p.condition = Some(Condition::CompletionCount {
            series_ref: SeriesRef::SelfSeries,
            comparison: Comparison::Lt,
            value: 2,
            window_days: 7,
        });
        let completions: Vec<Completion> = (0..completions_logged)
            .map(|i| Completion {
                series_id: sid,
                instance_date: date(2025, 1, 10 + i as u32),
                start_time: None,
                end_time: None,
            })
            .collect();
        let range = DateRange { start: date(2025, 1, 15), end: date(2025, 1, 15) };
        let dates = expand(&p, &s, range, &completions);
        assert_eq!(!dates.is_empty(), expect_fire);
    }

    #[test]
    fn not_and_or_short_circuit_as_usual() {
        let sid = Uuid::new_v4();
        let cond = Condition::And(vec![
            Condition::Not(Box::new(Condition::Weekday([0].into_iter().collect()))),
            Condition::Or(vec![Condition::Weekday([1].into_iter().collect())]),
        ]);
        // 2025-01-20 is Monday (1): not-Sunday is true, or-Monday is true => true.
        assert!(evaluate_condition(&cond, sid, date(2025, 1, 20), &[]));
        // 2025-01-19 is Sunday (0): not-Sunday is false => whole And is false.
        assert!(!evaluate_condition(&cond, sid, date(2025, 1, 19), &[]));
    }
}
