//! Candidate instance generation (C3).
//!
//! An [`Instance`] is derived, in-memory only; it is never persisted. It
//! represents one concrete `(series, date)` occurrence produced by expanding
//! a series' patterns and applying exceptions/cycling/chain metadata.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{ChainLink, Completion, ExceptionVariant, InstanceException, Pattern, Series};
use crate::pattern::{expand, DateRange};
use crate::time::{LocalDate, LocalDateTime, LocalTime, Minutes};

/// Identifies an [`Instance`] uniquely within one `generate_instances` call.
/// A series may have more than one pattern fire on the same date, so the
/// key includes the originating pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub series_id: Uuid,
    pub pattern_id: Uuid,
    pub date: LocalDate,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub key: InstanceKey,
    pub ideal_time: LocalDateTime,
    pub duration: Minutes,
    pub fixed: bool,
    pub all_day: bool,
    pub time_window: Option<(LocalTime, LocalTime)>,
    pub days_before: u32,
    pub days_after: u32,
    pub parent_id: Option<Uuid>,
    pub chain_distance: Option<Minutes>,
    pub early_wobble: Option<Minutes>,
    pub late_wobble: Option<Minutes>,
    pub title: Option<String>,
}

impl Instance {
    pub fn series_id(&self) -> Uuid {
        self.key.series_id
    }

    pub fn date(&self) -> LocalDate {
        self.key.date
    }

    /// A chain-child instance has both `parent_id` and `chain_distance`; its
    /// time is derived, not domain-selected (§3 invariant).
    pub fn is_chain_child(&self) -> bool {
        self.parent_id.is_some() && self.chain_distance.is_some()
    }
}

/// One series together with the patterns attached to it, as read from the
/// adapter for a single `generate_instances` call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SeriesWithPatterns {
    pub series: Series,
    pub patterns: Vec<Pattern>,
}

/// Everything `generate_instances` needs out of the snapshot.
#[derive(Debug, Clone)]
pub struct GenerationInput<'a> {
    pub series: &'a [SeriesWithPatterns],
    pub chain_links: &'a [ChainLink],
    pub exceptions: &'a [InstanceException],
    pub completions: &'a [Completion],
    pub window_start: LocalDate,
    pub window_end: LocalDate,
}

const DEFAULT_FLEXIBLE_TIME: (u32, u32, u32) = (9, 0, 0);
const ALL_DAY_TIME: (u32, u32, u32) = (0, 0, 0);

/// Produces the flat candidate instance list for a window (§4.2).
///
/// Determinism: for a byte-identical snapshot this returns instances in a
/// stable order (by `series_id`, then `pattern_id`, then `date`) so that
/// downstream components, which sort by their own role, still observe a
/// deterministic tie-break.
pub fn generate_instances(input: &GenerationInput<'_>) -> Vec<Instance> {
    let exceptions_by_key: HashMap<(Uuid, LocalDate), &InstanceException> = input
        .exceptions
        .iter()
        .map(|e| ((e.series_id, e.original_date), e))
        .collect();

    let links_by_child: HashMap<Uuid, &ChainLink> =
        input.chain_links.iter().map(|l| (l.child_id, l)).collect();

    let range = DateRange { start: input.window_start, end: input.window_end };

    let mut instances = Vec::new();

    for sp in input.series {
        let chain_link = links_by_child.get(&sp.series.id).copied();
        // Completions of this series, used both for adaptive-duration
        // aggregation and for advancing the cycling base index.
        let series_completions: Vec<&Completion> =
            input.completions.iter().filter(|c| c.series_id == sp.series.id).collect();

        for pattern in &sp.patterns {
            let dates = expand(pattern, &sp.series, range, input.completions);

            for (sequence_index, date) in dates.iter().enumerate() {
                let date = *date;
                let exception = exceptions_by_key.get(&(sp.series.id, date));

                if let Some(exc) = exception {
                    if exc.variant == ExceptionVariant::Cancelled {
                        continue;
                    }
                }

                let ideal_time = match exception.map(|e| &e.variant) {
                    Some(ExceptionVariant::Rescheduled { new_time }) => *new_time,
                    _ => {
                        let time = if pattern.all_day {
                            LocalTime::new(ALL_DAY_TIME.0, ALL_DAY_TIME.1, ALL_DAY_TIME.2).unwrap()
                        } else {
                            pattern.time.unwrap_or_else(|| {
                                LocalTime::new(DEFAULT_FLEXIBLE_TIME.0, DEFAULT_FLEXIBLE_TIME.1, DEFAULT_FLEXIBLE_TIME.2)
                                    .unwrap()
                            })
                        };
                        date.at(time)
                    }
                };

                let duration = if pattern.adaptive_duration && !series_completions.is_empty() {
                    adaptive_duration(&series_completions)
                } else {
                    pattern.duration_minutes
                };

                let title = sp.series.cycling.as_ref().and_then(|cycling| {
                    let base_index = series_completions.len() as u64;
                    cycling.title_for(base_index, sequence_index as u64).map(str::to_string)
                });

                instances.push(Instance {
                    key: InstanceKey { series_id: sp.series.id, pattern_id: pattern.id, date },
                    ideal_time,
                    duration,
                    fixed: pattern.fixed,
                    all_day: pattern.all_day,
                    time_window: pattern.time_window,
                    days_before: pattern.days_before,
                    days_after: pattern.days_after,
                    parent_id: chain_link.map(|l| l.parent_id),
                    chain_distance: chain_link.map(|l| l.distance_minutes),
                    early_wobble: chain_link.map(|l| l.early_wobble_minutes),
                    late_wobble: chain_link.map(|l| l.late_wobble_minutes),
                    title,
                });
            }
        }
    }

    instances.sort_by(|a, b| a.key.cmp(&b.key));
    instances
}

/// Stable average of logged durations (`endTime - startTime` where both are
/// present), rounded to the nearest minute. Computed once per
/// `generate_instances` call and shared across every instance of the series
/// within that call, so repeated calls on the same snapshot are identical.
fn adaptive_duration(completions: &[&Completion]) -> Minutes {
    let durations: Vec<Minutes> = completions
        .iter()
        .filter_map(|c| match (c.start_time, c.end_time) {
            (Some(s), Some(e)) => Some(e.diff_minutes(&s)),
            _ => None,
        })
        .filter(|d| *d > 0)
        .collect();

    if durations.is_empty() {
        return 30;
    }
    let total: Minutes = durations.iter().sum();
    total / durations.len() as Minutes
}
