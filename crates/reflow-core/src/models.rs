//! Persisted entity shapes and their data-transfer objects.
//!
//! These are the snapshot-level types the adapter (A2) reads and writes.
//! The in-memory, generation-only [`crate::instance::Instance`] type is kept
//! separate (§3: "Instance (candidate, in-memory only)").

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::time::{LocalDate, LocalDateTime, LocalTime, Minutes};

/// A recurring event definition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Series {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub title: String,
    pub start_date: Option<LocalDate>,
    /// Exclusive: the last valid instance date is `end_date - 1 day`.
    pub end_date: Option<LocalDate>,
    pub locked: bool,
    #[sqlx(skip)]
    pub tags: Vec<String>,
    #[sqlx(skip)]
    pub cycling: Option<CyclingConfig>,
}

impl Series {
    /// `startDate < endDate`, zero-day rejected (validation boundary, §3).
    pub fn validate_date_range(&self) -> Result<(), String> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start >= end => {
                Err(format!("series {}: start_date {} must be strictly before end_date {}", self.id, start, end))
            }
            _ => Ok(()),
        }
    }
}

/// Rotates a label across fires of a pattern; `base_index` advances by one
/// per logged completion of the owning series (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclingConfig {
    pub items: Vec<String>,
}

impl CyclingConfig {
    pub fn title_for(&self, base_index: u64, sequence_index: u64) -> Option<&str> {
        if self.items.is_empty() {
            return None;
        }
        let idx = (base_index + sequence_index) % self.items.len() as u64;
        self.items.get(idx as usize).map(String::as_str)
    }
}

/// One recurrence rule attached to a series.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pattern {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub series_id: Uuid,
    #[sqlx(skip)]
    pub kind: PatternKind,
    pub time: Option<LocalTime>,
    pub duration_minutes: Minutes,
    pub fixed: bool,
    pub all_day: bool,
    pub time_window: Option<(LocalTime, LocalTime)>,
    pub days_before: u32,
    pub days_after: u32,
    #[sqlx(skip)]
    pub condition: Option<Condition>,
    pub adaptive_duration: bool,
}

/// Calendar predicate families. A closed, hand-rolled enum rather than a
/// general RFC 5545 grammar — see SPEC_FULL.md §4.1 for why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PatternKind {
    Daily,
    Weekly { days_of_week: BTreeSet<u8> },
    Monthly { day_of_month: u32 },
    Yearly { month: u32, day: u32 },
}

impl Default for PatternKind {
    /// Only used so `#[sqlx(skip)]` has a placeholder to construct before the
    /// repository layer overwrites it with the value decoded from `kind_json`.
    fn default() -> Self {
        PatternKind::Daily
    }
}

/// A recursive condition tree evaluated per candidate date (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Weekday(BTreeSet<u8>),
    CompletionCount {
        series_ref: SeriesRef,
        comparison: Comparison,
        value: i64,
        window_days: u32,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeriesRef {
    SelfSeries,
    Other(Uuid),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparison {
    pub fn apply(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Eq => lhs == rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Gt => lhs > rhs,
        }
    }
}

/// `{parentId, childId, distance, earlyWobble, lateWobble}` (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct ChainLink {
    #[serde(with = "uuid::serde::compact")]
    pub parent_id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub child_id: Uuid,
    pub distance_minutes: Minutes,
    pub early_wobble_minutes: Minutes,
    pub late_wobble_minutes: Minutes,
}

/// Either a specific series or every series bearing a tag; resolved to
/// concrete series ids at generation time via the tag index (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConstraintTarget {
    Series(Uuid),
    Tag(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constraint {
    NoOverlap { a: ConstraintTarget, b: ConstraintTarget },
    MustBeBefore { first: ConstraintTarget, second: ConstraintTarget },
    Chain { parent: ConstraintTarget, child: ConstraintTarget },
}

/// `{seriesId, instanceDate, startTime?, endTime?}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Completion {
    #[serde(with = "uuid::serde::compact")]
    pub series_id: Uuid,
    pub instance_date: LocalDate,
    pub start_time: Option<LocalDateTime>,
    pub end_time: Option<LocalDateTime>,
}

/// Keyed by `(seriesId, originalDate)`; upsert semantics on write (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExceptionVariant {
    Cancelled,
    Rescheduled { new_time: LocalDateTime },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceException {
    #[serde(with = "uuid::serde::compact")]
    pub series_id: Uuid,
    pub original_date: LocalDate,
    pub variant: ExceptionVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub series_id: Uuid,
    pub minutes_before: Minutes,
}

/// Keyed by `(reminderId, instanceDate)`. Acknowledging twice is a no-op
/// after the first.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ack {
    #[serde(with = "uuid::serde::compact")]
    pub reminder_id: Uuid,
    pub instance_date: LocalDate,
}

// ============================================================================
// Data transfer objects
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NewSeriesData {
    pub title: String,
    pub start_date: Option<LocalDate>,
    pub end_date: Option<LocalDate>,
    pub tags: Vec<String>,
    pub cycling: Option<CyclingConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSeriesData {
    pub title: Option<String>,
    pub start_date: Option<Option<LocalDate>>,
    pub end_date: Option<Option<LocalDate>>,
    pub locked: Option<bool>,
    pub add_tags: Option<Vec<String>>,
    pub remove_tags: Option<Vec<String>>,
    pub cycling: Option<Option<CyclingConfig>>,
}

#[derive(Debug, Clone)]
pub struct NewPatternData {
    pub series_id: Uuid,
    pub kind: PatternKind,
    pub time: Option<LocalTime>,
    pub duration_minutes: Minutes,
    pub fixed: bool,
    pub all_day: bool,
    pub time_window: Option<(LocalTime, LocalTime)>,
    pub days_before: u32,
    pub days_after: u32,
    pub condition: Option<Condition>,
    pub adaptive_duration: bool,
}

#[derive(Debug, Clone)]
pub struct NewChainLinkData {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub distance_minutes: Minutes,
    pub early_wobble_minutes: Minutes,
    pub late_wobble_minutes: Minutes,
}

#[derive(Debug, Clone)]
pub struct NewConstraintData {
    pub constraint: Constraint,
}

#[derive(Debug, Clone)]
pub struct NewCompletionData {
    pub series_id: Uuid,
    pub instance_date: LocalDate,
    pub start_time: Option<LocalDateTime>,
    pub end_time: Option<LocalDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewInstanceExceptionData {
    pub series_id: Uuid,
    pub original_date: LocalDate,
    pub variant: ExceptionVariant,
}

#[derive(Debug, Clone)]
pub struct NewReminderData {
    pub series_id: Uuid,
    pub minutes_before: Minutes,
}

/// The implementation limit on chain depth (§3).
pub const MAX_CHAIN_DEPTH: u32 = 32;

#[derive(Error, Debug, PartialEq)]
#[error("invalid comparison operator: {0}")]
pub struct ParseComparisonError(String);

impl FromStr for Comparison {
    type Err = ParseComparisonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" | "lt" => Ok(Comparison::Lt),
            "<=" | "le" => Ok(Comparison::Le),
            "==" | "eq" => Ok(Comparison::Eq),
            ">=" | "ge" => Ok(Comparison::Ge),
            ">" | "gt" => Ok(Comparison::Gt),
            _ => Err(ParseComparisonError(s.to_string())),
        }
    }
}
