//! The persistence adapter (A2): CRUD over every entity in §3, composed into
//! one `Repository` trait the way the teacher composes `TaskRepository +
//! ProjectRepository + ...` (`rusk-core/src/repository/mod.rs`).

pub mod chain_links;
pub mod completions;
pub mod constraints;
pub mod exceptions;
pub mod patterns;
pub mod reminders;
pub mod series;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::CoreError;
use crate::instance::SeriesWithPatterns;
use crate::models::{
    Ack, ChainLink, Completion, Constraint, InstanceException, NewChainLinkData,
    NewCompletionData, NewConstraintData, NewInstanceExceptionData, NewPatternData,
    NewReminderData, NewSeriesData, Pattern, Reminder, Series, UpdateSeriesData,
};
use crate::time::LocalDate;

#[async_trait]
pub trait SeriesRepository {
    async fn create_series(&self, data: NewSeriesData) -> Result<Series, CoreError>;
    async fn find_series_by_id(&self, id: Uuid) -> Result<Option<Series>, CoreError>;
    async fn update_series(&self, id: Uuid, data: UpdateSeriesData) -> Result<Series, CoreError>;
    /// Cascades to patterns, reminders, acks, links-as-child, and instance
    /// exceptions. Fails with `COMPLETIONS_EXIST` or `LINKED_CHILDREN_EXIST`
    /// per §3's destruction rule.
    async fn delete_series(&self, id: Uuid) -> Result<(), CoreError>;
    async fn list_series(&self) -> Result<Vec<Series>, CoreError>;
    /// The tag index (§3), rebuilt from `series_tags` on every call; callers
    /// needing it repeatedly (e.g. one `reflow` invocation) should cache it.
    async fn tag_index(&self) -> Result<HashMap<Uuid, Vec<String>>, CoreError>;
}

#[async_trait]
pub trait PatternRepository {
    async fn add_pattern(&self, data: NewPatternData) -> Result<Pattern, CoreError>;
    async fn remove_pattern(&self, id: Uuid) -> Result<(), CoreError>;
    async fn list_patterns_by_series(&self, series_id: Uuid) -> Result<Vec<Pattern>, CoreError>;
}

#[async_trait]
pub trait ChainLinkRepository {
    /// Rejects a link that would create a cycle (`CYCLE_DETECTED`) or push
    /// the chain past `MAX_CHAIN_DEPTH` (`CHAIN_DEPTH_EXCEEDED`), and a
    /// second parent for a child that already has one (`DUPLICATE_KEY`).
    async fn create_link(&self, data: NewChainLinkData) -> Result<ChainLink, CoreError>;
    async fn remove_link(&self, child_id: Uuid) -> Result<(), CoreError>;
    async fn list_links(&self) -> Result<Vec<ChainLink>, CoreError>;
}

#[async_trait]
pub trait ConstraintRepository {
    async fn add_constraint(&self, data: NewConstraintData) -> Result<Uuid, CoreError>;
    async fn remove_constraint(&self, id: Uuid) -> Result<(), CoreError>;
    async fn list_constraints(&self) -> Result<Vec<Constraint>, CoreError>;
}

#[async_trait]
pub trait ExceptionRepository {
    /// Upsert by `(seriesId, originalDate)` (§3): a `rescheduled` write over
    /// an existing `rescheduled` row replaces `newTime`; over `cancelled` it
    /// is rejected (`CANCELLED_INSTANCE`) — a cancelled instance cannot
    /// subsequently be rescheduled.
    async fn upsert_exception(&self, data: NewInstanceExceptionData) -> Result<InstanceException, CoreError>;
    async fn list_exceptions_in_range(&self, start: LocalDate, end: LocalDate) -> Result<Vec<InstanceException>, CoreError>;
}

#[async_trait]
pub trait CompletionRepository {
    /// Fails with `DUPLICATE_COMPLETION` if `(series_id, instance_date)` is
    /// already logged.
    async fn log_completion(&self, data: NewCompletionData) -> Result<Completion, CoreError>;
    async fn list_completions_for_series(&self, series_id: Uuid) -> Result<Vec<Completion>, CoreError>;
    async fn list_completions_in_window(&self, window_start: LocalDate, lookback_days: u32) -> Result<Vec<Completion>, CoreError>;
}

#[async_trait]
pub trait ReminderRepository {
    async fn add_reminder(&self, data: NewReminderData) -> Result<Reminder, CoreError>;
    async fn remove_reminder(&self, id: Uuid) -> Result<(), CoreError>;
    async fn list_reminders_by_series(&self, series_id: Uuid) -> Result<Vec<Reminder>, CoreError>;
    /// Idempotent: acknowledging the same `(reminder_id, instance_date)`
    /// twice is a no-op after the first (§3).
    async fn ack_reminder(&self, reminder_id: Uuid, instance_date: LocalDate) -> Result<Ack, CoreError>;
    async fn list_acks_for_reminder(&self, reminder_id: Uuid) -> Result<Vec<Ack>, CoreError>;
}

/// The snapshot the reflow core consumes for one `reflow()` call — everything
/// needed to run `generate_instances` through `backtrack_search` without any
/// further I/O (§6.1/§6.2).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub series: Vec<SeriesWithPatterns>,
    pub chain_links: Vec<ChainLink>,
    pub constraints: Vec<Constraint>,
    pub exceptions: Vec<InstanceException>,
    pub completions: Vec<Completion>,
    pub series_tags: HashMap<Uuid, Vec<String>>,
    pub window_start: LocalDate,
    pub window_end: LocalDate,
}

#[async_trait]
pub trait SnapshotRepository {
    /// Hydrates a [`Snapshot`] over `[window_start, window_end]`, resolving
    /// every collaborator the core needs ahead of the synchronous solver call
    /// (§5: "resolved into a snapshot before the solver starts").
    async fn load_snapshot(&self, window_start: LocalDate, window_end: LocalDate) -> Result<Snapshot, CoreError>;
}

/// Composes every domain trait, exactly as the teacher's `Repository` trait
/// composes `TaskRepository + ProjectRepository + ...`.
#[async_trait]
pub trait Repository:
    SeriesRepository
    + PatternRepository
    + ChainLinkRepository
    + ConstraintRepository
    + ExceptionRepository
    + CompletionRepository
    + ReminderRepository
    + SnapshotRepository
{
}

/// SQLite implementation of the repository pattern.
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}

#[async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn load_snapshot(&self, window_start: LocalDate, window_end: LocalDate) -> Result<Snapshot, CoreError> {
        let all_series = self.list_series().await?;
        let mut series = Vec::with_capacity(all_series.len());
        for s in all_series {
            let patterns = self.list_patterns_by_series(s.id).await?;
            series.push(SeriesWithPatterns { series: s, patterns });
        }

        // A trailing lookback covers completionCount conditions that look
        // back from a date inside the window (§4.1) without requiring the
        // caller to widen the window itself.
        const CONDITION_LOOKBACK_DAYS: u32 = 366;

        Ok(Snapshot {
            series,
            chain_links: self.list_links().await?,
            constraints: self.list_constraints().await?,
            exceptions: self.list_exceptions_in_range(window_start, window_end).await?,
            completions: self.list_completions_in_window(window_start, CONDITION_LOOKBACK_DAYS).await?,
            series_tags: self.tag_index().await?,
            window_start,
            window_end,
        })
    }
}

/// Decodes a `#[sqlx(skip)]`-style JSON column shared by several repository
/// modules (pattern kind/condition, series cycling).
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(raw: Option<&str>, what: &str) -> Result<Option<T>, CoreError> {
    match raw {
        None => Ok(None),
        Some(s) => serde_json::from_str(s)
            .map(Some)
            .map_err(|e| CoreError::InvalidData(format!("malformed {what} JSON: {e}"))),
    }
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("in-memory domain types always serialize")
}
