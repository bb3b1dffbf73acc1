use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Completion, NewCompletionData};
use crate::repository::SqliteRepository;
use crate::time::LocalDate;

use super::CompletionRepository;

#[async_trait]
impl CompletionRepository for SqliteRepository {
    async fn log_completion(&self, data: NewCompletionData) -> Result<Completion, CoreError> {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT series_id FROM completions WHERE series_id = ? AND instance_date = ?",
        )
        .bind(data.series_id)
        .bind(data.instance_date)
        .fetch_optional(self.pool())
        .await?;
        if existing.is_some() {
            return Err(CoreError::DuplicateCompletion(format!(
                "{} on {}",
                data.series_id, data.instance_date
            )));
        }

        sqlx::query(
            "INSERT INTO completions (series_id, instance_date, start_time, end_time) VALUES (?, ?, ?, ?)",
        )
        .bind(data.series_id)
        .bind(data.instance_date)
        .bind(data.start_time)
        .bind(data.end_time)
        .execute(self.pool())
        .await?;

        Ok(Completion {
            series_id: data.series_id,
            instance_date: data.instance_date,
            start_time: data.start_time,
            end_time: data.end_time,
        })
    }

    async fn list_completions_for_series(&self, series_id: Uuid) -> Result<Vec<Completion>, CoreError> {
        let rows = sqlx::query_as(
            "SELECT series_id, instance_date, start_time, end_time FROM completions WHERE series_id = ? ORDER BY instance_date",
        )
        .bind(series_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn list_completions_in_window(&self, window_start: LocalDate, lookback_days: u32) -> Result<Vec<Completion>, CoreError> {
        let floor = window_start.add_days(-(lookback_days as i64));
        let rows = sqlx::query_as(
            "SELECT series_id, instance_date, start_time, end_time FROM completions WHERE instance_date >= ? ORDER BY instance_date",
        )
        .bind(floor)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
