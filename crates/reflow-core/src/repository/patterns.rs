use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{NewPatternData, Pattern};
use crate::repository::{decode_json, encode_json, SqliteRepository};
use crate::time::LocalTime;

use super::PatternRepository;

#[async_trait]
impl PatternRepository for SqliteRepository {
    async fn add_pattern(&self, data: NewPatternData) -> Result<Pattern, CoreError> {
        let pattern = Pattern {
            id: Uuid::now_v7(),
            series_id: data.series_id,
            kind: data.kind,
            time: data.time,
            duration_minutes: data.duration_minutes,
            fixed: data.fixed,
            all_day: data.all_day,
            time_window: data.time_window,
            days_before: data.days_before,
            days_after: data.days_after,
            condition: data.condition,
            adaptive_duration: data.adaptive_duration,
        };

        let kind_json = encode_json(&pattern.kind);
        let condition_json = pattern.condition.as_ref().map(encode_json);
        let (win_start, win_end) = pattern
            .time_window
            .map(|(s, e)| (Some(s), Some(e)))
            .unwrap_or((None, None));

        sqlx::query(
            r#"INSERT INTO patterns
               (id, series_id, kind_json, time, duration_minutes, fixed, all_day,
                time_window_start, time_window_end, days_before, days_after,
                condition_json, adaptive_duration)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(pattern.id)
        .bind(pattern.series_id)
        .bind(&kind_json)
        .bind(pattern.time)
        .bind(pattern.duration_minutes)
        .bind(pattern.fixed)
        .bind(pattern.all_day)
        .bind(win_start)
        .bind(win_end)
        .bind(pattern.days_before)
        .bind(pattern.days_after)
        .bind(&condition_json)
        .bind(pattern.adaptive_duration)
        .execute(self.pool())
        .await?;

        Ok(pattern)
    }

    async fn remove_pattern(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM patterns WHERE id = ?").bind(id).execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_patterns_by_series(&self, series_id: Uuid) -> Result<Vec<Pattern>, CoreError> {
        let rows: Vec<PatternRow> = sqlx::query_as(
            r#"SELECT id, series_id, kind_json, time, duration_minutes, fixed, all_day,
                      time_window_start, time_window_end, days_before, days_after,
                      condition_json, adaptive_duration
               FROM patterns WHERE series_id = ? ORDER BY id"#,
        )
        .bind(series_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(PatternRow::into_pattern).collect()
    }
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    id: Uuid,
    series_id: Uuid,
    kind_json: String,
    time: Option<LocalTime>,
    duration_minutes: i64,
    fixed: bool,
    all_day: bool,
    time_window_start: Option<LocalTime>,
    time_window_end: Option<LocalTime>,
    days_before: i64,
    days_after: i64,
    condition_json: Option<String>,
    adaptive_duration: bool,
}

impl PatternRow {
    fn into_pattern(self) -> Result<Pattern, CoreError> {
        let kind = decode_json(Some(self.kind_json.as_str()), "pattern.kind")?
            .ok_or_else(|| CoreError::InvalidData("pattern row missing kind_json".into()))?;
        let condition = decode_json(self.condition_json.as_deref(), "pattern.condition")?;
        let time_window = match (self.time_window_start, self.time_window_end) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        };
        Ok(Pattern {
            id: self.id,
            series_id: self.series_id,
            kind,
            time: self.time,
            duration_minutes: self.duration_minutes,
            fixed: self.fixed,
            all_day: self.all_day,
            time_window,
            days_before: self.days_before as u32,
            days_after: self.days_after as u32,
            condition,
            adaptive_duration: self.adaptive_duration,
        })
    }
}
