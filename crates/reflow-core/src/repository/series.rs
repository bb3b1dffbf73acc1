use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{NewSeriesData, Series, UpdateSeriesData};
use crate::repository::{decode_json, encode_json, SqliteRepository};

use super::SeriesRepository;

#[async_trait]
impl SeriesRepository for SqliteRepository {
    async fn create_series(&self, data: NewSeriesData) -> Result<Series, CoreError> {
        let series = Series {
            id: Uuid::now_v7(),
            title: data.title,
            start_date: data.start_date,
            end_date: data.end_date,
            locked: false,
            tags: data.tags,
            cycling: data.cycling,
        };
        series.validate_date_range().map_err(CoreError::Validation)?;

        let mut tx = self.pool().begin().await?;

        let cycling_json = series.cycling.as_ref().map(encode_json);
        sqlx::query(
            "INSERT INTO series (id, title, start_date, end_date, locked, cycling_json) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(series.id)
        .bind(&series.title)
        .bind(series.start_date)
        .bind(series.end_date)
        .bind(series.locked)
        .bind(cycling_json)
        .execute(&mut *tx)
        .await?;

        for tag in &series.tags {
            sqlx::query("INSERT INTO series_tags (series_id, tag) VALUES (?, ?)")
                .bind(series.id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(series)
    }

    async fn find_series_by_id(&self, id: Uuid) -> Result<Option<Series>, CoreError> {
        let row: Option<SeriesRow> = sqlx::query_as(
            "SELECT id, title, start_date, end_date, locked, cycling_json FROM series WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else { return Ok(None) };
        let tags = self.list_tags(id).await?;
        Ok(Some(row.into_series(tags)?))
    }

    async fn update_series(&self, id: Uuid, data: UpdateSeriesData) -> Result<Series, CoreError> {
        let mut tx = self.pool().begin().await?;

        let current: Option<SeriesRow> = sqlx::query_as(
            "SELECT id, title, start_date, end_date, locked, cycling_json FROM series WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let current = current.ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if current.locked && data.locked != Some(false) {
            return Err(CoreError::LockedSeries(id.to_string()));
        }

        let title = data.title.unwrap_or(current.title);
        let start_date = data.start_date.unwrap_or(current.start_date);
        let end_date = data.end_date.unwrap_or(current.end_date);
        let locked = data.locked.unwrap_or(current.locked);
        let cycling = match data.cycling {
            Some(new_cycling) => new_cycling,
            None => decode_json(current.cycling_json.as_deref(), "series.cycling")?,
        };

        if let (Some(s), Some(e)) = (start_date, end_date) {
            if s >= e {
                return Err(CoreError::Validation(format!(
                    "series {id}: start_date {s} must be strictly before end_date {e}"
                )));
            }
        }

        let cycling_json = cycling.as_ref().map(encode_json);
        sqlx::query(
            "UPDATE series SET title = ?, start_date = ?, end_date = ?, locked = ?, cycling_json = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(start_date)
        .bind(end_date)
        .bind(locked)
        .bind(&cycling_json)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(to_add) = &data.add_tags {
            for tag in to_add {
                sqlx::query("INSERT OR IGNORE INTO series_tags (series_id, tag) VALUES (?, ?)")
                    .bind(id)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        if let Some(to_remove) = &data.remove_tags {
            for tag in to_remove {
                sqlx::query("DELETE FROM series_tags WHERE series_id = ? AND tag = ?")
                    .bind(id)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        let tags = self.list_tags(id).await?;
        Ok(Series { id, title, start_date, end_date, locked, tags, cycling })
    }

    async fn delete_series(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM series WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::NotFound(id.to_string()));
        }

        let completion_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM completions WHERE series_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if completion_count.0 > 0 {
            return Err(CoreError::CompletionsExist(id.to_string()));
        }

        let child_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chain_links WHERE parent_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if child_count.0 > 0 {
            return Err(CoreError::LinkedChildrenExist(id.to_string()));
        }

        // Cascades: patterns, reminders (acks cascade via FK from reminders),
        // links-as-child, instance exceptions, tags (§3 destruction rule).
        sqlx::query("DELETE FROM patterns WHERE series_id = ?").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM reminders WHERE series_id = ?").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM chain_links WHERE child_id = ?").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM instance_exceptions WHERE series_id = ?").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM series_tags WHERE series_id = ?").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM series WHERE id = ?").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_series(&self) -> Result<Vec<Series>, CoreError> {
        let rows: Vec<SeriesRow> = sqlx::query_as(
            "SELECT id, title, start_date, end_date, locked, cycling_json FROM series ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let tags = self.list_tags(row.id).await?;
            out.push(row.into_series(tags)?);
        }
        Ok(out)
    }

    async fn tag_index(&self) -> Result<HashMap<Uuid, Vec<String>>, CoreError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT series_id, tag FROM series_tags")
            .fetch_all(self.pool())
            .await?;
        let mut index: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (series_id, tag) in rows {
            index.entry(series_id).or_default().push(tag);
        }
        Ok(index)
    }
}

impl SqliteRepository {
    async fn list_tags(&self, series_id: Uuid) -> Result<Vec<String>, CoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT tag FROM series_tags WHERE series_id = ? ORDER BY tag")
            .bind(series_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SeriesRow {
    id: Uuid,
    title: String,
    start_date: Option<crate::time::LocalDate>,
    end_date: Option<crate::time::LocalDate>,
    locked: bool,
    cycling_json: Option<String>,
}

impl SeriesRow {
    fn into_series(self, tags: Vec<String>) -> Result<Series, CoreError> {
        let cycling = decode_json(self.cycling_json.as_deref(), "series.cycling")?;
        Ok(Series {
            id: self.id,
            title: self.title,
            start_date: self.start_date,
            end_date: self.end_date,
            locked: self.locked,
            tags,
            cycling,
        })
    }
}
