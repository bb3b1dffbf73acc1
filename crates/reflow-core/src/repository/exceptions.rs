use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{ExceptionVariant, InstanceException, NewInstanceExceptionData};
use crate::repository::SqliteRepository;
use crate::time::{LocalDate, LocalDateTime};

use super::ExceptionRepository;

#[async_trait]
impl ExceptionRepository for SqliteRepository {
    async fn upsert_exception(&self, data: NewInstanceExceptionData) -> Result<InstanceException, CoreError> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT variant FROM instance_exceptions WHERE series_id = ? AND original_date = ?",
        )
        .bind(data.series_id)
        .bind(data.original_date)
        .fetch_optional(self.pool())
        .await?;

        if let Some((variant,)) = &existing {
            if variant == "cancelled" {
                return Err(match &data.variant {
                    ExceptionVariant::Cancelled => CoreError::AlreadyCancelled(format!(
                        "{} on {}",
                        data.series_id, data.original_date
                    )),
                    ExceptionVariant::Rescheduled { .. } => CoreError::CancelledInstance(format!(
                        "{} on {}",
                        data.series_id, data.original_date
                    )),
                });
            }
        }

        let (variant, new_time): (&str, Option<LocalDateTime>) = match &data.variant {
            ExceptionVariant::Cancelled => ("cancelled", None),
            ExceptionVariant::Rescheduled { new_time } => ("rescheduled", Some(*new_time)),
        };

        sqlx::query(
            r#"INSERT INTO instance_exceptions (series_id, original_date, variant, new_time)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (series_id, original_date)
               DO UPDATE SET variant = excluded.variant, new_time = excluded.new_time"#,
        )
        .bind(data.series_id)
        .bind(data.original_date)
        .bind(variant)
        .bind(new_time)
        .execute(self.pool())
        .await?;

        Ok(InstanceException {
            series_id: data.series_id,
            original_date: data.original_date,
            variant: data.variant,
        })
    }

    async fn list_exceptions_in_range(&self, start: LocalDate, end: LocalDate) -> Result<Vec<InstanceException>, CoreError> {
        let rows: Vec<ExceptionRow> = sqlx::query_as(
            r#"SELECT series_id, original_date, variant, new_time FROM instance_exceptions
               WHERE original_date >= ? AND original_date <= ? ORDER BY series_id, original_date"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(ExceptionRow::into_exception).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ExceptionRow {
    series_id: uuid::Uuid,
    original_date: LocalDate,
    variant: String,
    new_time: Option<LocalDateTime>,
}

impl ExceptionRow {
    fn into_exception(self) -> Result<InstanceException, CoreError> {
        let variant = match self.variant.as_str() {
            "cancelled" => ExceptionVariant::Cancelled,
            "rescheduled" => {
                let new_time = self.new_time.ok_or_else(|| {
                    CoreError::InvalidData(format!(
                        "rescheduled exception for {} on {} missing new_time",
                        self.series_id, self.original_date
                    ))
                })?;
                ExceptionVariant::Rescheduled { new_time }
            }
            other => return Err(CoreError::InvalidData(format!("unknown exception variant: {other}"))),
        };
        Ok(InstanceException {
            series_id: self.series_id,
            original_date: self.original_date,
            variant,
        })
    }
}
