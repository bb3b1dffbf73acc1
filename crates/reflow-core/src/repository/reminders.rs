use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Ack, NewReminderData, Reminder};
use crate::repository::SqliteRepository;
use crate::time::LocalDate;

use super::ReminderRepository;

#[async_trait]
impl ReminderRepository for SqliteRepository {
    async fn add_reminder(&self, data: NewReminderData) -> Result<Reminder, CoreError> {
        let reminder = Reminder {
            id: Uuid::now_v7(),
            series_id: data.series_id,
            minutes_before: data.minutes_before,
        };

        sqlx::query("INSERT INTO reminders (id, series_id, minutes_before) VALUES (?, ?, ?)")
            .bind(reminder.id)
            .bind(reminder.series_id)
            .bind(reminder.minutes_before)
            .execute(self.pool())
            .await?;

        Ok(reminder)
    }

    async fn remove_reminder(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ?").bind(id).execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_reminders_by_series(&self, series_id: Uuid) -> Result<Vec<Reminder>, CoreError> {
        let rows = sqlx::query_as(
            "SELECT id, series_id, minutes_before FROM reminders WHERE series_id = ? ORDER BY id",
        )
        .bind(series_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn ack_reminder(&self, reminder_id: Uuid, instance_date: LocalDate) -> Result<Ack, CoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO acks (reminder_id, instance_date) VALUES (?, ?)",
        )
        .bind(reminder_id)
        .bind(instance_date)
        .execute(self.pool())
        .await?;

        Ok(Ack { reminder_id, instance_date })
    }

    async fn list_acks_for_reminder(&self, reminder_id: Uuid) -> Result<Vec<Ack>, CoreError> {
        let rows = sqlx::query_as(
            "SELECT reminder_id, instance_date FROM acks WHERE reminder_id = ? ORDER BY instance_date",
        )
        .bind(reminder_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
