use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::models::NewReminderData;
use reflow_core::repository::Repository;

use crate::cli::{ReminderAckCommand, ReminderAddCommand};
use crate::parser::parse_date;

pub async fn add(repo: &impl Repository, command: ReminderAddCommand) -> Result<()> {
    let reminder = repo
        .add_reminder(NewReminderData { series_id: command.series_id, minutes_before: command.minutes_before })
        .await?;

    println!(
        "{} Added reminder {} to series {} ({} minutes before)",
        "+".green().bold(),
        reminder.id,
        command.series_id,
        reminder.minutes_before
    );
    Ok(())
}

pub async fn ack(repo: &impl Repository, command: ReminderAckCommand) -> Result<()> {
    let instance_date = parse_date(&command.date)?;
    repo.ack_reminder(command.reminder_id, instance_date).await?;

    println!(
        "{} Acknowledged reminder {} for {}",
        "✓".green().bold(),
        command.reminder_id,
        instance_date
    );
    Ok(())
}
