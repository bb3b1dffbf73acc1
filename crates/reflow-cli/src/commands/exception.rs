use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::models::{ExceptionVariant, NewInstanceExceptionData};
use reflow_core::repository::Repository;

use crate::cli::{ExceptionCancelCommand, ExceptionRescheduleCommand};
use crate::parser::{parse_date, parse_time};

pub async fn cancel(repo: &impl Repository, command: ExceptionCancelCommand) -> Result<()> {
    let original_date = parse_date(&command.date)?;
    repo.upsert_exception(NewInstanceExceptionData {
        series_id: command.series_id,
        original_date,
        variant: ExceptionVariant::Cancelled,
    })
    .await?;

    println!("{} Cancelled the {} occurrence of series {}", "-".red().bold(), original_date, command.series_id);
    Ok(())
}

pub async fn reschedule(repo: &impl Repository, command: ExceptionRescheduleCommand) -> Result<()> {
    let original_date = parse_date(&command.date)?;
    let new_date = parse_date(&command.to)?;
    let new_time = new_date.at(parse_time(&command.at)?);

    repo.upsert_exception(NewInstanceExceptionData {
        series_id: command.series_id,
        original_date,
        variant: ExceptionVariant::Rescheduled { new_time },
    })
    .await?;

    println!(
        "{} Rescheduled the {} occurrence of series {} to {}",
        "~".yellow().bold(),
        original_date,
        command.series_id,
        new_time
    );
    Ok(())
}
