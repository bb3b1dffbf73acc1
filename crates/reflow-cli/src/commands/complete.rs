use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::models::NewCompletionData;
use reflow_core::repository::Repository;

use crate::cli::CompleteCommand;
use crate::parser::{parse_date, parse_time};

pub async fn complete(repo: &impl Repository, command: CompleteCommand) -> Result<()> {
    let instance_date = parse_date(&command.date)?;
    let start_time = command.start.as_deref().map(parse_time).transpose()?.map(|t| instance_date.at(t));
    let end_time = command.end.as_deref().map(parse_time).transpose()?.map(|t| instance_date.at(t));

    repo.log_completion(NewCompletionData { series_id: command.series_id, instance_date, start_time, end_time }).await?;

    println!("{} Logged completion for series {} on {}", "+".green().bold(), command.series_id, instance_date);
    Ok(())
}
