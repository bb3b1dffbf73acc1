use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::models::{CyclingConfig, NewSeriesData};
use reflow_core::repository::Repository;

use crate::cli::{SeriesAddCommand, SeriesDeleteCommand, SeriesShowCommand};
use crate::parser::parse_date;
use crate::views::table::display_series;

pub async fn add(repo: &impl Repository, command: SeriesAddCommand) -> Result<()> {
    let start_date = command.start.as_deref().map(parse_date).transpose()?;
    let end_date = command.end.as_deref().map(parse_date).transpose()?;
    let cycling = if command.cycle.is_empty() { None } else { Some(CyclingConfig { items: command.cycle }) };

    let series = repo
        .create_series(NewSeriesData { title: command.title, start_date, end_date, tags: command.tags, cycling })
        .await?;

    println!("{} Created series: {}", "+".green().bold(), series.title.bold());
    println!("  id: {}", series.id);
    Ok(())
}

pub async fn list(repo: &impl Repository) -> Result<()> {
    let series = repo.list_series().await?;
    display_series(&series);
    Ok(())
}

pub async fn show(repo: &impl Repository, command: SeriesShowCommand) -> Result<()> {
    let Some(series) = repo.find_series_by_id(command.id).await? else {
        println!("No series with id {}", command.id);
        return Ok(());
    };
    let patterns = repo.list_patterns_by_series(series.id).await?;

    println!("{}", series.title.bold());
    println!("  id: {}", series.id);
    println!("  start: {}", series.start_date.map(|d| d.to_string()).unwrap_or_else(|| "none".into()));
    println!("  end: {}", series.end_date.map(|d| d.to_string()).unwrap_or_else(|| "none".into()));
    println!("  locked: {}", series.locked);
    println!("  tags: {}", if series.tags.is_empty() { "none".into() } else { series.tags.join(", ") });
    println!("  patterns: {}", patterns.len());
    for pattern in &patterns {
        println!("    - {} ({}min{})", pattern.id, pattern.duration_minutes, if pattern.fixed { ", fixed" } else { "" });
    }
    Ok(())
}

pub async fn delete(repo: &impl Repository, command: SeriesDeleteCommand) -> Result<()> {
    repo.delete_series(command.id).await?;
    println!("{} Deleted series {}", "-".red().bold(), command.id);
    Ok(())
}
