use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;
use reflow_core::models::{Condition, NewPatternData, PatternKind};
use reflow_core::repository::Repository;

use crate::cli::{PatternAddCommand, PatternKindArg, PatternRemoveCommand};
use crate::parser::{parse_days_of_week, parse_time};

pub async fn add(repo: &impl Repository, command: PatternAddCommand) -> Result<()> {
    let kind = match command.kind {
        PatternKindArg::Daily => PatternKind::Daily,
        PatternKindArg::Weekly => {
            let raw = command.days_of_week.ok_or_else(|| anyhow!("--days-of-week is required for --kind weekly"))?;
            PatternKind::Weekly { days_of_week: parse_days_of_week(&raw)? }
        }
        PatternKindArg::Monthly => {
            let day = command.day_of_month.ok_or_else(|| anyhow!("--day-of-month is required for --kind monthly"))?;
            PatternKind::Monthly { day_of_month: day }
        }
        PatternKindArg::Yearly => {
            let month = command.month.ok_or_else(|| anyhow!("--month is required for --kind yearly"))?;
            let day = command.day.ok_or_else(|| anyhow!("--day is required for --kind yearly"))?;
            PatternKind::Yearly { month, day }
        }
    };

    let time = command.time.as_deref().map(parse_time).transpose()?;
    let time_window = match (command.window_start.as_deref(), command.window_end.as_deref()) {
        (Some(s), Some(e)) => Some((parse_time(s)?, parse_time(e)?)),
        _ => None,
    };
    let condition: Option<Condition> =
        command.condition.as_deref().map(serde_json::from_str).transpose().map_err(|e| anyhow!("invalid --condition JSON: {e}"))?;

    let pattern = repo
        .add_pattern(NewPatternData {
            series_id: command.series_id,
            kind,
            time,
            duration_minutes: command.duration,
            fixed: command.fixed,
            all_day: command.all_day,
            time_window,
            days_before: command.days_before,
            days_after: command.days_after,
            condition,
            adaptive_duration: command.adaptive_duration,
        })
        .await?;

    println!("{} Added pattern {} to series {}", "+".green().bold(), pattern.id, command.series_id);
    Ok(())
}

pub async fn remove(repo: &impl Repository, command: PatternRemoveCommand) -> Result<()> {
    repo.remove_pattern(command.id).await?;
    println!("{} Removed pattern {}", "-".red().bold(), command.id);
    Ok(())
}
