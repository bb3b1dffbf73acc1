use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::config::ReflowConfig;
use reflow_core::facade::ReflowFacade;
use reflow_core::repository::Repository;

use crate::cli::ReflowCommand;
use crate::parser::parse_date;
use crate::views::table::{display_assignments, display_conflicts};

pub async fn run<R: Repository>(facade: &ReflowFacade<R>, config: &ReflowConfig, command: ReflowCommand) -> Result<()> {
    let window_start = parse_date(&command.start)?;
    let window_end = match command.end {
        Some(end) => parse_date(&end)?,
        None => window_start.add_days(config.lookahead_days as i64),
    };

    let output = facade.reflow_window(window_start, window_end).await?;

    println!(
        "{} {} instance(s) placed in [{}, {})",
        "reflow:".bold(),
        output.assignments.len(),
        window_start,
        window_end
    );
    display_assignments(&output.assignments);

    if output.conflicts.is_empty() {
        println!("{} no conflicts", "✓".green().bold());
    } else {
        println!("{} {} conflict(s)", "!".yellow().bold(), output.conflicts.len());
        display_conflicts(&output.conflicts);
    }

    Ok(())
}
