use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::models::{Constraint, NewConstraintData};
use reflow_core::repository::Repository;

use crate::cli::{ConstraintAddCommand, ConstraintKindArg, ConstraintRemoveCommand};
use crate::parser::parse_constraint_target;

pub async fn add(repo: &impl Repository, command: ConstraintAddCommand) -> Result<()> {
    let a = parse_constraint_target(&command.a)?;
    let b = parse_constraint_target(&command.b)?;

    let constraint = match command.kind {
        ConstraintKindArg::NoOverlap => Constraint::NoOverlap { a, b },
        ConstraintKindArg::MustBeBefore => Constraint::MustBeBefore { first: a, second: b },
    };

    let id = repo.add_constraint(NewConstraintData { constraint }).await?;
    println!("{} Added constraint {}", "+".green().bold(), id);
    Ok(())
}

pub async fn remove(repo: &impl Repository, command: ConstraintRemoveCommand) -> Result<()> {
    repo.remove_constraint(command.id).await?;
    println!("{} Removed constraint {}", "-".red().bold(), command.id);
    Ok(())
}
