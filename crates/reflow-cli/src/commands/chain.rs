use anyhow::Result;
use owo_colors::OwoColorize;
use reflow_core::models::NewChainLinkData;
use reflow_core::repository::Repository;

use crate::cli::{ChainLinkCommand, ChainUnlinkCommand};

pub async fn link(repo: &impl Repository, command: ChainLinkCommand) -> Result<()> {
    repo.create_link(NewChainLinkData {
        parent_id: command.parent,
        child_id: command.child,
        distance_minutes: command.distance,
        early_wobble_minutes: command.early_wobble,
        late_wobble_minutes: command.late_wobble,
    })
    .await?;

    println!("{} Linked {} as a chain child of {}", "+".green().bold(), command.child, command.parent);
    Ok(())
}

pub async fn unlink(repo: &impl Repository, command: ChainUnlinkCommand) -> Result<()> {
    repo.remove_link(command.child_id).await?;
    println!("{} Unlinked {} from its chain parent", "-".red().bold(), command.child_id);
    Ok(())
}
