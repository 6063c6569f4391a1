use anyhow::Result;
use cue_core::conflict::has_hard_conflicts;
use cue_core::coordinator::{self, CommitResult, GestureCommand, RescheduleCoordinator};
use cue_core::error::CoreError;
use cue_core::query::events_in_window;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use std::collections::HashMap;
use uuid::Uuid;

use super::Context;
use crate::cli::{MoveCommand, ResizeCommand, WindowArgs};
use crate::error::CliError;
use crate::parser::parse_delta;
use crate::util::{resolve_event_id, window_from_args};
use crate::views::table::display_conflicts;

pub async fn move_event(ctx: &Context, command: MoveCommand) -> Result<()> {
    let delta_minutes = parse_delta(&command.delta)?;
    reschedule(ctx, &command.id, &command.window, command.yes, |event_id| {
        GestureCommand::Move(coordinator::MoveCommand { event_id, delta_minutes })
    })
    .await
}

pub async fn resize_event(ctx: &Context, command: ResizeCommand) -> Result<()> {
    let delta_minutes = parse_delta(&command.delta)?;
    let edge = command.edge.into();
    reschedule(ctx, &command.id, &command.window, command.yes, |event_id| {
        GestureCommand::Resize(coordinator::ResizeCommand {
            event_id,
            edge,
            delta_minutes,
        })
    })
    .await
}

/// Runs one gesture through the coordinator: propose, confirm warnings,
/// commit to the events file.
async fn reschedule(
    ctx: &Context,
    short_id: &str,
    window: &WindowArgs,
    assume_yes: bool,
    gesture: impl FnOnce(Uuid) -> GestureCommand,
) -> Result<()> {
    let stored = ctx.store.load().await?;
    let window = window_from_args(window, &ctx.config)?;
    let scheduled = events_in_window(&stored, &window)?;
    let event_id = resolve_event_id(&scheduled, short_id)?;

    let coordinator = RescheduleCoordinator::new(ctx.store.clone(), ctx.config.scheduling.clone(), scheduled)?;
    let candidate = coordinator.propose(&gesture(event_id))?;

    let snapshot = coordinator.snapshot();
    let lookup: HashMap<_, _> = snapshot.iter().map(|e| (e.id(), e)).collect();

    let preview = ctx.config.scheduling.detector().check(&candidate, &snapshot);
    if !preview.is_empty() && !has_hard_conflicts(&preview) && !assume_yes {
        display_conflicts(&preview, &lookup);
        let confirmed = Confirm::new()
            .with_prompt("Commit despite these warnings?")
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            coordinator.cancel(event_id)?;
            println!("Change cancelled.");
            return Ok(());
        }
    }

    match coordinator.commit(candidate).await? {
        CommitResult::Accepted { candidate, warnings } => {
            let range = candidate.time_range();
            println!(
                "{} '{}' now on {} {}-{}",
                "✓".green(),
                candidate.title(),
                candidate.date(),
                range.start().format("%H:%M"),
                range.end().format("%H:%M")
            );
            if !warnings.is_empty() {
                println!("Committed with {} warning(s):", warnings.len());
                display_conflicts(&warnings, &lookup);
            }
            Ok(())
        }
        CommitResult::Rejected { conflicts } => {
            display_conflicts(&conflicts, &lookup);
            let hard = conflicts.iter().filter(|c| c.blocks_commit()).count();
            Err(CliError::Rejected(hard).into())
        }
        CommitResult::Timeout => Err(CoreError::Timeout(event_id).into()),
        CommitResult::GestureConflict => Err(CoreError::GestureConflict(event_id).into()),
    }
}
