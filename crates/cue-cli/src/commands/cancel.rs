use anyhow::{anyhow, Result};
use cue_core::error::CoreError;
use cue_core::models::EventStatus;
use cue_core::query::events_in_window;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use super::Context;
use crate::cli::CancelCommand;
use crate::util::{resolve_event_id, window_from_args};

pub async fn cancel_event(ctx: &Context, command: CancelCommand) -> Result<()> {
    let stored = ctx.store.load().await?;
    let window = window_from_args(&command.window, &ctx.config)?;
    let mut candidates = events_in_window(&stored, &window)?;
    candidates.extend(stored.iter().filter(|e| e.is_template()).cloned());

    let id = resolve_event_id(&candidates, &command.id)?;
    let event = candidates
        .into_iter()
        .find(|e| e.id() == id)
        .ok_or_else(|| anyhow!(CoreError::NotFound(id.to_string())))?;
    let cancelled = event.transition(EventStatus::Cancelled)?;

    if !command.force {
        let what = if event.is_template() { "the whole series" } else { "event" };
        let confirmed = Confirm::new()
            .with_prompt(format!("Cancel {} '{}' on {}?", what, event.title(), event.date()))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("Nothing changed.");
            return Ok(());
        }
    }

    ctx.store.upsert(cancelled).await?;
    println!("{} Cancelled '{}' on {}", "✓".green(), event.title(), event.date());
    Ok(())
}
