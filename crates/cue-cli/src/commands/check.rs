use anyhow::Result;
use cue_core::conflict::{BufferPolicy, ConflictDetector};
use cue_core::query::events_in_window;
use owo_colors::OwoColorize;
use std::collections::HashMap;

use super::Context;
use crate::cli::CheckCommand;
use crate::error::CliError;
use crate::util::window_from_args;
use crate::views::table::display_conflicts;

pub async fn check_schedule(ctx: &Context, command: CheckCommand) -> Result<()> {
    let stored = ctx.store.load().await?;
    let window = window_from_args(&command.window, &ctx.config)?;
    let events = events_in_window(&stored, &window)?;

    let detector = match command.buffer {
        Some(minutes) => ConflictDetector::new(BufferPolicy::uniform(minutes)),
        None => ctx.config.scheduling.detector(),
    };
    let reports = detector.audit(&events);

    let lookup: HashMap<_, _> = events.iter().map(|e| (e.id(), e)).collect();
    display_conflicts(&reports, &lookup);

    let hard = reports.iter().filter(|r| r.blocks_commit()).count();
    if !reports.is_empty() {
        println!(
            "{} conflict(s) across {} event(s), {} hard",
            reports.len(),
            events.len(),
            if hard > 0 { hard.red().to_string() } else { hard.to_string() }
        );
    }
    if command.strict && hard > 0 {
        return Err(CliError::HardConflicts(hard).into());
    }
    Ok(())
}
