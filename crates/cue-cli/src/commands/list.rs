use anyhow::Result;
use cue_core::query::events_in_window;

use super::Context;
use crate::cli::ListCommand;
use crate::util::window_from_args;
use crate::views::table::display_events;

pub async fn list_events(ctx: &Context, command: ListCommand) -> Result<()> {
    let stored = ctx.store.load().await?;
    if command.raw {
        display_events(&stored);
        return Ok(());
    }

    let mut window = window_from_args(&command.window, &ctx.config)?;
    window.resource_id = command.resource;
    window.venue_id = command.venue;
    window.category = command.category.map(Into::into);

    let events = events_in_window(&stored, &window)?;
    display_events(&events);
    Ok(())
}
