use anyhow::Result;
use cue_core::models::{Event, EventRecord, RecurrenceRule};
use owo_colors::OwoColorize;

use super::Context;
use crate::cli::AddCommand;
use crate::parser::{parse_date, parse_time};
use crate::util::short_id;

pub async fn add_event(ctx: &Context, command: AddCommand) -> Result<()> {
    let recurrence = command
        .repeat
        .as_deref()
        .map(str::parse::<RecurrenceRule>)
        .transpose()?;

    let record = EventRecord {
        title: command.title,
        category: command.category.into(),
        date: parse_date(&command.date)?,
        start_time: parse_time(&command.at)?,
        end_time: command.until.as_deref().map(parse_time).transpose()?,
        venue_id: command.venue,
        resource_ids: command.resource,
        participant_ids: command.participant,
        color: command.color,
        recurrence,
        ..Default::default()
    };
    let event = Event::try_from(record)?;
    ctx.store.upsert(event.clone()).await?;

    let kind = if event.is_template() { "recurring template" } else { "event" };
    println!(
        "{} Added {} '{}' ({}) on {} at {}",
        "✓".green(),
        kind,
        event.title(),
        short_id(event.id()),
        event.date(),
        event.start_time().format("%H:%M")
    );
    Ok(())
}
