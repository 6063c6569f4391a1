use anyhow::Result;
use chrono::Local;
use cue_core::config::TimelineConfig;
use cue_core::models::Event;
use cue_core::query::{events_in_window, QueryWindow};
use std::collections::HashMap;

use super::Context;
use crate::cli::TimelineCommand;
use crate::parser::parse_date;
use crate::views::table::display_timeline;

pub async fn show_timeline(ctx: &Context, command: TimelineCommand) -> Result<()> {
    let day = match command.day.as_deref() {
        Some(day) => parse_date(day)?,
        None => Local::now().date_naive(),
    };
    let defaults = &ctx.config.scheduling.timeline;
    let timeline = TimelineConfig {
        start_hour: command.start_hour.unwrap_or(defaults.start_hour),
        end_hour: command.end_hour.unwrap_or(defaults.end_hour),
        pixels_per_hour: command.scale.unwrap_or(defaults.pixels_per_hour),
        min_visual_width: defaults.min_visual_width,
    }
    .build()?;

    let stored = ctx.store.load().await?;
    let events = events_in_window(&stored, &QueryWindow::day(day))?;
    let slots = match command.resource.as_deref() {
        Some(resource) => {
            let using: Vec<Event> = events.iter().filter(|e| e.uses_resource(resource)).cloned().collect();
            vec![timeline.layout(&using, resource, day)]
        }
        None => timeline.layout_by_resource(&events, day),
    };

    if slots.iter().all(|s| s.entries.is_empty()) {
        println!("Nothing scheduled on {}.", day);
        return Ok(());
    }
    let lookup: HashMap<_, _> = events.iter().map(|e| (e.id(), e)).collect();
    for slot in &slots {
        display_timeline(slot, timeline.hours(), &lookup);
    }
    Ok(())
}
