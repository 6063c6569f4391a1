use anyhow::{anyhow, Result};
use cue_core::error::CoreError;
use cue_core::recurrence::RecurrenceExpander;

use super::Context;
use crate::cli::ExpandCommand;
use crate::parser::parse_date;
use crate::util::resolve_event_id;
use crate::views::table::display_occurrences;

pub async fn expand_template(ctx: &Context, command: ExpandCommand) -> Result<()> {
    let stored = ctx.store.load().await?;
    let templates: Vec<_> = stored.iter().filter(|e| e.is_template()).collect();
    let id = resolve_event_id(templates.iter().copied(), &command.id)?;

    let template = templates
        .into_iter()
        .find(|e| e.id() == id)
        .ok_or_else(|| anyhow!(CoreError::NotFound(id.to_string())))?;
    let rule = template
        .recurrence()
        .ok_or_else(|| anyhow!(CoreError::InvalidInput(format!("event {} is not recurring", id))))?;

    let from = match command.from.as_deref() {
        Some(from) => parse_date(from)?,
        None => template.date(),
    };
    let limit = command.count.unwrap_or(ctx.config.preview_count);
    let occurrences = RecurrenceExpander::new(template, rule)?.preview(from, limit)?;

    println!("{} ({})", template.title(), rule);
    display_occurrences(&occurrences);
    Ok(())
}
