use anyhow::{anyhow, Result};
use chrono::{Days, Local};
use cue_core::error::CoreError;
use cue_core::models::Event;
use cue_core::query::QueryWindow;
use uuid::Uuid;

use crate::cli::WindowArgs;
use crate::config::Config;
use crate::error::CliError;
use crate::parser::parse_date;

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub fn resolve_event_id<'a>(events: impl IntoIterator<Item = &'a Event>, short_id: &str) -> Result<Uuid> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let prefix = short_id.to_lowercase();
    let mut matches: Vec<&Event> = events
        .into_iter()
        .filter(|e| e.id().to_string().starts_with(&prefix))
        .collect();
    matches.sort_by_key(|e| e.id());
    matches.dedup_by_key(|e| e.id());

    match matches.as_slice() {
        [event] => Ok(event.id()),
        [] => Err(anyhow!(CoreError::NotFound(format!(
            "No event found with ID prefix '{}'",
            short_id
        )))),
        many => Err(anyhow!(CliError::AmbiguousId(
            many.iter()
                .map(|e| (e.id().to_string(), format!("{} on {}", e.title(), e.date())))
                .collect()
        ))),
    }
}

/// Builds the query window from `--from/--to/--days`, defaulting to today
/// and the configured length.
pub fn window_from_args(args: &WindowArgs, config: &Config) -> Result<QueryWindow> {
    let start = match &args.from {
        Some(from) => parse_date(from)?,
        None => Local::now().date_naive(),
    };
    let end = match (&args.to, args.days) {
        (Some(to), _) => parse_date(to)?,
        (None, days) => {
            let days = days.unwrap_or(config.default_days).max(1);
            start
                .checked_add_days(Days::new(u64::from(days - 1)))
                .ok_or_else(|| CoreError::InvalidInput(format!("window of {} days is too long", days)))?
        }
    };
    Ok(QueryWindow::new(start, end)?)
}
