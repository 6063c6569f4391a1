use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Event, EventCategory};
use crate::recurrence::expand_template;

/// A date window over the schedule, optionally narrowed to one resource or
/// venue. Both dates are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub category: Option<EventCategory>,
}

impl QueryWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, CoreError> {
        if end_date < start_date {
            return Err(CoreError::InvalidTimeRange(format!(
                "query window ends {} before it starts {}",
                end_date, start_date
            )));
        }
        Ok(Self {
            start_date,
            end_date,
            resource_id: None,
            venue_id: None,
            category: None,
        })
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
            resource_id: None,
            venue_id: None,
            category: None,
        }
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_venue(mut self, venue_id: impl Into<String>) -> Self {
        self.venue_id = Some(venue_id.into());
        self
    }

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Resource matches on either the venue or the resource list.
    pub fn matches(&self, event: &Event) -> bool {
        self.contains_date(event.date())
            && event.status().occupies_schedule()
            && self.resource_id.as_deref().map_or(true, |r| event.uses_resource(r))
            && self.venue_id.as_deref().map_or(true, |v| event.venue_id() == Some(v))
            && self.category.map_or(true, |c| event.category() == c)
    }
}

/// Concrete events inside `window`, ordered by date then start time.
///
/// Templates are expanded into occurrences. A stored event whose id equals a
/// generated occurrence id (an occurrence edited and saved on its own) takes
/// the place of the generated one.
pub fn events_in_window(events: &[Event], window: &QueryWindow) -> Result<Vec<Event>, CoreError> {
    if window.end_date < window.start_date {
        return Err(CoreError::InvalidTimeRange(format!(
            "query window ends {} before it starts {}",
            window.end_date, window.start_date
        )));
    }

    let stored: HashSet<Uuid> = events.iter().filter(|e| !e.is_template()).map(Event::id).collect();
    let mut result: Vec<Event> = Vec::new();

    for event in events {
        if event.is_template() {
            if event.date() > window.end_date {
                continue;
            }
            let occurrences = expand_template(event, window.start_date, Some(window.end_date))?;
            result.extend(
                occurrences
                    .into_iter()
                    .map(|o| o.event)
                    .filter(|e| !stored.contains(&e.id()) && window.matches(e)),
            );
        } else if window.matches(event) {
            result.push(event.clone());
        }
    }

    result.sort_by_key(|e| (e.date(), e.start_time(), e.id()));
    debug!(
        start = %window.start_date,
        end = %window.end_date,
        events = result.len(),
        "resolved query window"
    );
    Ok(result)
}
