use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;

/// Length given to events that carry no explicit end time.
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 120;

/// Latest representable end of an event; default end times saturate here.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

// ============================================================================
// Category and lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Performance,
    Rehearsal,
    TechRehearsal,
    DressRehearsal,
    Meeting,
    Maintenance,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 7] = [
        EventCategory::Performance,
        EventCategory::Rehearsal,
        EventCategory::TechRehearsal,
        EventCategory::DressRehearsal,
        EventCategory::Meeting,
        EventCategory::Maintenance,
        EventCategory::Other,
    ];

    /// Human-readable label shown on timeline blocks and legends.
    pub fn label(self) -> &'static str {
        match self {
            EventCategory::Performance => "Performance",
            EventCategory::Rehearsal => "Rehearsal",
            EventCategory::TechRehearsal => "Tech Rehearsal",
            EventCategory::DressRehearsal => "Dress Rehearsal",
            EventCategory::Meeting => "Meeting",
            EventCategory::Maintenance => "Maintenance",
            EventCategory::Other => "Other",
        }
    }

    /// Default block color (hex) for the category.
    pub fn color(self) -> &'static str {
        match self {
            EventCategory::Performance => "#dc2626",
            EventCategory::Rehearsal => "#2563eb",
            EventCategory::TechRehearsal => "#7c3aed",
            EventCategory::DressRehearsal => "#db2777",
            EventCategory::Meeting => "#059669",
            EventCategory::Maintenance => "#d97706",
            EventCategory::Other => "#6b7280",
        }
    }

    /// Immovable categories escalate shared-resource clashes to hard conflicts.
    pub fn is_immovable(self) -> bool {
        matches!(self, EventCategory::Performance | EventCategory::DressRehearsal)
    }

    fn as_str(self) -> &'static str {
        match self {
            EventCategory::Performance => "performance",
            EventCategory::Rehearsal => "rehearsal",
            EventCategory::TechRehearsal => "tech_rehearsal",
            EventCategory::DressRehearsal => "dress_rehearsal",
            EventCategory::Meeting => "meeting",
            EventCategory::Maintenance => "maintenance",
            EventCategory::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid event category: {0}")]
pub struct ParseEventCategoryError(String);

impl FromStr for EventCategory {
    type Err = ParseEventCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "performance" => Ok(EventCategory::Performance),
            "rehearsal" => Ok(EventCategory::Rehearsal),
            "tech_rehearsal" | "tech" => Ok(EventCategory::TechRehearsal),
            "dress_rehearsal" | "dress" => Ok(EventCategory::DressRehearsal),
            "meeting" => Ok(EventCategory::Meeting),
            "maintenance" => Ok(EventCategory::Maintenance),
            "other" => Ok(EventCategory::Other),
            _ => Err(ParseEventCategoryError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Planned,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Cancelled)
    }

    /// Cancelled events keep their record but release their venue and resources.
    pub fn occupies_schedule(self) -> bool {
        self != EventStatus::Cancelled
    }

    /// planned -> confirmed -> in_progress -> completed, or cancelled from any
    /// non-terminal state.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        match (self, next) {
            (from, EventStatus::Cancelled) => !from.is_terminal(),
            (EventStatus::Planned, EventStatus::Confirmed) => true,
            (EventStatus::Confirmed, EventStatus::InProgress) => true,
            (EventStatus::InProgress, EventStatus::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Planned => "planned",
            EventStatus::Confirmed => "confirmed",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid event status: {0}")]
pub struct ParseEventStatusError(String);

impl FromStr for EventStatus {
    type Err = ParseEventStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "planned" => Ok(EventStatus::Planned),
            "confirmed" => Ok(EventStatus::Confirmed),
            "in_progress" => Ok(EventStatus::InProgress),
            "completed" => Ok(EventStatus::Completed),
            "cancelled" | "canceled" => Ok(EventStatus::Cancelled),
            _ => Err(ParseEventStatusError(s.to_string())),
        }
    }
}

// ============================================================================
// Time ranges
// ============================================================================

/// A non-empty, same-day `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, CoreError> {
        if end <= start {
            return Err(CoreError::InvalidTimeRange(format!(
                "end {} must be after start {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The shared part of two ranges, if any.
    pub fn overlap(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeRange { start, end })
    }
}

// ============================================================================
// Recurrence rules
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        };
        f.write_str(s)
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(CoreError::InvalidRule(format!("unsupported frequency '{}'", other))),
        }
    }
}

/// How a single occurrence deviates from its series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Drop the occurrence; it still consumes its sequence number.
    Skip,
    /// Reschedule the occurrence to another date and optionally another start.
    Move {
        to: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<NaiveTime>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesException {
    /// Originally scheduled date of the affected occurrence.
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: ExceptionKind,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Inclusive last date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_day: Vec<Weekday>,
    /// 1..=31, or -31..=-1 counting back from the last day of the month.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_month_day: Vec<i8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_month: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<SeriesException>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    pub fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn times(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn on_days(mut self, days: &[Weekday]) -> Self {
        self.by_day = days.to_vec();
        self
    }

    pub fn on_month_days(mut self, days: &[i8]) -> Self {
        self.by_month_day = days.to_vec();
        self
    }

    pub fn in_months(mut self, months: &[u32]) -> Self {
        self.by_month = months.to_vec();
        self
    }

    pub fn skip(mut self, date: NaiveDate) -> Self {
        self.exceptions.push(SeriesException { date, kind: ExceptionKind::Skip });
        self
    }

    pub fn move_occurrence(mut self, date: NaiveDate, to: NaiveDate, start_time: Option<NaiveTime>) -> Self {
        self.exceptions.push(SeriesException {
            date,
            kind: ExceptionKind::Move { to, start_time },
        });
        self
    }

    /// Whether the rule alone bounds the series.
    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    pub fn exception_for(&self, date: NaiveDate) -> Option<&ExceptionKind> {
        self.exceptions.iter().find(|e| e.date == date).map(|e| &e.kind)
    }

    /// Checks the rule against the date of the template it belongs to.
    pub fn validate(&self, template_date: NaiveDate) -> Result<(), CoreError> {
        if self.interval < 1 {
            return Err(CoreError::InvalidRule("interval must be at least 1".to_string()));
        }
        if self.count == Some(0) {
            return Err(CoreError::InvalidRule("count must be at least 1".to_string()));
        }
        if let Some(until) = self.until {
            if until < template_date {
                return Err(CoreError::InvalidRule(format!(
                    "until {} is before the series start {}",
                    until, template_date
                )));
            }
        }
        if let Some(month) = self.by_month.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(CoreError::InvalidRule(format!("by-month value {} out of range", month)));
        }
        if let Some(day) = self.by_month_day.iter().find(|d| **d == 0 || !(-31..=31).contains(*d)) {
            return Err(CoreError::InvalidRule(format!("by-month-day value {} out of range", day)));
        }
        Ok(())
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_weekday_code(code: &str) -> Result<Weekday, CoreError> {
    match code.trim().to_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(CoreError::InvalidRule(format!("unknown weekday '{}'", other))),
    }
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>, CoreError> {
    value
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| CoreError::InvalidRule(format!("invalid {} value '{}'", key, v)))
        })
        .collect()
}

fn join_list<T: ToString>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Formats the rule as an RRULE-style property list. Exceptions are not part
/// of the string form.
impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_day.is_empty() {
            let days: Vec<&str> = self.by_day.iter().map(|d| weekday_code(*d)).collect();
            write!(f, ";BYDAY={}", days.join(","))?;
        }
        if !self.by_month_day.is_empty() {
            write!(f, ";BYMONTHDAY={}", join_list(&self.by_month_day))?;
        }
        if !self.by_month.is_empty() {
            write!(f, ";BYMONTH={}", join_list(&self.by_month))?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={}", count)?;
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.format("%Y%m%d"))?;
        }
        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);

        let mut frequency = None;
        let mut rule = RecurrenceRule::daily();

        for part in body.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| CoreError::InvalidRule(format!("malformed rule part '{}'", part)))?;
            match key.trim().to_uppercase().as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    rule.interval = value
                        .trim()
                        .parse()
                        .map_err(|_| CoreError::InvalidRule(format!("invalid interval '{}'", value)))?
                }
                "COUNT" => {
                    rule.count = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| CoreError::InvalidRule(format!("invalid count '{}'", value)))?,
                    )
                }
                "UNTIL" => {
                    let date_part = value.trim().get(..8).unwrap_or(value);
                    rule.until = Some(
                        NaiveDate::parse_from_str(date_part, "%Y%m%d")
                            .map_err(|_| CoreError::InvalidRule(format!("invalid until '{}'", value)))?,
                    )
                }
                "BYDAY" => {
                    rule.by_day = value.split(',').map(parse_weekday_code).collect::<Result<_, _>>()?
                }
                "BYMONTHDAY" => rule.by_month_day = parse_list("BYMONTHDAY", value)?,
                "BYMONTH" => rule.by_month = parse_list("BYMONTH", value)?,
                other => {
                    return Err(CoreError::InvalidRule(format!("unsupported rule part '{}'", other)))
                }
            }
        }

        rule.frequency = frequency.ok_or_else(|| CoreError::InvalidRule("missing FREQ".to_string()))?;
        Ok(rule)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Wire shape of an event as supplied by the CRUD layer. Converting it into
/// an [`Event`] validates every invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: EventCategory,
    #[serde(default = "default_status")]
    pub status: EventStatus,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

fn default_category() -> EventCategory {
    EventCategory::Other
}

fn default_status() -> EventStatus {
    EventStatus::Planned
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            category: EventCategory::Other,
            status: EventStatus::Planned,
            date: NaiveDate::default(),
            start_time: NaiveTime::default(),
            end_time: None,
            venue_id: None,
            resource_ids: Vec::new(),
            participant_ids: Vec::new(),
            color: None,
            recurrence: None,
            parent_id: None,
            sequence: None,
        }
    }
}

/// A validated, immutable event. Templates (events with a recurrence rule)
/// are expanded into occurrences before they are scheduled anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct Event {
    id: Uuid,
    title: String,
    category: EventCategory,
    status: EventStatus,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: Option<NaiveTime>,
    venue_id: Option<String>,
    resource_ids: Vec<String>,
    participant_ids: Vec<String>,
    color: Option<String>,
    recurrence: Option<RecurrenceRule>,
    parent_id: Option<Uuid>,
    sequence: Option<u32>,
}

fn default_end(start: NaiveTime) -> NaiveTime {
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES));
    if wrapped != 0 {
        end_of_day()
    } else {
        end
    }
}

fn validate_times(start: NaiveTime, end: Option<NaiveTime>) -> Result<TimeRange, CoreError> {
    TimeRange::new(start, end.unwrap_or_else(|| default_end(start)))
}

impl TryFrom<EventRecord> for Event {
    type Error = CoreError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        if record.title.trim().is_empty() {
            return Err(CoreError::InvalidInput(format!("event {} has an empty title", record.id)));
        }
        validate_times(record.start_time, record.end_time)?;
        if let Some(rule) = &record.recurrence {
            if record.parent_id.is_some() {
                return Err(CoreError::InvalidInput(format!(
                    "event {} is an occurrence and cannot carry its own recurrence rule",
                    record.id
                )));
            }
            rule.validate(record.date)?;
        }

        Ok(Self {
            id: record.id,
            title: record.title,
            category: record.category,
            status: record.status,
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
            venue_id: record.venue_id,
            resource_ids: record.resource_ids,
            participant_ids: record.participant_ids,
            color: record.color,
            recurrence: record.recurrence,
            parent_id: record.parent_id,
            sequence: record.sequence,
        })
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            category: event.category,
            status: event.status,
            date: event.date,
            start_time: event.start_time,
            end_time: event.end_time,
            venue_id: event.venue_id,
            resource_ids: event.resource_ids,
            participant_ids: event.participant_ids,
            color: event.color,
            recurrence: event.recurrence,
            parent_id: event.parent_id,
            sequence: event.sequence,
        }
    }
}

impl Event {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    /// The end time as recorded, without the default applied.
    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end_time
    }

    /// The end time with the two-hour default applied.
    pub fn effective_end_time(&self) -> NaiveTime {
        self.end_time.unwrap_or_else(|| default_end(self.start_time))
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.effective_end_time(),
        }
    }

    pub fn venue_id(&self) -> Option<&str> {
        self.venue_id.as_deref()
    }

    pub fn resource_ids(&self) -> &[String] {
        &self.resource_ids
    }

    pub fn participant_ids(&self) -> &[String] {
        &self.participant_ids
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// The override color if one is set, otherwise the category color.
    pub fn display_color(&self) -> &str {
        self.color.as_deref().unwrap_or_else(|| self.category.color())
    }

    pub fn recurrence(&self) -> Option<&RecurrenceRule> {
        self.recurrence.as_ref()
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    pub fn is_template(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn is_occurrence(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Concrete, non-cancelled events are the ones that hold venues and resources.
    pub fn is_scheduled(&self) -> bool {
        !self.is_template() && self.status.occupies_schedule()
    }

    /// Whether the event uses the given venue or resource id.
    pub fn uses_resource(&self, resource_id: &str) -> bool {
        self.venue_id.as_deref() == Some(resource_id) || self.resource_ids.iter().any(|r| r == resource_id)
    }

    pub fn to_record(&self) -> EventRecord {
        self.clone().into()
    }

    /// Returns a copy moved to the given times. An absent end keeps the
    /// two-hour default relative to the new start.
    pub fn with_times(&self, start_time: NaiveTime, end_time: Option<NaiveTime>) -> Result<Event, CoreError> {
        validate_times(start_time, end_time)?;
        Ok(Event {
            start_time,
            end_time,
            ..self.clone()
        })
    }

    /// Returns a copy in the given lifecycle status.
    pub fn transition(&self, next: EventStatus) -> Result<Event, CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidInput(format!(
                "cannot move event {} from {} to {}",
                self.id, self.status, next
            )));
        }
        Ok(Event {
            status: next,
            ..self.clone()
        })
    }

    /// Builds the concrete occurrence of a template. The id is keyed on the
    /// scheduled date so it survives move exceptions.
    pub(crate) fn occurrence(
        &self,
        scheduled: NaiveDate,
        date: NaiveDate,
        start_time: NaiveTime,
        sequence: u32,
    ) -> Result<Event, CoreError> {
        let end_time = match (self.end_time, start_time == self.start_time) {
            (end, true) => end,
            (Some(end), false) => {
                let length = end - self.start_time;
                let (shifted, wrapped) = start_time.overflowing_add_signed(length);
                Some(if wrapped != 0 { end_of_day() } else { shifted })
            }
            (None, false) => None,
        };
        validate_times(start_time, end_time)?;

        Ok(Event {
            id: Uuid::new_v5(&self.id, scheduled.format("%Y-%m-%d").to_string().as_bytes()),
            date,
            start_time,
            end_time,
            recurrence: None,
            parent_id: Some(self.id),
            sequence: Some(sequence),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record() -> EventRecord {
        EventRecord {
            title: "Act I run".to_string(),
            category: EventCategory::Rehearsal,
            date: date(2025, 3, 10),
            start_time: time(10, 0),
            end_time: Some(time(12, 0)),
            ..Default::default()
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn test_valid_record_converts() {
            let event = Event::try_from(record()).unwrap();
            assert_eq!(event.title(), "Act I run");
            assert_eq!(event.time_range().duration(), Duration::hours(2));
            assert!(!event.is_template());
        }

        #[test]
        fn test_end_before_start_rejected() {
            let mut rec = record();
            rec.end_time = Some(time(9, 0));
            let result = Event::try_from(rec);
            assert!(matches!(result.unwrap_err(), CoreError::InvalidTimeRange(_)));
        }

        #[test]
        fn test_end_equal_to_start_rejected() {
            let mut rec = record();
            rec.end_time = Some(time(10, 0));
            assert!(matches!(Event::try_from(rec).unwrap_err(), CoreError::InvalidTimeRange(_)));
        }

        #[test]
        fn test_empty_title_rejected() {
            let mut rec = record();
            rec.title = "   ".to_string();
            assert!(matches!(Event::try_from(rec).unwrap_err(), CoreError::InvalidInput(_)));
        }

        #[test]
        fn test_default_end_is_two_hours() {
            let mut rec = record();
            rec.end_time = None;
            let event = Event::try_from(rec).unwrap();
            assert_eq!(event.effective_end_time(), time(12, 0));
            assert_eq!(event.end_time(), None);
        }

        #[test]
        fn test_default_end_saturates_at_midnight() {
            let mut rec = record();
            rec.start_time = time(23, 0);
            rec.end_time = None;
            let event = Event::try_from(rec).unwrap();
            assert_eq!(event.effective_end_time(), end_of_day());
        }

        #[test]
        fn test_invalid_rule_rejected_at_construction() {
            let mut rec = record();
            rec.recurrence = Some(RecurrenceRule::daily().every(0).times(3));
            assert!(matches!(Event::try_from(rec).unwrap_err(), CoreError::InvalidRule(_)));
        }

        #[test]
        fn test_occurrence_cannot_be_template() {
            let mut rec = record();
            rec.parent_id = Some(Uuid::new_v4());
            rec.recurrence = Some(RecurrenceRule::daily().times(3));
            assert!(matches!(Event::try_from(rec).unwrap_err(), CoreError::InvalidInput(_)));
        }

        #[test]
        fn test_json_round_trip_validates() {
            let json = r#"{
                "id": "6f1c1a2e-0f43-4a4f-9a51-0c1f6b0c2d11",
                "title": "Matinee",
                "category": "performance",
                "date": "2025-03-10",
                "start_time": "14:00:00",
                "end_time": "13:00:00"
            }"#;
            assert!(serde_json::from_str::<Event>(json).is_err());

            let event = Event::try_from(record()).unwrap();
            let encoded = serde_json::to_string(&event).unwrap();
            let decoded: Event = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, event);
        }

        #[test]
        fn test_display_color_prefers_override() {
            let mut rec = record();
            let plain = Event::try_from(rec.clone()).unwrap();
            assert_eq!(plain.display_color(), EventCategory::Rehearsal.color());

            rec.color = Some("#000000".to_string());
            let colored = Event::try_from(rec).unwrap();
            assert_eq!(colored.display_color(), "#000000");
        }

        #[test]
        fn test_with_times_does_not_mutate_original() {
            let event = Event::try_from(record()).unwrap();
            let moved = event.with_times(time(11, 0), Some(time(13, 0))).unwrap();
            assert_eq!(event.start_time(), time(10, 0));
            assert_eq!(moved.start_time(), time(11, 0));
            assert_eq!(moved.id(), event.id());
        }

        #[test]
        fn test_transition_follows_lifecycle() {
            let event = Event::try_from(record()).unwrap();
            let confirmed = event.transition(EventStatus::Confirmed).unwrap();
            assert!(confirmed.transition(EventStatus::Completed).is_err());
            let cancelled = confirmed.transition(EventStatus::Cancelled).unwrap();
            assert!(cancelled.transition(EventStatus::Confirmed).is_err());
            assert!(!cancelled.is_scheduled());
        }
    }

    mod category_tests {
        use super::*;

        #[test]
        fn test_every_category_has_label_and_color() {
            for category in EventCategory::ALL {
                assert!(!category.label().is_empty());
                assert!(category.color().starts_with('#'));
                assert_eq!(category.to_string().parse::<EventCategory>().unwrap(), category);
            }
        }

        #[test]
        fn test_immovable_categories() {
            assert!(EventCategory::Performance.is_immovable());
            assert!(EventCategory::DressRehearsal.is_immovable());
            assert!(!EventCategory::TechRehearsal.is_immovable());
            assert!(!EventCategory::Meeting.is_immovable());
        }

        #[test]
        fn test_status_parse() {
            assert_eq!("in-progress".parse::<EventStatus>().unwrap(), EventStatus::InProgress);
            assert!("later".parse::<EventStatus>().is_err());
        }
    }

    mod time_range_tests {
        use super::*;

        #[test]
        fn test_overlap_window() {
            let a = TimeRange::new(time(10, 0), time(11, 0)).unwrap();
            let b = TimeRange::new(time(10, 30), time(11, 30)).unwrap();
            let overlap = a.overlap(&b).unwrap();
            assert_eq!(overlap.start(), time(10, 30));
            assert_eq!(overlap.end(), time(11, 0));
        }

        #[test]
        fn test_touching_ranges_do_not_overlap() {
            let a = TimeRange::new(time(10, 0), time(11, 0)).unwrap();
            let b = TimeRange::new(time(11, 0), time(12, 0)).unwrap();
            assert!(!a.overlaps(&b));
            assert!(a.overlap(&b).is_none());
        }
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn test_parse_and_format() {
            let rule: RecurrenceRule = "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=10".parse().unwrap();
            assert_eq!(rule.frequency, Frequency::Weekly);
            assert_eq!(rule.interval, 2);
            assert_eq!(rule.by_day, vec![Weekday::Mon, Weekday::Wed]);
            assert_eq!(rule.count, Some(10));
            assert_eq!(rule.to_string(), "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=10");
        }

        #[test]
        fn test_parse_until_with_time_suffix() {
            let rule: RecurrenceRule = "RRULE:FREQ=DAILY;UNTIL=20250601T000000Z".parse().unwrap();
            assert_eq!(rule.until, Some(date(2025, 6, 1)));
        }

        #[test]
        fn test_parse_rejects_unknown_parts() {
            assert!("FREQ=HOURLY".parse::<RecurrenceRule>().is_err());
            assert!("INTERVAL=2".parse::<RecurrenceRule>().is_err());
            assert!("FREQ=DAILY;BYSETPOS=1".parse::<RecurrenceRule>().is_err());
            assert!("FREQ=WEEKLY;BYDAY=XX".parse::<RecurrenceRule>().is_err());
            assert!("FREQ=MINUTELY;COUNT=5".parse::<RecurrenceRule>().is_err());
            assert!("FREQ=MONTHLY;BYDAY=2MO".parse::<RecurrenceRule>().is_err());
            assert!("FREQ=YEARLY;BYWEEKNO=20".parse::<RecurrenceRule>().is_err());
        }

        #[test]
        fn test_validate_bounds() {
            let start = date(2025, 3, 10);
            assert!(RecurrenceRule::daily().times(1).validate(start).is_ok());
            assert!(RecurrenceRule::daily().times(0).validate(start).is_err());
            assert!(RecurrenceRule::daily().until(date(2025, 3, 9)).validate(start).is_err());
            assert!(RecurrenceRule::monthly().on_month_days(&[0]).validate(start).is_err());
            assert!(RecurrenceRule::monthly().on_month_days(&[-1, 31]).validate(start).is_ok());
            assert!(RecurrenceRule::yearly().in_months(&[13]).validate(start).is_err());
        }
    }
}
