use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::Event;

/// Narrowest block drawn for very short events, in pixels.
pub const DEFAULT_MIN_VISUAL_WIDTH: f64 = 12.0;

/// Visible hours of a timeline, `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct HourRange {
    start_hour: u32,
    end_hour: u32,
}

impl HourRange {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, CoreError> {
        if start_hour >= end_hour || end_hour > 24 {
            return Err(CoreError::InvalidTimeRange(format!(
                "hour range {}..{} must satisfy 0 <= start < end <= 24",
                start_hour, end_hour
            )));
        }
        Ok(Self { start_hour, end_hour })
    }

    pub fn full_day() -> Self {
        Self {
            start_hour: 0,
            end_hour: 24,
        }
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    fn start_minutes(&self) -> f64 {
        f64::from(self.start_hour * 60)
    }

    fn end_minutes(&self) -> f64 {
        f64::from(self.end_hour * 60)
    }

    fn clamp(&self, minutes: f64) -> f64 {
        minutes.clamp(self.start_minutes(), self.end_minutes())
    }
}

impl TryFrom<(u32, u32)> for HourRange {
    type Error = CoreError;

    fn try_from((start, end): (u32, u32)) -> Result<Self, Self::Error> {
        HourRange::new(start, end)
    }
}

impl From<HourRange> for (u32, u32) {
    fn from(range: HourRange) -> Self {
        (range.start_hour, range.end_hour)
    }
}

/// Placement of one event on a resource-day timeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotEntry {
    pub event_id: Uuid,
    pub lane: usize,
    /// Minutes from the start of the visible range to the (clamped) start.
    pub start_offset_minutes: u32,
    /// Visible (clamped) length in minutes.
    pub duration_minutes: u32,
    pub offset_px: f64,
    pub width_px: f64,
    /// The event starts before or ends after the visible range.
    pub clipped: bool,
}

/// The laid-out events of one resource on one day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineSlot {
    pub resource_id: String,
    pub day: NaiveDate,
    pub lane_count: usize,
    pub entries: Vec<SlotEntry>,
}

impl TimelineSlot {
    pub fn entry(&self, event_id: Uuid) -> Option<&SlotEntry> {
        self.entries.iter().find(|e| e.event_id == event_id)
    }
}

/// Lays out one resource-day with the default minimum block width.
pub fn layout(
    events: &[Event],
    resource_id: &str,
    day: NaiveDate,
    hours: HourRange,
    pixels_per_hour: f64,
) -> Result<TimelineSlot, CoreError> {
    Ok(TimelineLayout::new(hours, pixels_per_hour)?.layout(events, resource_id, day))
}

/// TimelineLayout: interval partitioning of a day's events into lanes plus
/// the pixel geometry for a given hour range and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    hours: HourRange,
    pixels_per_hour: f64,
    min_visual_width: f64,
}

impl TimelineLayout {
    pub fn new(hours: HourRange, pixels_per_hour: f64) -> Result<Self, CoreError> {
        if !(pixels_per_hour.is_finite() && pixels_per_hour > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "pixels per hour must be positive, got {}",
                pixels_per_hour
            )));
        }
        Ok(Self {
            hours,
            pixels_per_hour,
            min_visual_width: DEFAULT_MIN_VISUAL_WIDTH,
        })
    }

    pub fn with_min_visual_width(mut self, width: f64) -> Self {
        self.min_visual_width = width.max(0.0);
        self
    }

    pub fn hours(&self) -> HourRange {
        self.hours
    }

    pub fn pixels_per_hour(&self) -> f64 {
        self.pixels_per_hour
    }

    /// Converts a horizontal pointer delta into minutes.
    pub fn minutes_for_pixels(&self, delta_px: f64) -> i64 {
        (delta_px / self.pixels_per_hour * 60.0).round() as i64
    }

    /// Lays out `events` (one resource, one day). Events on other days,
    /// templates, cancelled events and events entirely outside the hour range
    /// are left out of the result.
    pub fn layout(&self, events: &[Event], resource_id: &str, day: NaiveDate) -> TimelineSlot {
        let (range_start, range_end) = (self.hours.start_minutes(), self.hours.end_minutes());

        let mut visible: Vec<&Event> = events
            .iter()
            .filter(|e| e.date() == day && e.is_scheduled())
            .filter(|e| {
                let range = e.time_range();
                minutes_of(range.end()) > range_start && minutes_of(range.start()) < range_end
            })
            .collect();

        // Earliest start first; on ties the longer event takes the lower lane.
        visible.sort_by(|a, b| {
            let (ra, rb) = (a.time_range(), b.time_range());
            ra.start()
                .cmp(&rb.start())
                .then_with(|| rb.duration().cmp(&ra.duration()))
                .then_with(|| a.id().cmp(&b.id()))
        });

        let mut lane_ends: Vec<NaiveTime> = Vec::new();
        let mut entries = Vec::with_capacity(visible.len());

        for event in visible {
            let range = event.time_range();
            let lane = match lane_ends.iter().position(|end| *end <= range.start()) {
                Some(lane) => {
                    lane_ends[lane] = range.end();
                    lane
                }
                None => {
                    lane_ends.push(range.end());
                    lane_ends.len() - 1
                }
            };

            let start = self.hours.clamp(minutes_of(range.start()));
            let end = self.hours.clamp(minutes_of(range.end()));
            let width = (end - start) / 60.0 * self.pixels_per_hour;

            entries.push(SlotEntry {
                event_id: event.id(),
                lane,
                start_offset_minutes: (start - range_start).floor() as u32,
                duration_minutes: (end - start).round() as u32,
                offset_px: (start - range_start) / 60.0 * self.pixels_per_hour,
                width_px: width.max(self.min_visual_width),
                clipped: minutes_of(range.start()) < range_start || minutes_of(range.end()) > range_end,
            });
        }

        debug!(
            resource = resource_id,
            day = %day,
            events = entries.len(),
            lanes = lane_ends.len(),
            "laid out timeline"
        );

        TimelineSlot {
            resource_id: resource_id.to_string(),
            day,
            lane_count: lane_ends.len(),
            entries,
        }
    }

    /// Groups a day's events by venue and resource id and lays out each
    /// group. A single event appears on every resource it uses.
    pub fn layout_by_resource(&self, events: &[Event], day: NaiveDate) -> Vec<TimelineSlot> {
        let mut groups: BTreeMap<&str, Vec<Event>> = BTreeMap::new();
        for event in events.iter().filter(|e| e.date() == day) {
            let mut keys: Vec<&str> = event.venue_id().into_iter().collect();
            keys.extend(event.resource_ids().iter().map(String::as_str));
            keys.sort_unstable();
            keys.dedup();
            for key in keys {
                groups.entry(key).or_default().push(event.clone());
            }
        }

        groups
            .into_iter()
            .map(|(resource, group)| self.layout(&group, resource, day))
            .filter(|slot| !slot.entries.is_empty())
            .collect()
    }
}

fn minutes_of(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCategory, EventRecord};
    use rstest::rstest;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event(title: &str, start: (u32, u32), end: (u32, u32)) -> Event {
        Event::try_from(EventRecord {
            title: title.to_string(),
            category: EventCategory::Rehearsal,
            date: day(),
            start_time: time(start.0, start.1),
            end_time: Some(time(end.0, end.1)),
            venue_id: Some("main-stage".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn lanes(slot: &TimelineSlot, events: &[Event]) -> Vec<usize> {
        events.iter().map(|e| slot.entry(e.id()).unwrap().lane).collect()
    }

    #[test]
    fn test_non_overlapping_share_lane() {
        let events = vec![event("A", (9, 0), (10, 0)), event("B", (10, 0), (11, 0))];
        let slot = layout(&events, "main-stage", day(), HourRange::new(8, 20).unwrap(), 60.0).unwrap();
        assert_eq!(slot.lane_count, 1);
        assert_eq!(lanes(&slot, &events), vec![0, 0]);
    }

    #[test]
    fn test_overlapping_get_separate_lanes() {
        let events = vec![
            event("A", (9, 0), (11, 0)),
            event("B", (10, 0), (12, 0)),
            event("C", (11, 0), (13, 0)),
        ];
        let slot = layout(&events, "main-stage", day(), HourRange::new(8, 20).unwrap(), 60.0).unwrap();
        assert_eq!(slot.lane_count, 2);
        assert_eq!(lanes(&slot, &events), vec![0, 1, 0]);
    }

    #[test]
    fn test_ties_put_longer_event_first() {
        let events = vec![event("Short", (9, 0), (9, 30)), event("Long", (9, 0), (12, 0))];
        let slot = layout(&events, "main-stage", day(), HourRange::full_day(), 60.0).unwrap();
        assert_eq!(lanes(&slot, &events), vec![1, 0]);
        assert_eq!(slot.entries[0].event_id, events[1].id());
    }

    #[test]
    fn test_geometry() {
        let events = vec![event("A", (9, 30), (11, 0))];
        let slot = layout(&events, "main-stage", day(), HourRange::new(8, 20).unwrap(), 100.0).unwrap();
        let entry = &slot.entries[0];
        assert_eq!(entry.start_offset_minutes, 90);
        assert_eq!(entry.duration_minutes, 90);
        assert!((entry.offset_px - 150.0).abs() < 1e-9);
        assert!((entry.width_px - 150.0).abs() < 1e-9);
        assert!(!entry.clipped);
    }

    #[test]
    fn test_minimum_visual_width() {
        let events = vec![event("Quick change", (9, 0), (9, 5))];
        let layout = TimelineLayout::new(HourRange::new(8, 20).unwrap(), 60.0)
            .unwrap()
            .with_min_visual_width(20.0);
        let slot = layout.layout(&events, "main-stage", day());
        assert!((slot.entries[0].width_px - 20.0).abs() < 1e-9);
        assert_eq!(slot.entries[0].duration_minutes, 5);
    }

    #[test]
    fn test_clamps_to_hour_range() {
        let events = vec![event("Early load-in", (6, 0), (9, 0))];
        let slot = layout(&events, "main-stage", day(), HourRange::new(8, 20).unwrap(), 60.0).unwrap();
        let entry = &slot.entries[0];
        assert_eq!(entry.start_offset_minutes, 0);
        assert_eq!(entry.duration_minutes, 60);
        assert!(entry.clipped);
    }

    #[test]
    fn test_events_outside_range_are_omitted() {
        let events = vec![event("Strike", (21, 0), (23, 0)), event("Call", (8, 0), (9, 0))];
        let slot = layout(&events, "main-stage", day(), HourRange::new(9, 20).unwrap(), 60.0).unwrap();
        assert!(slot.entries.is_empty());
        assert_eq!(slot.lane_count, 0);
        // The input is left untouched.
        assert_eq!(events.len(), 2);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(12, 12)]
    #[case(25, 26)]
    #[case(20, 8)]
    fn test_invalid_hour_ranges(#[case] start: u32, #[case] end: u32) {
        assert!(matches!(HourRange::new(start, end).unwrap_err(), CoreError::InvalidTimeRange(_)));
    }

    #[test]
    fn test_non_positive_scale_rejected() {
        assert!(TimelineLayout::new(HourRange::full_day(), 0.0).is_err());
        assert!(TimelineLayout::new(HourRange::full_day(), f64::NAN).is_err());
    }

    #[test]
    fn test_minutes_for_pixels() {
        let layout = TimelineLayout::new(HourRange::full_day(), 120.0).unwrap();
        assert_eq!(layout.minutes_for_pixels(60.0), 30);
        assert_eq!(layout.minutes_for_pixels(-30.0), -15);
    }

    #[test]
    fn test_layout_by_resource_groups() {
        let mut record = event("Fit-up", (9, 0), (12, 0)).to_record();
        record.resource_ids = vec!["genie-lift".to_string()];
        let with_lift = Event::try_from(record).unwrap();
        let plain = event("Rehearsal", (10, 0), (11, 0));

        let layout = TimelineLayout::new(HourRange::new(8, 20).unwrap(), 60.0).unwrap();
        let slots = layout.layout_by_resource(&[with_lift.clone(), plain], day());
        let names: Vec<&str> = slots.iter().map(|s| s.resource_id.as_str()).collect();
        assert_eq!(names, vec!["genie-lift", "main-stage"]);
        assert_eq!(slots[0].entries.len(), 1);
        assert_eq!(slots[1].lane_count, 2);
    }
}
