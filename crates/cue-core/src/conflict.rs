use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Event, TimeRange};

/// Ordered so that `Hard` is the greatest severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Info,
    Warning,
    Hard,
}

impl ConflictSeverity {
    pub fn blocks_commit(self) -> bool {
        self == ConflictSeverity::Hard
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictSeverity::Info => write!(f, "info"),
            ConflictSeverity::Warning => write!(f, "warning"),
            ConflictSeverity::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Venue,
    Resource,
    Participant,
    Buffer,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Venue => write!(f, "venue"),
            ConflictKind::Resource => write!(f, "resource"),
            ConflictKind::Participant => write!(f, "participant"),
            ConflictKind::Buffer => write!(f, "buffer"),
        }
    }
}

/// The time span a conflict concerns: the overlap for clashes, or the gap
/// between the two events for buffer conflicts (empty when back to back).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ConflictWindow {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl From<TimeRange> for ConflictWindow {
    fn from(range: TimeRange) -> Self {
        Self {
            start: range.start(),
            end: range.end(),
        }
    }
}

impl fmt::Display for ConflictWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictReport {
    pub severity: ConflictSeverity,
    pub kind: ConflictKind,
    pub message: String,
    /// The event being checked.
    pub event_id: Uuid,
    /// The already-scheduled event it conflicts with.
    pub other_event_id: Uuid,
    pub window: ConflictWindow,
    /// Venue, resource or participant ids both events claim.
    pub shared: Vec<String>,
}

impl ConflictReport {
    pub fn blocks_commit(&self) -> bool {
        self.severity.blocks_commit()
    }
}

pub fn has_hard_conflicts(reports: &[ConflictReport]) -> bool {
    reports.iter().any(ConflictReport::blocks_commit)
}

/// Minimum gap required between consecutive bookings of a venue. Zero
/// disables the buffer check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BufferPolicy {
    #[serde(default)]
    pub default_minutes: u32,
    /// Per-venue overrides of `default_minutes`.
    #[serde(default)]
    pub venues: HashMap<String, u32>,
}

impl BufferPolicy {
    pub fn uniform(minutes: u32) -> Self {
        Self {
            default_minutes: minutes,
            venues: HashMap::new(),
        }
    }

    pub fn with_venue(mut self, venue_id: impl Into<String>, minutes: u32) -> Self {
        self.venues.insert(venue_id.into(), minutes);
        self
    }

    pub fn minutes_for(&self, venue_id: &str) -> u32 {
        self.venues.get(venue_id).copied().unwrap_or(self.default_minutes)
    }
}

/// Checks a candidate event against `existing` with a single buffer for all
/// venues.
pub fn check<'a>(
    candidate: &Event,
    existing: impl IntoIterator<Item = &'a Event>,
    buffer_minutes: u32,
) -> Vec<ConflictReport> {
    ConflictDetector::new(BufferPolicy::uniform(buffer_minutes)).check(candidate, existing)
}

/// ConflictDetector: pure venue/resource/participant/buffer clash detection.
///
/// Only events on the candidate's date are compared. Templates, cancelled
/// events and the candidate's own id are ignored. Every conflict against
/// every event is reported.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    policy: BufferPolicy,
}

impl ConflictDetector {
    pub fn new(policy: BufferPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BufferPolicy {
        &self.policy
    }

    pub fn check<'a>(&self, candidate: &Event, existing: impl IntoIterator<Item = &'a Event>) -> Vec<ConflictReport> {
        if !candidate.is_scheduled() {
            debug!(event = %candidate.id(), "skipping conflict check for unscheduled event");
            return Vec::new();
        }

        let mut reports: Vec<ConflictReport> = existing
            .into_iter()
            .filter(|other| other.id() != candidate.id() && other.date() == candidate.date() && other.is_scheduled())
            .flat_map(|other| self.check_pair(candidate, other))
            .collect();
        reports.sort_by(|a, b| {
            (a.window.start, a.kind, a.other_event_id).cmp(&(b.window.start, b.kind, b.other_event_id))
        });

        if !reports.is_empty() {
            debug!(
                event = %candidate.id(),
                conflicts = reports.len(),
                hard = has_hard_conflicts(&reports),
                "conflict check finished"
            );
        }
        reports
    }

    /// Conflicts of `event` against `other`, assuming both are scheduled on
    /// the same date.
    pub fn check_pair(&self, event: &Event, other: &Event) -> Vec<ConflictReport> {
        let mut reports = Vec::new();
        let range = event.time_range();
        let other_range = other.time_range();
        let shared_venue = match (event.venue_id(), other.venue_id()) {
            (Some(a), Some(b)) if a == b => Some(a),
            _ => None,
        };

        let Some(overlap) = range.overlap(&other_range) else {
            if let Some(venue) = shared_venue {
                if let Some(report) = self.buffer_conflict(event, other, venue) {
                    reports.push(report);
                }
            }
            return reports;
        };
        let window = ConflictWindow::from(overlap);

        if let Some(venue) = shared_venue {
            reports.push(ConflictReport {
                severity: ConflictSeverity::Hard,
                kind: ConflictKind::Venue,
                message: format!("Venue '{}' is double-booked with '{}' ({})", venue, other.title(), window),
                event_id: event.id(),
                other_event_id: other.id(),
                window,
                shared: vec![venue.to_string()],
            });
        }

        let resources = shared_ids(event.resource_ids(), other.resource_ids());
        if !resources.is_empty() {
            let severity = if event.category().is_immovable() || other.category().is_immovable() {
                ConflictSeverity::Hard
            } else {
                ConflictSeverity::Warning
            };
            reports.push(ConflictReport {
                severity,
                kind: ConflictKind::Resource,
                message: format!(
                    "Resource {} also booked by '{}' ({})",
                    resources.join(", "),
                    other.title(),
                    window
                ),
                event_id: event.id(),
                other_event_id: other.id(),
                window,
                shared: resources,
            });
        }

        let participants = shared_ids(event.participant_ids(), other.participant_ids());
        if !participants.is_empty() {
            reports.push(ConflictReport {
                severity: ConflictSeverity::Warning,
                kind: ConflictKind::Participant,
                message: format!(
                    "{} also called for '{}' ({})",
                    participants.join(", "),
                    other.title(),
                    window
                ),
                event_id: event.id(),
                other_event_id: other.id(),
                window,
                shared: participants,
            });
        }

        reports
    }

    fn buffer_conflict(&self, event: &Event, other: &Event, venue: &str) -> Option<ConflictReport> {
        let buffer = self.policy.minutes_for(venue);
        if buffer == 0 {
            return None;
        }
        let (first, second) = if event.start_time() <= other.start_time() {
            (event.time_range(), other.time_range())
        } else {
            (other.time_range(), event.time_range())
        };
        let window = ConflictWindow {
            start: first.end(),
            end: second.start(),
        };
        if window.minutes() >= i64::from(buffer) {
            return None;
        }

        Some(ConflictReport {
            severity: ConflictSeverity::Info,
            kind: ConflictKind::Buffer,
            message: format!(
                "Only {} min between this and '{}' at '{}' (buffer is {} min)",
                window.minutes(),
                other.title(),
                venue,
                buffer
            ),
            event_id: event.id(),
            other_event_id: other.id(),
            window,
            shared: vec![venue.to_string()],
        })
    }

    /// Every conflict among `events`, each unordered pair reported once from
    /// the point of view of the earlier-starting event.
    pub fn audit(&self, events: &[Event]) -> Vec<ConflictReport> {
        let scheduled: Vec<&Event> = events.iter().filter(|e| e.is_scheduled()).collect();
        let mut reports = Vec::new();
        for (i, a) in scheduled.iter().enumerate() {
            for b in &scheduled[i + 1..] {
                if a.date() != b.date() || a.id() == b.id() {
                    continue;
                }
                let (first, second) = if (a.start_time(), a.id()) <= (b.start_time(), b.id()) {
                    (*a, *b)
                } else {
                    (*b, *a)
                };
                reports.extend(self.check_pair(first, second));
            }
        }
        reports.sort_by(|a, b| (a.window.start, a.kind).cmp(&(b.window.start, b.kind)));
        reports
    }
}

fn shared_ids(a: &[String], b: &[String]) -> Vec<String> {
    let mut shared: Vec<String> = a.iter().filter(|id| b.contains(id)).cloned().collect();
    shared.sort();
    shared.dedup();
    shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCategory, EventRecord, EventStatus};
    use chrono::NaiveDate;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event(title: &str, start: (u32, u32), end: (u32, u32)) -> EventRecord {
        EventRecord {
            title: title.to_string(),
            category: EventCategory::Rehearsal,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: time(start.0, start.1),
            end_time: Some(time(end.0, end.1)),
            ..Default::default()
        }
    }

    fn at_venue(mut record: EventRecord, venue: &str) -> EventRecord {
        record.venue_id = Some(venue.to_string());
        record
    }

    fn build(record: EventRecord) -> Event {
        Event::try_from(record).unwrap()
    }

    mod venue_tests {
        use super::*;

        #[test]
        fn test_overlapping_venue_is_hard_with_window() {
            let a = build(at_venue(event("Blocking", (10, 0), (11, 0)), "main-stage"));
            let b = build(at_venue(event("Fight call", (10, 30), (11, 30)), "main-stage"));
            let reports = check(&a, [&b], 0);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].kind, ConflictKind::Venue);
            assert_eq!(reports[0].severity, ConflictSeverity::Hard);
            assert_eq!(reports[0].window, ConflictWindow { start: time(10, 30), end: time(11, 0) });
            assert_eq!(reports[0].event_id, a.id());
            assert_eq!(reports[0].other_event_id, b.id());
        }

        #[test]
        fn test_different_venues_do_not_conflict() {
            let a = build(at_venue(event("Blocking", (10, 0), (11, 0)), "main-stage"));
            let b = build(at_venue(event("Fittings", (10, 0), (11, 0)), "wardrobe"));
            assert!(check(&a, [&b], 30).is_empty());
        }

        #[test]
        fn test_other_dates_are_ignored() {
            let a = build(at_venue(event("Blocking", (10, 0), (11, 0)), "main-stage"));
            let mut other = at_venue(event("Blocking", (10, 0), (11, 0)), "main-stage");
            other.date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
            assert!(check(&a, [&build(other)], 0).is_empty());
        }

        #[test]
        fn test_same_id_and_cancelled_are_ignored() {
            let a = build(at_venue(event("Blocking", (10, 0), (11, 0)), "main-stage"));
            let mut cancelled = at_venue(event("Old call", (10, 0), (11, 0)), "main-stage");
            cancelled.status = EventStatus::Cancelled;
            let existing = vec![a.clone(), build(cancelled)];
            assert!(check(&a, &existing, 0).is_empty());
        }
    }

    mod resource_tests {
        use super::*;

        #[test]
        fn test_shared_resource_is_warning_between_movable_events() {
            let mut a = event("Sound check", (9, 0), (10, 0));
            a.resource_ids = vec!["console".to_string(), "mics".to_string()];
            let mut b = event("Band call", (9, 30), (10, 30));
            b.resource_ids = vec!["mics".to_string()];
            let reports = check(&build(a), [&build(b)], 0);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].kind, ConflictKind::Resource);
            assert_eq!(reports[0].severity, ConflictSeverity::Warning);
            assert_eq!(reports[0].shared, vec!["mics".to_string()]);
        }

        #[test]
        fn test_shared_resource_with_performance_is_hard() {
            let mut a = event("Sound check", (19, 0), (20, 0));
            a.resource_ids = vec!["mics".to_string()];
            let mut b = event("Evening show", (19, 30), (22, 0));
            b.category = EventCategory::Performance;
            b.resource_ids = vec!["mics".to_string()];
            let reports = check(&build(a), [&build(b)], 0);
            assert_eq!(reports[0].severity, ConflictSeverity::Hard);
            assert!(has_hard_conflicts(&reports));
        }

        #[test]
        fn test_participant_overlap_is_warning() {
            let mut a = event("Costume fitting", (13, 0), (14, 0));
            a.participant_ids = vec!["actor-7".to_string()];
            let mut b = event("Scene 4", (13, 30), (15, 0));
            b.participant_ids = vec!["actor-7".to_string(), "actor-2".to_string()];
            let reports = check(&build(a), [&build(b)], 0);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].kind, ConflictKind::Participant);
            assert_eq!(reports[0].severity, ConflictSeverity::Warning);
        }

        #[test]
        fn test_all_dimensions_reported_without_short_circuit() {
            let mut a = at_venue(event("Tech", (10, 0), (12, 0)), "main-stage");
            a.resource_ids = vec!["fly-system".to_string()];
            a.participant_ids = vec!["sm".to_string()];
            let mut b = at_venue(event("Notes", (11, 0), (13, 0)), "main-stage");
            b.resource_ids = vec!["fly-system".to_string()];
            b.participant_ids = vec!["sm".to_string()];
            let c = at_venue(event("Load-in", (11, 30), (12, 30)), "main-stage");

            let reports = check(&build(a), [&build(b), &build(c)], 0);
            let kinds: Vec<ConflictKind> = reports.iter().map(|r| r.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    ConflictKind::Venue,
                    ConflictKind::Resource,
                    ConflictKind::Participant,
                    ConflictKind::Venue
                ]
            );
        }
    }

    mod buffer_tests {
        use super::*;

        #[test]
        fn test_small_gap_is_info() {
            let a = build(at_venue(event("Matinee", (14, 0), (16, 55)), "main-stage"));
            let b = build(at_venue(event("Reset", (17, 0), (18, 0)), "main-stage"));
            let reports = check(&a, [&b], 15);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].kind, ConflictKind::Buffer);
            assert_eq!(reports[0].severity, ConflictSeverity::Info);
            assert_eq!(reports[0].window.minutes(), 5);
        }

        #[test]
        fn test_zero_buffer_disables_check() {
            let a = build(at_venue(event("Matinee", (14, 0), (16, 55)), "main-stage"));
            let b = build(at_venue(event("Reset", (17, 0), (18, 0)), "main-stage"));
            assert!(check(&a, [&b], 0).is_empty());
        }

        #[test]
        fn test_back_to_back_is_within_buffer() {
            let a = build(at_venue(event("Matinee", (14, 0), (17, 0)), "main-stage"));
            let b = build(at_venue(event("Reset", (17, 0), (18, 0)), "main-stage"));
            let reports = check(&a, [&b], 10);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].window.minutes(), 0);
        }

        #[test]
        fn test_per_venue_policy() {
            let a = build(at_venue(event("Matinee", (14, 0), (16, 50)), "main-stage"));
            let b = build(at_venue(event("Reset", (17, 0), (18, 0)), "main-stage"));
            let detector = ConflictDetector::new(BufferPolicy::uniform(5).with_venue("main-stage", 30));
            assert_eq!(detector.check(&a, [&b]).len(), 1);

            let relaxed = ConflictDetector::new(BufferPolicy::uniform(30).with_venue("main-stage", 0));
            assert!(relaxed.check(&a, [&b]).is_empty());
        }
    }

    mod symmetry_tests {
        use super::*;

        fn signature(reports: &[ConflictReport]) -> Vec<(ConflictKind, ConflictSeverity, ConflictWindow)> {
            let mut sig: Vec<_> = reports.iter().map(|r| (r.kind, r.severity, r.window)).collect();
            sig.sort();
            sig
        }

        #[test]
        fn test_check_is_symmetric() {
            let mut a = at_venue(event("Dress", (18, 0), (21, 0)), "main-stage");
            a.category = EventCategory::DressRehearsal;
            a.resource_ids = vec!["follow-spot".to_string()];
            let mut b = at_venue(event("Focus", (17, 0), (18, 30)), "main-stage");
            b.resource_ids = vec!["follow-spot".to_string()];
            let (a, b) = (build(a), build(b));

            assert_eq!(signature(&check(&a, [&b], 15)), signature(&check(&b, [&a], 15)));
        }

        #[test]
        fn test_audit_reports_each_pair_once() {
            let a = build(at_venue(event("A", (10, 0), (11, 0)), "main-stage"));
            let b = build(at_venue(event("B", (10, 30), (11, 30)), "main-stage"));
            let detector = ConflictDetector::default();
            let reports = detector.audit(&[a.clone(), b]);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].event_id, a.id());
        }
    }
}
