use chrono::{Local, NaiveDateTime};
use chrono_humanize::HumanTime;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use cue_core::conflict::{ConflictReport, ConflictSeverity};
use cue_core::layout::{HourRange, TimelineSlot};
use cue_core::models::{Event, EventCategory, EventStatus};
use cue_core::recurrence::Occurrence;
use std::collections::HashMap;
use uuid::Uuid;

use crate::util::short_id;

/// Parses `#rrggbb` into a terminal color.
pub fn hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

fn time_span(event: &Event) -> String {
    let range = event.time_range();
    format!("{}-{}", range.start().format("%H:%M"), range.end().format("%H:%M"))
}

fn humanized_start(event: &Event) -> String {
    let start = NaiveDateTime::new(event.date(), event.start_time());
    HumanTime::from(start - Local::now().naive_local()).to_string()
}

pub fn display_events(events: &[Event]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Time", "Title", "Category", "Status", "Venue", "Resources", "When"]);

    for event in events {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(event.id())));
        row.add_cell(Cell::new(event.date().format("%a %Y-%m-%d")));
        row.add_cell(Cell::new(time_span(event)));

        let mut title = String::new();
        if event.is_occurrence() {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(event.title());
        if let Some(rule) = event.recurrence() {
            title.push_str(&format!(" (Template: {})", rule));
        }
        let mut title_cell = Cell::new(title);
        title_cell = match event.status() {
            EventStatus::Cancelled => title_cell.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey),
            EventStatus::Completed => title_cell.fg(Color::DarkGrey),
            _ if event.category().is_immovable() => title_cell.add_attribute(Attribute::Bold),
            _ => title_cell,
        };
        row.add_cell(title_cell);

        let mut category_cell = Cell::new(event.category().label());
        if let Some(color) = hex_color(event.display_color()) {
            category_cell = category_cell.fg(color);
        }
        row.add_cell(category_cell);

        let status_cell = Cell::new(event.status());
        row.add_cell(match event.status() {
            EventStatus::Confirmed => status_cell.fg(Color::Green),
            EventStatus::InProgress => status_cell.fg(Color::Yellow),
            EventStatus::Cancelled => status_cell.fg(Color::DarkGrey),
            _ => status_cell,
        });

        row.add_cell(Cell::new(event.venue_id().unwrap_or("")));
        row.add_cell(Cell::new(event.resource_ids().join(", ")));
        row.add_cell(Cell::new(humanized_start(event)));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_occurrences(occurrences: &[Occurrence]) {
    if occurrences.is_empty() {
        println!("No occurrences.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Date", "Time", "Note"]);
    for occurrence in occurrences {
        let note = if occurrence.moved {
            format!("moved from {}", occurrence.scheduled_date)
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(occurrence.sequence),
            Cell::new(short_id(occurrence.event.id())),
            Cell::new(occurrence.date().format("%a %Y-%m-%d")),
            Cell::new(time_span(&occurrence.event)),
            Cell::new(note).fg(Color::Yellow),
        ]);
    }
    println!("{table}");
}

pub fn display_conflicts(reports: &[ConflictReport], events: &HashMap<Uuid, &Event>) {
    if reports.is_empty() {
        println!("No conflicts.");
        return;
    }

    let title = |id: &Uuid| events.get(id).map_or_else(|| short_id(*id), |e| e.title().to_string());
    let mut table = Table::new();
    table.set_header(vec!["Severity", "Kind", "Date", "Window", "Event", "With", "Details"]);
    for report in reports {
        let severity = Cell::new(report.severity);
        let severity = match report.severity {
            ConflictSeverity::Hard => severity.fg(Color::Red).add_attribute(Attribute::Bold),
            ConflictSeverity::Warning => severity.fg(Color::Yellow),
            ConflictSeverity::Info => severity.fg(Color::Cyan),
        };
        let date = events
            .get(&report.event_id)
            .map(|e| e.date().to_string())
            .unwrap_or_default();
        table.add_row(vec![
            severity,
            Cell::new(report.kind),
            Cell::new(date),
            Cell::new(report.window),
            Cell::new(title(&report.event_id)),
            Cell::new(title(&report.other_event_id)),
            Cell::new(&report.message),
        ]);
    }
    println!("{table}");
}

/// Prints the slot as a table plus a character chart, one column per
/// quarter hour.
pub fn display_timeline(slot: &TimelineSlot, hours: HourRange, events: &HashMap<Uuid, &Event>) {
    println!(
        "{} on {} ({} lane{})",
        slot.resource_id,
        slot.day,
        slot.lane_count,
        if slot.lane_count == 1 { "" } else { "s" }
    );

    let mut table = Table::new();
    table.set_header(vec!["Lane", "Time", "Title", "Offset px", "Width px"]);
    for entry in &slot.entries {
        let event = events.get(&entry.event_id);
        let mut time = event.map(|e| time_span(e)).unwrap_or_default();
        if entry.clipped {
            time.push_str(" (clipped)");
        }
        let mut title_cell = Cell::new(event.map_or("", |e| e.title()));
        if let Some(color) = event.and_then(|e| hex_color(e.display_color())) {
            title_cell = title_cell.fg(color);
        }
        table.add_row(vec![
            Cell::new(entry.lane),
            Cell::new(time),
            title_cell,
            Cell::new(format!("{:.1}", entry.offset_px)),
            Cell::new(format!("{:.1}", entry.width_px)),
        ]);
    }
    println!("{table}");

    let columns = ((hours.end_hour() - hours.start_hour()) * 4) as usize;
    let mut header = String::new();
    for hour in hours.start_hour()..hours.end_hour() {
        header.push_str(&format!("{:<4}", hour));
    }
    println!("     {}", header);
    for lane in 0..slot.lane_count {
        let mut cells = vec!['·'; columns];
        for entry in slot.entries.iter().filter(|e| e.lane == lane) {
            let first = (entry.start_offset_minutes / 15) as usize;
            let span = entry.duration_minutes.div_ceil(15).max(1) as usize;
            let mark = events
                .get(&entry.event_id)
                .and_then(|e| e.title().chars().next())
                .unwrap_or('#');
            for cell in cells.iter_mut().skip(first).take(span) {
                *cell = mark;
            }
        }
        println!("{:>3}  {}", lane, cells.into_iter().collect::<String>());
    }
    println!();
}

pub fn display_categories() {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Label", "Color", "Immovable"]);
    for category in EventCategory::ALL {
        let mut color_cell = Cell::new(category.color());
        if let Some(color) = hex_color(category.color()) {
            color_cell = color_cell.fg(color);
        }
        table.add_row(vec![
            Cell::new(category),
            Cell::new(category.label()),
            color_cell,
            Cell::new(if category.is_immovable() { "yes" } else { "" }),
        ]);
    }
    println!("{table}");
}
