use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Event, ExceptionKind, Frequency, RecurrenceRule};

/// Upper bound on interval periods scanned for a single expansion. Keeps rules
/// that can never match (e.g. the 30th of February) from spinning forever.
const MAX_PERIODS: u32 = 50_000;

/// One concrete dated instance of a recurring template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The concrete event; its id is derived from the template id and the
    /// scheduled date, so repeated expansions yield the same ids.
    pub event: Event,
    pub template_id: Uuid,
    /// 1-based position in the series; the template's own date is #1.
    pub sequence: u32,
    /// The date the rule produced, before any move exception.
    pub scheduled_date: NaiveDate,
    /// Whether a move exception relocated this occurrence.
    pub moved: bool,
}

impl Occurrence {
    /// The effective date (after exceptions).
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.event.date()
    }

    #[inline]
    pub fn start_time(&self) -> NaiveTime {
        self.event.start_time()
    }
}

/// Expands `rule` against `template` and returns the occurrences whose
/// effective date falls in `[window_start, window_end]`.
///
/// The series stops at whichever comes first of `rule.count` occurrences,
/// `rule.until`, or `window_end`. Occurrences before `window_start` are not
/// returned but still count toward `rule.count`.
pub fn expand(
    template: &Event,
    rule: &RecurrenceRule,
    window_start: NaiveDate,
    window_end: Option<NaiveDate>,
) -> Result<Vec<Occurrence>, CoreError> {
    RecurrenceExpander::new(template, rule)?.occurrences_between(window_start, window_end)
}

/// Expands a template event using its own recurrence rule.
pub fn expand_template(
    template: &Event,
    window_start: NaiveDate,
    window_end: Option<NaiveDate>,
) -> Result<Vec<Occurrence>, CoreError> {
    let rule = template.recurrence().ok_or_else(|| {
        CoreError::InvalidInput(format!("event {} has no recurrence rule", template.id()))
    })?;
    expand(template, rule, window_start, window_end)
}

/// RecurrenceExpander: occurrence generation for one template and rule.
///
/// Responsibilities:
/// 1. Validate the rule against the template's date
/// 2. Generate candidate dates period by period, honouring count and until
/// 3. Apply skip and move exceptions without disturbing sequence numbers
/// 4. Build concrete occurrence events inheriting the template's attributes
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceExpander<'a> {
    template: &'a Event,
    rule: &'a RecurrenceRule,
}

impl<'a> RecurrenceExpander<'a> {
    pub fn new(template: &'a Event, rule: &'a RecurrenceRule) -> Result<Self, CoreError> {
        rule.validate(template.date())?;
        Ok(Self { template, rule })
    }

    pub fn template(&self) -> &Event {
        self.template
    }

    pub fn rule(&self) -> &RecurrenceRule {
        self.rule
    }

    /// Occurrences with an effective date in `[start, end]`, ordered by date.
    pub fn occurrences_between(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Occurrence>, CoreError> {
        if let Some(end) = end {
            if end < start {
                return Err(CoreError::InvalidTimeRange(format!(
                    "window end {} is before window start {}",
                    end, start
                )));
            }
        } else if !self.rule.is_bounded() {
            return Err(CoreError::InvalidRule(
                "rule has neither count nor until and no window end was given".to_string(),
            ));
        }

        // A later occurrence may be moved back into the window, so scan up to
        // the latest moved date as well.
        let horizon = end.map(|end| self.latest_move_source().map_or(end, |moved| moved.max(end)));

        let mut occurrences = Vec::new();
        for (sequence, scheduled) in self.candidates(horizon) {
            if horizon.is_some_and(|h| scheduled > h) {
                break;
            }
            let Some(occurrence) = self.build(sequence, scheduled)? else {
                continue;
            };
            let date = occurrence.date();
            if date >= start && end.map_or(true, |end| date <= end) {
                occurrences.push(occurrence);
            }
        }
        occurrences.sort_by_key(|o| (o.date(), o.start_time(), o.sequence));

        debug!(
            template = %self.template.id(),
            rule = %self.rule,
            window_start = %start,
            produced = occurrences.len(),
            "expanded recurrence"
        );
        Ok(occurrences)
    }

    /// The first visible occurrence whose effective date is after `after`.
    pub fn next_occurrence_after(&self, after: NaiveDate) -> Result<Option<Occurrence>, CoreError> {
        Ok(self.earliest(1, |date| date > after)?.into_iter().next())
    }

    /// Up to `limit` visible occurrences on or after `from`, ordered by
    /// effective date.
    pub fn preview(&self, from: NaiveDate, limit: usize) -> Result<Vec<Occurrence>, CoreError> {
        self.earliest(limit, |date| date >= from)
    }

    /// The `limit` earliest occurrences by effective date that satisfy
    /// `accept`. Unmoved occurrences arrive in date order, so the scan may
    /// stop once it is past every moved source date and `limit` accepted
    /// occurrences fall on or before the current scheduled date.
    fn earliest(&self, limit: usize, accept: impl Fn(NaiveDate) -> bool) -> Result<Vec<Occurrence>, CoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let moves_until = self.latest_move_source();
        let mut found = Vec::new();
        for (sequence, scheduled) in self.candidates(None) {
            if let Some(occurrence) = self.build(sequence, scheduled)? {
                if accept(occurrence.date()) {
                    found.push(occurrence);
                }
            }
            let past_moves = moves_until.map_or(true, |moved| scheduled >= moved);
            if past_moves && found.iter().filter(|o| o.date() <= scheduled).count() >= limit {
                break;
            }
        }
        found.sort_by_key(|o| (o.date(), o.start_time(), o.sequence));
        found.truncate(limit);
        Ok(found)
    }

    /// Latest scheduled date that a move exception relocates.
    fn latest_move_source(&self) -> Option<NaiveDate> {
        self.rule
            .exceptions
            .iter()
            .filter(|e| matches!(e.kind, ExceptionKind::Move { .. }))
            .map(|e| e.date)
            .max()
    }

    fn candidates(&self, horizon: Option<NaiveDate>) -> CandidateDates<'a> {
        CandidateDates {
            rule: self.rule,
            anchor: self.template.date(),
            horizon,
            period: 0,
            pending: VecDeque::new(),
            emitted: 0,
            finished: false,
        }
    }

    /// Applies exceptions; `None` means the occurrence is skipped.
    fn build(&self, sequence: u32, scheduled: NaiveDate) -> Result<Option<Occurrence>, CoreError> {
        let (date, start_time, moved) = match self.rule.exception_for(scheduled) {
            Some(ExceptionKind::Skip) => return Ok(None),
            Some(ExceptionKind::Move { to, start_time }) => {
                (*to, start_time.unwrap_or_else(|| self.template.start_time()), true)
            }
            None => (scheduled, self.template.start_time(), false),
        };

        let event = self.template.occurrence(scheduled, date, start_time, sequence)?;

        Ok(Some(Occurrence {
            event,
            template_id: self.template.id(),
            sequence,
            scheduled_date: scheduled,
            moved,
        }))
    }
}

/// Sequence-numbered scheduled dates of a series, in ascending order.
struct CandidateDates<'a> {
    rule: &'a RecurrenceRule,
    anchor: NaiveDate,
    horizon: Option<NaiveDate>,
    period: u32,
    pending: VecDeque<NaiveDate>,
    emitted: u32,
    finished: bool,
}

impl Iterator for CandidateDates<'_> {
    type Item = (u32, NaiveDate);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if let Some(date) = self.pending.pop_front() {
                let past_until = self.rule.until.is_some_and(|until| date > until);
                let count_reached = self.rule.count.is_some_and(|count| self.emitted >= count);
                if past_until || count_reached {
                    self.finished = true;
                    break;
                }
                self.emitted += 1;
                return Some((self.emitted, date));
            }
            self.refill();
        }
        None
    }
}

impl CandidateDates<'_> {
    fn refill(&mut self) {
        if self.period >= MAX_PERIODS {
            self.finished = true;
            return;
        }
        let Some((period_start, dates)) = period_candidates(self.rule, self.anchor, self.period) else {
            self.finished = true;
            return;
        };
        if self.horizon.is_some_and(|h| period_start > h) {
            self.finished = true;
            return;
        }
        if self.period == 0 {
            self.pending.push_back(self.anchor);
        }
        self.pending.extend(dates.into_iter().filter(|d| *d > self.anchor));
        self.period += 1;
    }
}

/// Start date of the `period`-th interval period and the sorted candidate
/// dates inside it. `None` once dates leave the representable range.
fn period_candidates(rule: &RecurrenceRule, anchor: NaiveDate, period: u32) -> Option<(NaiveDate, BTreeSet<NaiveDate>)> {
    let step = u64::from(period) * u64::from(rule.interval);
    let mut dates = BTreeSet::new();

    match rule.frequency {
        Frequency::Daily => {
            let day = anchor.checked_add_days(Days::new(step))?;
            if matches_filters(rule, day) {
                dates.insert(day);
            }
            Some((day, dates))
        }
        Frequency::Weekly => {
            let monday = anchor.checked_sub_days(Days::new(u64::from(anchor.weekday().num_days_from_monday())))?;
            let week_start = monday.checked_add_days(Days::new(step.checked_mul(7)?))?;
            let weekdays: Vec<Weekday> = if rule.by_day.is_empty() {
                vec![anchor.weekday()]
            } else {
                rule.by_day.clone()
            };
            for weekday in weekdays {
                let day = week_start.checked_add_days(Days::new(u64::from(weekday.num_days_from_monday())))?;
                if rule.by_month.is_empty() || rule.by_month.contains(&day.month()) {
                    dates.insert(day);
                }
            }
            Some((week_start, dates))
        }
        Frequency::Monthly => {
            let (year, month) = add_months(anchor, step)?;
            let month_start = NaiveDate::from_ymd_opt(year, month, 1)?;
            if rule.by_month.is_empty() || rule.by_month.contains(&month) {
                dates.extend(month_candidates(rule, year, month, anchor.day()));
            }
            Some((month_start, dates))
        }
        Frequency::Yearly => {
            let year = i32::try_from(i64::from(anchor.year()) + i64::try_from(step).ok()?).ok()?;
            let year_start = NaiveDate::from_ymd_opt(year, 1, 1)?;
            let months: Vec<u32> = if rule.by_month.is_empty() {
                vec![anchor.month()]
            } else {
                rule.by_month.clone()
            };
            for month in months {
                dates.extend(month_candidates(rule, year, month, anchor.day()));
            }
            Some((year_start, dates))
        }
    }
}

/// Dates in one month selected by by-month-day / by-day, falling back to the
/// anchor's day of month. Days the month does not have are skipped.
fn month_candidates(rule: &RecurrenceRule, year: i32, month: u32, anchor_day: u32) -> Vec<NaiveDate> {
    let Some(length) = days_in_month(year, month) else {
        return Vec::new();
    };

    if !rule.by_month_day.is_empty() {
        rule.by_month_day
            .iter()
            .filter_map(|value| resolve_month_day(*value, length))
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| rule.by_day.is_empty() || rule.by_day.contains(&date.weekday()))
            .collect()
    } else if !rule.by_day.is_empty() {
        (1..=length)
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| rule.by_day.contains(&date.weekday()))
            .collect()
    } else {
        NaiveDate::from_ymd_opt(year, month, anchor_day).into_iter().collect()
    }
}

/// Filters applied to daily candidates.
fn matches_filters(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    if !rule.by_month.is_empty() && !rule.by_month.contains(&date.month()) {
        return false;
    }
    if !rule.by_day.is_empty() && !rule.by_day.contains(&date.weekday()) {
        return false;
    }
    if !rule.by_month_day.is_empty() {
        let Some(length) = days_in_month(date.year(), date.month()) else {
            return false;
        };
        return rule
            .by_month_day
            .iter()
            .filter_map(|value| resolve_month_day(*value, length))
            .any(|day| day == date.day());
    }
    true
}

fn resolve_month_day(value: i8, length: u32) -> Option<u32> {
    let value = i64::from(value);
    let day = if value > 0 { value } else { i64::from(length) + 1 + value };
    (1..=i64::from(length)).contains(&day).then(|| day as u32)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

fn add_months(anchor: NaiveDate, months: u64) -> Option<(i32, u32)> {
    let total = i64::from(anchor.year()) * 12 + i64::from(anchor.month0()) + i64::try_from(months).ok()?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}
