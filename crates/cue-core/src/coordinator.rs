use async_trait::async_trait;
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::conflict::{has_hard_conflicts, ConflictDetector, ConflictReport};
use crate::error::CoreError;
use crate::models::Event;

// ============================================================================
// Gesture commands
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    Start,
    End,
}

impl fmt::Display for ResizeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeEdge::Start => write!(f, "start"),
            ResizeEdge::End => write!(f, "end"),
        }
    }
}

impl FromStr for ResizeEdge {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(ResizeEdge::Start),
            "end" => Ok(ResizeEdge::End),
            other => Err(CoreError::InvalidInput(format!("unknown resize edge '{}'", other))),
        }
    }
}

/// Shift an event by a pointer delta, keeping its length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveCommand {
    pub event_id: Uuid,
    pub delta_minutes: i64,
}

/// Drag one edge of an event by a pointer delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResizeCommand {
    pub event_id: Uuid,
    pub edge: ResizeEdge,
    pub delta_minutes: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum GestureCommand {
    Move(MoveCommand),
    Resize(ResizeCommand),
}

impl GestureCommand {
    pub fn event_id(&self) -> Uuid {
        match self {
            GestureCommand::Move(command) => command.event_id,
            GestureCommand::Resize(command) => command.event_id,
        }
    }

    pub fn apply(&self, event: &Event, snap_minutes: u32) -> Result<Event, CoreError> {
        match self {
            GestureCommand::Move(command) => command.apply(event, snap_minutes),
            GestureCommand::Resize(command) => command.apply(event, snap_minutes),
        }
    }
}

impl MoveCommand {
    /// Returns the moved copy of `event`; the original is untouched.
    pub fn apply(&self, event: &Event, snap_minutes: u32) -> Result<Event, CoreError> {
        let delta = snap_delta(self.delta_minutes, snap_minutes);
        if delta == 0 {
            return Ok(event.clone());
        }
        let start = shift(event.start_time(), delta)?;
        let end = event.end_time().map(|end| shift(end, delta)).transpose()?;
        event.with_times(start, end)
    }
}

impl ResizeCommand {
    /// Returns the resized copy of `event`; the original is untouched.
    pub fn apply(&self, event: &Event, snap_minutes: u32) -> Result<Event, CoreError> {
        let delta = snap_delta(self.delta_minutes, snap_minutes);
        if delta == 0 {
            return Ok(event.clone());
        }
        match self.edge {
            ResizeEdge::Start => {
                let start = shift(event.start_time(), delta)?;
                event.with_times(start, Some(event.effective_end_time()))
            }
            ResizeEdge::End => {
                let end = shift(event.effective_end_time(), delta)?;
                event.with_times(event.start_time(), Some(end))
            }
        }
    }
}

/// Rounds a delta to the nearest multiple of `snap_minutes`, halves away from
/// zero, so that `snap_delta(-d) == -snap_delta(d)`.
pub fn snap_delta(delta_minutes: i64, snap_minutes: u32) -> i64 {
    let snap = i64::from(snap_minutes.max(1));
    let magnitude = delta_minutes.abs();
    let mut steps = magnitude / snap;
    if (magnitude % snap) * 2 >= snap {
        steps += 1;
    }
    delta_minutes.signum() * steps * snap
}

fn shift(time: NaiveTime, minutes: i64) -> Result<NaiveTime, CoreError> {
    let (shifted, wrapped) = time.overflowing_add_signed(Duration::minutes(minutes));
    if wrapped != 0 {
        return Err(CoreError::InvalidTimeRange(format!(
            "shifting {} by {} min leaves the event's day",
            time.format("%H:%M"),
            minutes
        )));
    }
    Ok(shifted)
}

// ============================================================================
// Commit authority
// ============================================================================

/// The external persistence layer that has the final say on a commit.
#[async_trait]
pub trait CommitAuthority: Send + Sync {
    /// Persists `candidate`, replacing the stored event with the same id.
    async fn commit(&self, candidate: &Event) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitResult {
    /// Persisted; warnings and infos should still be surfaced.
    Accepted {
        candidate: Event,
        warnings: Vec<ConflictReport>,
    },
    /// A hard conflict blocked the change; the caller restores its pre-drag state.
    Rejected { conflicts: Vec<ConflictReport> },
    /// The authority did not answer in time. The gesture was rolled back but
    /// the change may still have landed; retry with the same candidate.
    Timeout,
    /// Another commit for the same event is already in flight.
    GestureConflict,
}

impl CommitResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommitResult::Accepted { .. })
    }
}

// ============================================================================
// Reschedule coordinator
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    Dragging,
    Proposing,
    Committed,
    RolledBack,
}

impl GesturePhase {
    /// Dragging and Proposing hold the per-event guard; the terminal phases
    /// only record how the last gesture ended.
    pub fn is_active(self) -> bool {
        matches!(self, GesturePhase::Dragging | GesturePhase::Proposing)
    }
}

impl fmt::Display for GesturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GesturePhase::Dragging => write!(f, "dragging"),
            GesturePhase::Proposing => write!(f, "proposing"),
            GesturePhase::Committed => write!(f, "committed"),
            GesturePhase::RolledBack => write!(f, "rolled back"),
        }
    }
}

#[derive(Debug, Clone)]
struct Gesture {
    original: Event,
    candidate: Event,
    phase: GesturePhase,
}

/// RescheduleCoordinator: turns drag and resize gestures into committed
/// schedule changes.
///
/// Responsibilities:
/// 1. Track one in-flight gesture per event id and reject concurrent ones
/// 2. Produce snapped candidate events without mutating the originals
/// 3. Check candidates against the other scheduled events
/// 4. Hand clean candidates to the commit authority under a deadline
/// 5. Keep its snapshot in step with what the authority accepted
pub struct RescheduleCoordinator<A> {
    authority: A,
    config: SchedulingConfig,
    detector: ConflictDetector,
    events: RwLock<HashMap<Uuid, Event>>,
    gestures: Mutex<HashMap<Uuid, Gesture>>,
}

impl<A: CommitAuthority> RescheduleCoordinator<A> {
    pub fn new(
        authority: A,
        config: SchedulingConfig,
        events: impl IntoIterator<Item = Event>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            authority,
            detector: config.detector(),
            config,
            events: RwLock::new(events.into_iter().map(|e| (e.id(), e)).collect()),
            gestures: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Current snapshot of one event.
    pub fn event(&self, event_id: Uuid) -> Option<Event> {
        self.events.read().unwrap_or_else(PoisonError::into_inner).get(&event_id).cloned()
    }

    /// Current snapshot of all events, ordered by date and start.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date(), e.start_time(), e.id()));
        events
    }

    /// Replaces the snapshot, e.g. after the persistence layer reloaded.
    /// In-flight gestures keep their originals.
    pub fn replace_events(&self, events: impl IntoIterator<Item = Event>) {
        let mut guard = self.events.write().unwrap_or_else(PoisonError::into_inner);
        *guard = events.into_iter().map(|e| (e.id(), e)).collect();
    }

    /// Phase of the current or most recent gesture on `event_id`. A finished
    /// gesture stays visible as `Committed` or `RolledBack` until the next
    /// one begins.
    pub fn phase(&self, event_id: Uuid) -> Option<GesturePhase> {
        self.gestures().get(&event_id).map(|g| g.phase)
    }

    /// Starts a drag on `event_id`. Fails with `GestureConflict` while another
    /// gesture on the same event is in flight.
    pub fn begin(&self, event_id: Uuid) -> Result<Event, CoreError> {
        let mut gestures = self.gestures();
        self.begin_locked(&mut gestures, event_id)
    }

    fn begin_locked(&self, gestures: &mut HashMap<Uuid, Gesture>, event_id: Uuid) -> Result<Event, CoreError> {
        if is_active(gestures, event_id) {
            return Err(CoreError::GestureConflict(event_id));
        }
        let original = self
            .event(event_id)
            .ok_or_else(|| CoreError::NotFound(event_id.to_string()))?;
        if !original.is_scheduled() {
            return Err(CoreError::InvalidInput(format!(
                "event {} is a template or cancelled and cannot be rescheduled",
                event_id
            )));
        }
        gestures.insert(
            event_id,
            Gesture {
                original: original.clone(),
                candidate: original.clone(),
                phase: GesturePhase::Dragging,
            },
        );
        debug!(event = %event_id, "gesture started");
        Ok(original)
    }

    /// Applies a command to the gesture's current candidate (starting a
    /// gesture if none is in flight) and returns the new candidate.
    /// An invalid command leaves an existing drag untouched; a gesture this
    /// call started is rolled back instead.
    pub fn propose(&self, command: &GestureCommand) -> Result<Event, CoreError> {
        let mut gestures = self.gestures();
        self.propose_locked(&mut gestures, command)
    }

    fn propose_locked(&self, gestures: &mut HashMap<Uuid, Gesture>, command: &GestureCommand) -> Result<Event, CoreError> {
        let event_id = command.event_id();
        let started = !is_active(gestures, event_id);
        if started {
            self.begin_locked(gestures, event_id)?;
        }
        let gesture = gestures
            .get_mut(&event_id)
            .ok_or_else(|| CoreError::NotFound(event_id.to_string()))?;
        if gesture.phase != GesturePhase::Dragging {
            return Err(CoreError::GestureConflict(event_id));
        }

        match command.apply(&gesture.candidate, self.config.snap_minutes) {
            Ok(candidate) => {
                gesture.candidate = candidate.clone();
                Ok(candidate)
            }
            Err(e) => {
                if started {
                    gesture.phase = GesturePhase::RolledBack;
                    debug!(event = %event_id, error = %e, "invalid first proposal, gesture rolled back");
                }
                Err(e)
            }
        }
    }

    pub fn propose_move(&self, event_id: Uuid, delta_minutes: i64) -> Result<Event, CoreError> {
        self.propose(&GestureCommand::Move(MoveCommand { event_id, delta_minutes }))
    }

    pub fn propose_resize(&self, event_id: Uuid, edge: ResizeEdge, delta_minutes: i64) -> Result<Event, CoreError> {
        self.propose(&GestureCommand::Resize(ResizeCommand {
            event_id,
            edge,
            delta_minutes,
        }))
    }

    /// Abandons the gesture without consulting the detector and returns the
    /// original event for the caller to restore.
    pub fn cancel(&self, event_id: Uuid) -> Result<Event, CoreError> {
        let mut gestures = self.gestures();
        match gestures.get_mut(&event_id) {
            Some(gesture) if gesture.phase == GesturePhase::Dragging => {
                gesture.phase = GesturePhase::RolledBack;
                debug!(event = %event_id, phase = %gesture.phase, "gesture cancelled");
                Ok(gesture.original.clone())
            }
            Some(gesture) if gesture.phase == GesturePhase::Proposing => Err(CoreError::GestureConflict(event_id)),
            _ => Err(CoreError::NotFound(format!("no gesture in flight for {}", event_id))),
        }
    }

    /// Checks `candidate` against every other scheduled event and, if no hard
    /// conflict is found, persists it through the authority.
    pub async fn commit(&self, candidate: Event) -> Result<CommitResult, CoreError> {
        let event_id = candidate.id();
        {
            let mut gestures = self.gestures();
            match gestures.get_mut(&event_id) {
                Some(gesture) if gesture.phase == GesturePhase::Proposing => {
                    debug!(event = %event_id, "commit already in flight");
                    return Ok(CommitResult::GestureConflict);
                }
                Some(gesture) if gesture.phase == GesturePhase::Dragging => {
                    gesture.phase = GesturePhase::Proposing;
                    gesture.candidate = candidate.clone();
                }
                _ => {
                    let original = self
                        .event(event_id)
                        .ok_or_else(|| CoreError::NotFound(event_id.to_string()))?;
                    gestures.insert(
                        event_id,
                        Gesture {
                            original,
                            candidate: candidate.clone(),
                            phase: GesturePhase::Proposing,
                        },
                    );
                }
            }
        }

        let reports = {
            let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
            self.detector.check(&candidate, events.values())
        };

        if has_hard_conflicts(&reports) {
            self.finish(event_id, GesturePhase::RolledBack);
            info!(event = %event_id, conflicts = reports.len(), "commit rejected by hard conflicts");
            return Ok(CommitResult::Rejected { conflicts: reports });
        }

        match tokio::time::timeout(self.config.commit_timeout(), self.authority.commit(&candidate)).await {
            Ok(Ok(())) => {
                self.events
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(event_id, candidate.clone());
                self.finish(event_id, GesturePhase::Committed);
                info!(event = %event_id, warnings = reports.len(), "commit accepted");
                Ok(CommitResult::Accepted {
                    candidate,
                    warnings: reports,
                })
            }
            Ok(Err(e)) => {
                self.finish(event_id, GesturePhase::RolledBack);
                warn!(event = %event_id, error = %e, "commit authority failed");
                Err(e)
            }
            Err(_) => {
                self.finish(event_id, GesturePhase::RolledBack);
                warn!(
                    event = %event_id,
                    timeout_ms = self.config.commit_timeout_ms,
                    "commit timed out"
                );
                Ok(CommitResult::Timeout)
            }
        }
    }

    /// Proposes and commits a single command as its own gesture. Reports
    /// `GestureConflict` while another gesture holds the event.
    pub async fn apply(&self, command: &GestureCommand) -> Result<CommitResult, CoreError> {
        let event_id = command.event_id();
        let candidate = {
            let mut gestures = self.gestures();
            if is_active(&gestures, event_id) {
                debug!(event = %event_id, "apply refused, gesture in flight");
                return Ok(CommitResult::GestureConflict);
            }
            self.propose_locked(&mut gestures, command)?
        };
        self.commit(candidate).await
    }

    fn finish(&self, event_id: Uuid, phase: GesturePhase) {
        if let Some(gesture) = self.gestures().get_mut(&event_id) {
            gesture.phase = phase;
        }
        debug!(event = %event_id, phase = %phase, "gesture finished");
    }

    fn gestures(&self) -> MutexGuard<'_, HashMap<Uuid, Gesture>> {
        self.gestures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_active(gestures: &HashMap<Uuid, Gesture>, event_id: Uuid) -> bool {
    gestures.get(&event_id).is_some_and(|g| g.phase.is_active())
}
