//! # Cue Core Library
//!
//! The scheduling core of a theatre-operations dashboard: recurring calls,
//! clash detection across venues and shared resources, and timeline layout
//! for drag-and-drop rescheduling.
//!
//! ## Features
//!
//! - **Recurrence Expansion**: daily/weekly/monthly/yearly rules with
//!   interval, count, until, by-day, by-month-day and by-month filters, plus
//!   skip and move exceptions
//! - **Conflict Detection**: venue, resource, participant and turnaround
//!   buffer clashes, classified as hard, warning or info
//! - **Timeline Layout**: greedy lane assignment so concurrent events never
//!   overlap visually, with pixel geometry for a configurable hour range
//! - **Rescheduling**: snapped move/resize gestures, committed through an
//!   external authority under a timeout
//!
//! ## Core Modules
//!
//! - [`models`]: Events, categories, statuses, time ranges and recurrence rules
//! - [`recurrence`]: Occurrence generation for recurring templates
//! - [`conflict`]: Pure conflict detection and buffer policies
//! - [`layout`]: Lane assignment and timeline geometry
//! - [`coordinator`]: Gesture state machine and commit protocol
//! - [`query`]: Date/resource windows over a set of events
//! - [`config`]: Scheduling configuration shared by the modules above
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cue_core::{
//!     config::SchedulingConfig,
//!     coordinator::{CommitAuthority, CommitResult, RescheduleCoordinator},
//!     error::CoreError,
//!     models::{Event, EventRecord},
//! };
//!
//! struct Store;
//!
//! #[async_trait::async_trait]
//! impl CommitAuthority for Store {
//!     async fn commit(&self, _candidate: &Event) -> Result<(), CoreError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rehearsal = Event::try_from(EventRecord {
//!         title: "Act II blocking".to_string(),
//!         ..Default::default()
//!     })?;
//!     let id = rehearsal.id();
//!
//!     let coordinator = RescheduleCoordinator::new(Store, SchedulingConfig::default(), vec![rehearsal])?;
//!     let candidate = coordinator.propose_move(id, 30)?;
//!     if let CommitResult::Rejected { conflicts } = coordinator.commit(candidate).await? {
//!         for conflict in conflicts {
//!             println!("{}", conflict.message);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod error;
pub mod layout;
pub mod models;
pub mod query;
pub mod recurrence;
