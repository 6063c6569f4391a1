use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::conflict::{BufferPolicy, ConflictDetector};
use crate::error::CoreError;
use crate::layout::{HourRange, TimelineLayout, DEFAULT_MIN_VISUAL_WIDTH};

/// Configuration for the scheduling core - shared by the coordinator, the
/// detector and the timeline. Every field has a default so partial config
/// files deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Drag and resize deltas are rounded to multiples of this many minutes
    pub snap_minutes: u32,
    /// Deadline for the commit round trip to the persistence layer
    pub commit_timeout_ms: u64,
    /// Minimum gap between bookings of the same venue
    pub buffer: BufferPolicy,
    pub timeline: TimelineConfig,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            snap_minutes: 15,
            commit_timeout_ms: 5_000,
            buffer: BufferPolicy::default(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.snap_minutes == 0 {
            return Err(CoreError::InvalidInput("snap_minutes must be at least 1".to_string()));
        }
        if self.commit_timeout_ms == 0 {
            return Err(CoreError::InvalidInput("commit_timeout_ms must be at least 1".to_string()));
        }
        self.timeline.build().map(|_| ())
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    pub fn detector(&self) -> ConflictDetector {
        ConflictDetector::new(self.buffer.clone())
    }
}

/// Default geometry of the timeline view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub pixels_per_hour: f64,
    pub min_visual_width: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 24,
            pixels_per_hour: 80.0,
            min_visual_width: DEFAULT_MIN_VISUAL_WIDTH,
        }
    }
}

impl TimelineConfig {
    pub fn build(&self) -> Result<TimelineLayout, CoreError> {
        let hours = HourRange::new(self.start_hour, self.end_hour)?;
        Ok(TimelineLayout::new(hours, self.pixels_per_hour)?.with_min_visual_width(self.min_visual_width))
    }
}
