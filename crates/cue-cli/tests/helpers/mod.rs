#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary events file
pub struct CliTestHarness {
    temp_dir: TempDir,
    events_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with an empty working directory
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let events_path = temp_dir.path().join("events.json");

        Self { temp_dir, events_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cue").expect("Failed to find cue binary");

        // The binary reads cue.toml from its working directory
        cmd.current_dir(self.temp_dir.path());
        cmd.env("CUE_EVENTS_FILE", &self.events_path);
        cmd.env_remove("CUE_LOG");

        cmd
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Seed the events file with raw JSON
    pub fn write_events(&self, json: &str) {
        std::fs::write(&self.events_path, json).expect("Failed to write events file");
    }

    pub fn write_config(&self, toml: &str) {
        std::fs::write(self.temp_dir.path().join("cue.toml"), toml).expect("Failed to write config");
    }

    /// The stored records as JSON values
    pub fn stored_events(&self) -> Vec<Value> {
        let contents = std::fs::read_to_string(&self.events_path).expect("Failed to read events file");
        serde_json::from_str(&contents).expect("Events file is not a JSON array")
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const REHEARSAL_ID: &'static str = "1a2b3c4d-0000-4000-8000-000000000001";
    pub const SHOW_ID: &'static str = "5e6f7a8b-0000-4000-8000-000000000002";
    pub const FITTING_ID: &'static str = "9c0d1e2f-0000-4000-8000-000000000003";
    pub const CLASS_ID: &'static str = "77aa88bb-0000-4000-8000-000000000004";

    /// One day on the main stage plus a recurring company class
    pub fn opening_week() -> String {
        format!(
            r#"[
  {{
    "id": "{rehearsal}",
    "title": "Fight rehearsal",
    "category": "rehearsal",
    "date": "2025-04-12",
    "start_time": "15:00:00",
    "end_time": "16:00:00",
    "resource_ids": ["follow-spot"]
  }},
  {{
    "id": "{show}",
    "title": "Opening night",
    "category": "performance",
    "status": "confirmed",
    "date": "2025-04-12",
    "start_time": "19:30:00",
    "end_time": "22:00:00",
    "venue_id": "main-stage",
    "resource_ids": ["follow-spot"]
  }},
  {{
    "id": "{fitting}",
    "title": "Costume fitting",
    "category": "other",
    "date": "2025-04-12",
    "start_time": "16:00:00",
    "end_time": "17:00:00",
    "participant_ids": ["lead-actor"]
  }},
  {{
    "id": "{class}",
    "title": "Company class",
    "category": "rehearsal",
    "date": "2025-04-07",
    "start_time": "10:00:00",
    "end_time": "11:00:00",
    "venue_id": "studio-a",
    "participant_ids": ["lead-actor"],
    "recurrence": {{"frequency": "daily", "count": 6}}
  }}
]"#,
            rehearsal = Self::REHEARSAL_ID,
            show = Self::SHOW_ID,
            fitting = Self::FITTING_ID,
            class = Self::CLASS_ID,
        )
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    pub fn has_event_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Title"))
            .and(predicate::str::contains("Category"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
