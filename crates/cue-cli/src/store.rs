use async_trait::async_trait;
use cue_core::coordinator::CommitAuthority;
use cue_core::error::CoreError;
use cue_core::models::Event;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::error::CliError;

/// Event records kept as a pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is an empty schedule.
    pub async fn load(&self) -> Result<Vec<Event>, CliError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CliError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|source| CliError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    pub async fn save(&self, events: &[Event]) -> Result<(), CliError> {
        let json = serde_json::to_string_pretty(events).map_err(|source| CliError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        let io_error = |source| CliError::Io {
            path: self.path.clone(),
            source,
        };

        // Staged write, then rename over the target.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await.map_err(io_error)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(io_error)?;
        debug!(path = %self.path.display(), events = events.len(), "saved events");
        Ok(())
    }

    /// Replaces the stored event with the same id, or appends it.
    pub async fn upsert(&self, event: Event) -> Result<(), CliError> {
        let mut events = self.load().await?;
        match events.iter_mut().find(|e| e.id() == event.id()) {
            Some(existing) => *existing = event,
            None => events.push(event),
        }
        self.save(&events).await
    }
}

#[async_trait]
impl CommitAuthority for EventStore {
    async fn commit(&self, candidate: &Event) -> Result<(), CoreError> {
        self.upsert(candidate.clone())
            .await
            .map_err(|e| CoreError::Authority(e.to_string()))
    }
}
