use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Event {0} already has a gesture in flight")]
    GestureConflict(Uuid),

    #[error("Commit for event {0} timed out")]
    Timeout(Uuid),

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Commit authority failed: {0}")]
    Authority(String),
}

impl CoreError {
    /// Whether the caller may re-issue the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Timeout(_) | CoreError::Authority(_))
    }
}
