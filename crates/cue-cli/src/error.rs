use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Ambiguous ID")]
    AmbiguousId(Vec<(String, String)>),
    #[error("Could not access events file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Events file '{}' is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Change rejected: {0} hard conflict(s)")]
    Rejected(usize),
    #[error("{0} hard conflict(s) found")]
    HardConflicts(usize),
    #[error("Failed to parse {kind} '{input}': {reason}")]
    Parse {
        kind: &'static str,
        input: String,
        reason: String,
    },
}

impl CliError {
    pub fn parse(kind: &'static str, input: &str, reason: impl ToString) -> Self {
        CliError::Parse {
            kind,
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}
