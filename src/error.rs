use chrono::{DateTime, Utc};
use thiserror::Error;

/// A line whose text does not fit any known message shape, or a sub-field
/// outside its closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} in \"{text}\"")]
pub struct FormatError {
    pub reason: String,
    pub text: String,
}

impl FormatError {
    pub(crate) fn new(reason: impl Into<String>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            text: text.to_string(),
        }
    }
}

/// A message that arrived for a raffle in the wrong lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} at {timestamp} (\"{text}\")")]
pub struct StateError {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl StateError {
    pub(crate) fn new(reason: impl Into<String>, timestamp: DateTime<Utc>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            timestamp,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructError {
    #[error("line {line_number}: {source}")]
    Format {
        line_number: u64,
        line: String,
        #[source]
        source: FormatError,
    },
    #[error(transparent)]
    State(#[from] StateError),
}

impl ReconstructError {
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::State(_))
    }
}
