// Error kinds surfaced by the QRQC library
//
// Each variant maps to one propagation policy: validation errors never reach
// the network, transport and quota errors leave the session retryable, and
// report errors leave the Q&A intact so only report generation is retried.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QrqcError>;

#[derive(Debug, Error)]
pub enum QrqcError {
    /// Empty or otherwise unacceptable user input
    #[error("{0}")]
    Validation(String),

    /// Network failure, timeout or non-2xx status from the relay
    #[error("transport failure: {0}")]
    Transport(String),

    /// Upstream rate limiting; the service stays unavailable until `until`
    #[error("generation quota exceeded{}", until_suffix(.until))]
    QuotaExceeded { until: Option<DateTime<Utc>> },

    /// A structured reply could not be parsed as JSON
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// A saved transcript could not be reconstructed
    #[error("transcript parse error: {0}")]
    Parse(String),

    /// Report JSON lacks required top-level fields
    #[error("report data incomplete, missing: {}", .missing.join(", "))]
    IncompleteData { missing: Vec<String> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("report storage failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn until_suffix(until: &Option<DateTime<Utc>>) -> String {
    match until {
        Some(t) => format!("; unavailable until {}", t.format("%Y-%m-%d %H:%M UTC")),
        None => String::new(),
    }
}

impl QrqcError {
    /// Whether the failed call may be retried immediately.
    ///
    /// Quota failures are excluded so a rate-limited upstream is not hammered.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QrqcError::Transport(_))
    }

    /// Message suitable for showing to the person using the assistant
    pub fn user_message(&self) -> String {
        match self {
            QrqcError::Validation(msg) => msg.clone(),
            QrqcError::Transport(_) => {
                "Could not reach the assistant. Please try again.".to_string()
            }
            QrqcError::QuotaExceeded { until } => match until {
                Some(t) => format!(
                    "The assistant is temporarily unavailable (usage quota reached). Try again after {}.",
                    t.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M")
                ),
                None => "The assistant is temporarily unavailable (usage quota reached).".to_string(),
            },
            QrqcError::MalformedResponse(_) | QrqcError::IncompleteData { .. } => {
                "The generated report could not be understood. You can retry report generation."
                    .to_string()
            }
            QrqcError::Parse(msg) => format!("This transcript cannot be resumed: {}", msg),
            other => other.to_string(),
        }
    }
}

/// Append an actionable hint below an error message
pub fn wrap_error_with_suggestion(message: impl Into<String>, suggestion: &str) -> String {
    format!("{}\n\n{}", message.into(), suggestion)
}
