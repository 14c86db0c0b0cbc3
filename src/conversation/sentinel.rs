// Readiness detection
//
// The sentinel phrase in an assistant reply is the only signal that moves a
// session from questioning to report generation. It is kept behind a trait
// so a structured signal can replace it without touching the engine.

use crate::config::constants::DEFAULT_READY_SENTINEL;

pub trait ReadinessDetector: Send + Sync {
    /// True when `reply` says enough information has been gathered
    fn is_ready(&self, reply: &str) -> bool;
}

/// Verbatim, case-sensitive substring match on a fixed phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelPhrase {
    phrase: String,
}

impl SentinelPhrase {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }
}

impl Default for SentinelPhrase {
    fn default() -> Self {
        Self::new(DEFAULT_READY_SENTINEL)
    }
}

impl ReadinessDetector for SentinelPhrase {
    fn is_ready(&self, reply: &str) -> bool {
        !self.phrase.is_empty() && reply.contains(&self.phrase)
    }
}
