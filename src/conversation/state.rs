// Session state for one QRQC interview

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Role name on the generative API wire ("model" for the assistant)
    pub fn api_role(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default)]
    pub is_initial_problem: bool,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            is_initial_problem: false,
        }
    }

    pub fn initial_problem(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            is_initial_problem: true,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            is_initial_problem: false,
        }
    }
}

/// Where a session stands in the interview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No turn recorded yet
    Idle,
    /// Problem statement recorded, first reply pending
    AwaitingInitial,
    /// Assistant is still asking questions
    QuestionLoop,
    /// Sentinel seen; only report generation remains
    ReadyForReport,
    /// Report data attached
    Terminal,
}

/// Transcript and flags of one session
///
/// Mutated only through [`super::ConversationEngine`]. Each session owns its
/// state; nothing is shared between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub(crate) turns: Vec<ChatTurn>,
    pub(crate) ready_for_report: bool,
    pub(crate) question_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) report: Option<Value>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn ready_for_report(&self) -> bool {
        self.ready_for_report
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn report(&self) -> Option<&Value> {
        self.report.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.report.is_some() {
            Phase::Terminal
        } else if self.ready_for_report {
            Phase::ReadyForReport
        } else if self.turns.is_empty() {
            Phase::Idle
        } else if self.turns.iter().any(|t| t.speaker == Speaker::Assistant) {
            Phase::QuestionLoop
        } else {
            Phase::AwaitingInitial
        }
    }

    /// The problem statement as the user typed it
    pub fn initial_problem(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|t| t.is_initial_problem)
            .map(|t| t.text.as_str())
    }

    pub fn last_user_turn(&self) -> Option<&ChatTurn> {
        self.turns.iter().rev().find(|t| t.speaker == Speaker::User)
    }

    pub fn last_assistant_turn(&self) -> Option<&ChatTurn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.speaker == Speaker::Assistant)
    }
}
