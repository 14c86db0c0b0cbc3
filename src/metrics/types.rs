// Usage event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    SessionStarted,
    SessionResumed,
    QuestionAnswered,
    ReportGenerated,
    ReportStored,
    TranscriptExported,
    /// Any request to the generative API, successful or not
    ApiRequest,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: UsageKind,
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl UsageEvent {
    pub fn new(kind: UsageKind, session_id: Uuid) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            session_id,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Event counts over a period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSummary {
    pub days: u32,
    pub sessions_started: usize,
    pub sessions_resumed: usize,
    pub questions_answered: usize,
    pub reports_generated: usize,
    pub reports_stored: usize,
    pub transcripts_exported: usize,
    pub api_requests: usize,
    pub errors: usize,
}

impl UsageSummary {
    pub fn record(&mut self, kind: UsageKind) {
        match kind {
            UsageKind::SessionStarted => self.sessions_started += 1,
            UsageKind::SessionResumed => self.sessions_resumed += 1,
            UsageKind::QuestionAnswered => self.questions_answered += 1,
            UsageKind::ReportGenerated => self.reports_generated += 1,
            UsageKind::ReportStored => self.reports_stored += 1,
            UsageKind::TranscriptExported => self.transcripts_exported += 1,
            UsageKind::ApiRequest => self.api_requests += 1,
            UsageKind::Error => self.errors += 1,
        }
    }

    /// Share of started sessions that ended with a report, in percent
    pub fn completion_rate(&self) -> f64 {
        let sessions = self.sessions_started + self.sessions_resumed;
        if sessions == 0 {
            0.0
        } else {
            self.reports_generated as f64 * 100.0 / sessions as f64
        }
    }
}
