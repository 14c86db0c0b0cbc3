// Conversation engine
//
// Drives one QRQC interview: the problem statement opens the session, each
// answer gets the next question, and the readiness phrase in a reply ends
// the questioning. The state is owned by the caller and only changes after
// the transport call succeeded.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::sync::Arc;

use super::sentinel::{ReadinessDetector, SentinelPhrase};
use super::state::{ChatTurn, ConversationState, Speaker};
use super::transcript::{format_transcript, parse_transcript};
use crate::config::constants::{ESTIMATED_QUESTIONS, FILE_TIMESTAMP_FORMAT};
use crate::config::PromptsConfig;
use crate::errors::{QrqcError, Result};
use crate::report::data_path::set_path;
use crate::transport::{PromptRequest, Transport};

pub struct ConversationEngine {
    transport: Arc<dyn Transport>,
    prompts: Arc<PromptsConfig>,
    detector: Box<dyn ReadinessDetector>,
}

impl ConversationEngine {
    /// Engine using the readiness phrase from the prompts document
    pub fn new(transport: Arc<dyn Transport>, prompts: Arc<PromptsConfig>) -> Self {
        let detector = Box::new(SentinelPhrase::new(prompts.ready_sentinel()));
        Self {
            transport,
            prompts,
            detector,
        }
    }

    pub fn with_detector(mut self, detector: impl ReadinessDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn prompts(&self) -> &PromptsConfig {
        &self.prompts
    }

    /// Open a session with the user's problem statement
    pub async fn start_session(&self, problem: &str) -> Result<(ConversationState, ChatTurn)> {
        let problem = problem.trim();
        if problem.is_empty() {
            return Err(QrqcError::Validation(
                "Please describe the problem before starting.".to_string(),
            ));
        }

        let initial = ChatTurn::initial_problem(problem);
        let request = PromptRequest::new(vec![initial.clone()], self.prompts.initial_prompt(problem));

        tracing::info!("Starting QRQC session via {}", self.transport.name());
        let reply = self.transport.send_prompt(&request).await?;

        let mut state = ConversationState::new();
        state.turns.push(initial);
        let turn = self.record_reply(&mut state, reply);
        Ok((state, turn))
    }

    /// Answer the assistant's last question
    pub async fn submit_response(
        &self,
        state: &mut ConversationState,
        answer: &str,
    ) -> Result<ChatTurn> {
        if state.turns.is_empty() {
            return Err(QrqcError::Validation(
                "No session in progress; describe the problem first.".to_string(),
            ));
        }
        if state.ready_for_report {
            return Err(QrqcError::Validation(
                "The analysis is complete; generate the report.".to_string(),
            ));
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(QrqcError::Validation(
                "Please type an answer before sending.".to_string(),
            ));
        }

        let user_turn = ChatTurn::user(answer);
        let mut history = state.turns.clone();
        history.push(user_turn.clone());
        let request = PromptRequest::new(history, self.prompts.follow_up_prompt(answer));

        let reply = self.transport.send_prompt(&request).await?;

        state.turns.push(user_turn);
        state.question_count += 1;
        tracing::debug!("Answer {} recorded", state.question_count);
        Ok(self.record_reply(state, reply))
    }

    /// Rebuild a session from an exported transcript and ask the assistant
    /// to carry on from the last answer
    pub async fn resume_session(&self, saved: &str) -> Result<(ConversationState, ChatTurn)> {
        let turns = parse_transcript(saved)?;

        let last_answer = turns
            .iter()
            .rev()
            .find(|t| t.speaker == Speaker::User)
            .map(|t| t.text.clone())
            .ok_or_else(|| QrqcError::Parse("no user turn in transcript".to_string()))?;

        let mut state = ConversationState::new();
        state.question_count = turns
            .iter()
            .filter(|t| t.speaker == Speaker::User && !t.is_initial_problem)
            .count();
        state.ready_for_report = turns
            .iter()
            .any(|t| t.speaker == Speaker::Assistant && self.detector.is_ready(&t.text));
        state.turns = turns;

        let request = PromptRequest::new(
            state.turns.clone(),
            self.prompts.resume_prompt(&last_answer),
        );

        tracing::info!(
            "Resuming session with {} turns ({} answers)",
            state.turns.len(),
            state.question_count
        );
        let reply = self.transport.send_prompt(&request).await?;

        let turn = self.record_reply(&mut state, reply);
        Ok((state, turn))
    }

    pub fn export_transcript(&self, state: &ConversationState) -> String {
        self.export_transcript_at(state, Local::now())
    }

    pub fn export_transcript_at(&self, state: &ConversationState, now: DateTime<Local>) -> String {
        format_transcript(state.turns(), now)
    }

    /// Ask for the structured report once the assistant is ready
    ///
    /// On success the report is attached to `state`. On failure the Q&A is
    /// left as is so the call can be repeated.
    pub async fn generate_report(&self, state: &mut ConversationState) -> Result<Value> {
        if !state.ready_for_report {
            return Err(QrqcError::Validation(
                "The assistant has not gathered enough information yet.".to_string(),
            ));
        }

        let request = PromptRequest::new(state.turns.clone(), self.prompts.report_prompt())
            .with_schema(self.prompts.response_schema.clone());

        tracing::info!("Requesting report data");
        let reply = self.transport.send_prompt(&request).await?;

        let mut report: Value = serde_json::from_str(strip_code_fence(&reply))
            .map_err(|e| QrqcError::MalformedResponse(e.to_string()))?;

        let Some(fields) = report.as_object() else {
            return Err(QrqcError::IncompleteData {
                missing: self.prompts.required_fields(),
            });
        };
        let missing: Vec<String> = self
            .prompts
            .required_fields()
            .into_iter()
            .filter(|field| fields.get(field).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            tracing::warn!("Report reply lacks required fields: {}", missing.join(", "));
            return Err(QrqcError::IncompleteData { missing });
        }

        // Always what the user typed, never the model's paraphrase
        if let Some(problem) = state.initial_problem() {
            set_path(
                &mut report,
                self.prompts.initial_problem_path(),
                Value::String(problem.to_string()),
            );
        }

        state.report = Some(report.clone());
        Ok(report)
    }

    /// `Question n/8` while questioning, `Analysis complete` once ready
    pub fn progress_label(&self, state: &ConversationState) -> String {
        if state.ready_for_report {
            "Analysis complete".to_string()
        } else {
            format!(
                "Question {}/{}",
                state.question_count.min(ESTIMATED_QUESTIONS),
                ESTIMATED_QUESTIONS
            )
        }
    }

    fn record_reply(&self, state: &mut ConversationState, reply: String) -> ChatTurn {
        if self.detector.is_ready(&reply) {
            tracing::info!("Assistant has enough information after {} answers", state.question_count);
            state.ready_for_report = true;
        }
        let turn = ChatTurn::assistant(reply);
        state.turns.push(turn.clone());
        turn
    }
}

/// `report_<YYYYmmdd_HHMMSS>.pdf`
pub fn report_file_name(now: DateTime<Local>) -> String {
    format!("report_{}.pdf", now.format(FILE_TIMESTAMP_FORMAT))
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(report_file_name(now), "report_20240305_140709.pdf");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }
}
