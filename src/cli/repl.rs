// Interactive QRQC session in the terminal

use anyhow::Result;
use chrono::Local;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::commands::{format_help, Command, COMMANDS};
use super::output::{save_report, save_transcript};
use crate::config::Config;
use crate::conversation::{ConversationEngine, ConversationState};
use crate::errors::QrqcError;
use crate::metrics::{UsageEvent, UsageKind, UsageLogger};
use crate::report::{create_store, spawn_store, ReportStore, ReportTemplate, StoredReport};

const STORE_DRAIN_TIMEOUT_SECS: u64 = 30;
const STATS_DAYS: u32 = 30;

/// Completes and hints slash commands
struct ReplHelper;

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}

pub struct Repl {
    engine: ConversationEngine,
    template: ReportTemplate,
    output_dir: PathBuf,
    store: Option<Arc<dyn ReportStore>>,
    always_consent: bool,
    usage: UsageLogger,
    session_id: Uuid,
    pending_stores: Vec<JoinHandle<()>>,
    editor: Editor<ReplHelper, DefaultHistory>,
}

impl Repl {
    pub fn new(
        config: &Config,
        engine: ConversationEngine,
        template: ReportTemplate,
        usage: UsageLogger,
    ) -> Result<Self> {
        let mut editor: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
        editor.set_helper(Some(ReplHelper));

        Ok(Self {
            engine,
            template,
            output_dir: config.output.directory.clone(),
            store: create_store(config)?,
            always_consent: config.store.always_consent,
            usage,
            session_id: Uuid::new_v4(),
            pending_stores: Vec::new(),
            editor,
        })
    }

    /// New analysis; asks for the problem unless one is given
    pub async fn run(&mut self, problem: Option<String>) -> Result<()> {
        println!("QRQC assistant. Type /help for commands.");
        println!();

        let mut draft = problem.unwrap_or_default();
        let state = loop {
            if draft.trim().is_empty() {
                match self.read_line("Describe the problem: ", "")? {
                    Some(line) => draft = line,
                    None => return Ok(()),
                }
            }
            if let Some(Command::Quit) = Command::parse(&draft) {
                return Ok(());
            }

            self.track(UsageKind::ApiRequest, None);
            match self.engine.start_session(&draft).await {
                Ok((state, reply)) => {
                    self.track(UsageKind::SessionStarted, None);
                    self.print_reply(&reply.text, &state);
                    break state;
                }
                Err(e) => {
                    self.report_error(&e);
                    // Keep the text so it can be edited and sent again
                    match self.read_line("Describe the problem: ", &draft)? {
                        Some(line) => draft = line,
                        None => return Ok(()),
                    }
                }
            }
        };

        self.question_loop(state).await
    }

    /// Carry on from an exported discussion
    pub async fn resume(&mut self, saved: &str) -> Result<()> {
        self.track(UsageKind::ApiRequest, None);
        let (state, reply) = match self.engine.resume_session(saved).await {
            Ok(resumed) => resumed,
            Err(e) => {
                self.track(UsageKind::Error, Some(e.to_string()));
                return Err(e.into());
            }
        };
        self.track(UsageKind::SessionResumed, None);

        println!(
            "Resumed a discussion with {} answers. Type /help for commands.",
            state.question_count()
        );
        self.print_reply(&reply.text, &state);
        self.question_loop(state).await
    }

    async fn question_loop(&mut self, mut state: ConversationState) -> Result<()> {
        let mut draft = String::new();
        loop {
            let prompt = if state.ready_for_report() { "report> " } else { "you> " };
            let Some(line) = self.read_line(prompt, &std::mem::take(&mut draft))? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let _ = self.editor.add_history_entry(line.as_str());

            if let Some(command) = Command::parse(&line) {
                match command {
                    Command::Help => println!("{}", format_help()),
                    Command::Progress => println!("{}", self.engine.progress_label(&state)),
                    Command::Export => self.export(&state),
                    Command::Report => self.report(&mut state).await,
                    Command::Stats => self.print_stats(),
                    Command::Quit => break,
                }
                continue;
            }

            if line.starts_with('/') {
                println!("Unknown command: {} (type /help)", line.trim());
                continue;
            }

            if !state.ready_for_report() {
                self.track(UsageKind::ApiRequest, None);
            }
            match self.engine.submit_response(&mut state, &line).await {
                Ok(reply) => {
                    self.track(UsageKind::QuestionAnswered, None);
                    self.print_reply(&reply.text, &state);
                }
                Err(e) => {
                    self.report_error(&e);
                    draft = retry_draft(&e, &line);
                }
            }
        }

        self.finish(&state).await;
        Ok(())
    }

    async fn report(&mut self, state: &mut ConversationState) {
        if !state.ready_for_report() {
            println!("The assistant still has questions; keep answering first.");
            return;
        }

        println!("Generating the QRQC report...");
        self.track(UsageKind::ApiRequest, None);
        let data = match self.engine.generate_report(state).await {
            Ok(data) => data,
            Err(e) => {
                self.report_error(&e);
                println!("You can try /report again.");
                return;
            }
        };

        let saved = match save_report(
            &self.output_dir,
            &self.template,
            &data,
            state.turns(),
            Local::now(),
        ) {
            Ok(saved) => saved,
            Err(e) => {
                self.report_error(&e);
                return;
            }
        };
        self.track(UsageKind::ReportGenerated, Some(saved.file_name.clone()));

        println!("Report saved to {}", saved.path.display());
        for warning in &saved.warnings {
            println!("  note: {}", warning);
        }

        if let Some(store) = self.store.clone() {
            if self.store_consent() {
                let report = StoredReport {
                    file_name: saved.file_name.clone(),
                    problem_statement: state.initial_problem().unwrap_or_default().to_string(),
                    content: saved.content,
                };
                self.pending_stores.push(spawn_store(store, report));
                self.track(UsageKind::ReportStored, Some(saved.file_name));
            }
        }
    }

    fn store_consent(&mut self) -> bool {
        if self.always_consent {
            return true;
        }
        match self.read_line("Keep a copy of this report on the server? [y/N] ", "") {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "o" | "oui"),
            _ => false,
        }
    }

    fn export(&mut self, state: &ConversationState) {
        if state.turns().is_empty() {
            println!("Nothing to export yet.");
            return;
        }
        let now = Local::now();
        let text = self.engine.export_transcript_at(state, now);
        match save_transcript(&self.output_dir, &text, now) {
            Ok(path) => {
                self.track(UsageKind::TranscriptExported, None);
                println!("Discussion saved to {}", path.display());
                println!("Resume it later with: qrqc resume {}", path.display());
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn print_stats(&self) {
        match self.usage.summary(STATS_DAYS) {
            Ok(summary) => println!("{}", super::format_summary(&summary)),
            Err(e) => println!("Could not read usage log: {:#}", e),
        }
    }

    async fn finish(&mut self, state: &ConversationState) {
        if state.report().is_none() && !state.turns().is_empty() {
            println!("Tip: /export saves the discussion so it can be resumed later.");
        }

        for handle in self.pending_stores.drain(..) {
            if tokio::time::timeout(Duration::from_secs(STORE_DRAIN_TIMEOUT_SECS), handle)
                .await
                .is_err()
            {
                tracing::warn!("Report storage still running at exit; abandoning it");
            }
        }
        println!("Goodbye!");
    }

    fn print_reply(&self, text: &str, state: &ConversationState) {
        println!();
        println!("{}", text);
        println!();
        println!("[{}]", self.engine.progress_label(state));
        if state.ready_for_report() {
            println!("Type /report to generate the PDF report.");
        }
    }

    fn report_error(&self, error: &QrqcError) {
        if !matches!(error, QrqcError::Validation(_)) {
            self.track(UsageKind::Error, Some(error.to_string()));
        }
        tracing::debug!("{:?}", error);
        println!("{}", error.user_message());
    }

    fn track(&self, kind: UsageKind, detail: Option<String>) {
        let mut event = UsageEvent::new(kind, self.session_id);
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }
        self.usage.record(event);
    }

    /// `None` on end of input; Ctrl-C clears the line
    fn read_line(&mut self, prompt: &str, initial: &str) -> Result<Option<String>> {
        let result = if initial.is_empty() {
            self.editor.readline(prompt)
        } else {
            self.editor.readline_with_initial(prompt, (initial, ""))
        };

        match result {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Text offered again after a failed answer; rejected input is not kept
fn retry_draft(error: &QrqcError, line: &str) -> String {
    match error {
        QrqcError::Validation(_) => String::new(),
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_answer_is_kept_for_retry() {
        let timeout = QrqcError::Transport("request timed out".into());
        assert_eq!(retry_draft(&timeout, "Since Monday"), "Since Monday");

        let quota = QrqcError::QuotaExceeded { until: None };
        assert_eq!(retry_draft(&quota, "Since Monday"), "Since Monday");
    }

    #[test]
    fn test_rejected_answer_is_not_kept() {
        let rejected = QrqcError::Validation("The analysis is complete".into());
        assert_eq!(retry_draft(&rejected, "one more thing"), "");
    }
}
