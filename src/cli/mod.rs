// CLI module
// Terminal front-end: interactive session, slash commands, output files

mod commands;
mod output;
mod repl;

pub use commands::{format_help, Command};
pub use output::{save_report, save_transcript, SavedReport};
pub use repl::Repl;

use crate::metrics::UsageSummary;

/// Usage counts as shown by `/stats` and `qrqc stats`
pub fn format_summary(summary: &UsageSummary) -> String {
    format!(
        "Usage (last {} days):\n\
        Analyses started: {}\n\
        Analyses resumed: {}\n\
        Answers given: {}\n\
        Reports generated: {} ({:.1}% of analyses)\n\
        Reports stored: {}\n\
        Discussions exported: {}\n\
        API requests: {}\n\
        Errors: {}",
        summary.days,
        summary.sessions_started,
        summary.sessions_resumed,
        summary.questions_answered,
        summary.reports_generated,
        summary.completion_rate(),
        summary.reports_stored,
        summary.transcripts_exported,
        summary.api_requests,
        summary.errors
    )
}
