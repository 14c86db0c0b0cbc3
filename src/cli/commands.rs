// Slash command handling

pub const COMMANDS: [&str; 6] = ["/help", "/progress", "/export", "/report", "/stats", "/quit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Progress,
    Export,
    Report,
    Stats,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "/help" => Some(Command::Help),
            "/progress" => Some(Command::Progress),
            "/export" | "/save" => Some(Command::Export),
            "/report" => Some(Command::Report),
            "/stats" => Some(Command::Stats),
            "/quit" | "/exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

pub fn format_help() -> String {
    r#"Available commands:
  /help      - Show this help message
  /progress  - Show how far the analysis is
  /export    - Save the discussion so it can be resumed later
  /report    - Generate the PDF report (once the analysis is complete)
  /stats     - Usage over the last 30 days
  /quit      - Exit

Anything else is sent to the assistant as your answer."#
        .to_string()
}
