// Plain-text discussion export and its parser
//
// Format:
//
//   QRQC discussion transcript exported on 14/10/2026 09:37:00
//
//   User: Machine X stops frequently
//
//   Assistant: Since when does it happen?
//
// Entries are separated by one blank line. A paragraph that does not start
// with a speaker label continues the previous entry, so multi-paragraph
// replies survive the round trip. A continuation paragraph that would read
// as a label (or starts with a backslash) is written with a leading `\`.

use chrono::{DateTime, Local};

use super::state::{ChatTurn, Speaker};
use crate::errors::{QrqcError, Result};

pub const TRANSCRIPT_HEADER: &str = "QRQC discussion transcript";

const USER_LABEL: &str = "User:";
const ASSISTANT_LABEL: &str = "Assistant:";
const ESCAPE: char = '\\';

pub(crate) fn label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => USER_LABEL,
        Speaker::Assistant => ASSISTANT_LABEL,
    }
}

/// Serialize turns with a header stamped at `now`
pub fn format_transcript(turns: &[ChatTurn], now: DateTime<Local>) -> String {
    let header = format!(
        "{} exported on {}",
        TRANSCRIPT_HEADER,
        now.format("%d/%m/%Y %H:%M:%S")
    );

    let entries: Vec<String> = turns
        .iter()
        .map(|turn| format!("{} {}", label(turn.speaker), escape_paragraphs(&turn.text)))
        .collect();

    format!("{}\n\n{}\n", header, entries.join("\n\n"))
}

/// Recover the turn sequence from an exported transcript
///
/// The first recovered turn must come from the user and is flagged as the
/// initial problem statement.
pub fn parse_transcript(content: &str) -> Result<Vec<ChatTurn>> {
    let normalized = content.replace("\r\n", "\n");
    let normalized = normalized.strip_prefix('\u{feff}').unwrap_or(&normalized);
    let normalized = normalized.strip_suffix('\n').unwrap_or(normalized);

    let (header, body) = normalized.split_once('\n').unwrap_or((normalized, ""));
    if !header.trim_start().starts_with(TRANSCRIPT_HEADER) {
        return Err(QrqcError::Parse(format!(
            "missing '{}' header line",
            TRANSCRIPT_HEADER
        )));
    }
    let body = body.strip_prefix('\n').unwrap_or(body);

    let mut turns: Vec<ChatTurn> = Vec::new();
    for chunk in body.split("\n\n") {
        let trimmed = chunk.trim_start_matches('\n');
        let leading_newlines = &chunk[..chunk.len() - trimmed.len()];

        match split_label(trimmed) {
            Some((speaker, text)) => {
                if let Some(previous) = turns.last_mut() {
                    previous.text.push_str(leading_newlines);
                }
                turns.push(ChatTurn {
                    speaker,
                    text: text.to_string(),
                    is_initial_problem: false,
                });
            }
            None => match turns.last_mut() {
                Some(previous) => {
                    previous.text.push_str("\n\n");
                    previous.text.push_str(&unescape_paragraph(chunk));
                }
                None if chunk.trim().is_empty() => {}
                None => {
                    return Err(QrqcError::Parse(
                        "text found before the first speaker label".to_string(),
                    ))
                }
            },
        }
    }

    match turns.first_mut() {
        Some(first) if first.speaker == Speaker::User => first.is_initial_problem = true,
        Some(_) => {
            return Err(QrqcError::Parse(
                "the first entry must be the user's problem statement".to_string(),
            ))
        }
        None => return Err(QrqcError::Parse("no user turn found".to_string())),
    }

    Ok(turns)
}

fn split_label(chunk: &str) -> Option<(Speaker, &str)> {
    let (speaker, rest) = if let Some(rest) = chunk.strip_prefix(USER_LABEL) {
        (Speaker::User, rest)
    } else if let Some(rest) = chunk.strip_prefix(ASSISTANT_LABEL) {
        (Speaker::Assistant, rest)
    } else {
        return None;
    };
    Some((speaker, rest.strip_prefix(' ').unwrap_or(rest)))
}

fn needs_escape(paragraph: &str) -> bool {
    let start = paragraph.trim_start_matches('\n');
    start.starts_with(USER_LABEL) || start.starts_with(ASSISTANT_LABEL) || start.starts_with(ESCAPE)
}

/// Paragraphs split the same way the parser splits the body, so the
/// escape lands at the start of exactly the chunks it will see
fn escape_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .enumerate()
        .map(|(i, paragraph)| {
            if i > 0 && needs_escape(paragraph) {
                let start = paragraph.trim_start_matches('\n');
                let newlines = &paragraph[..paragraph.len() - start.len()];
                format!("{}{}{}", newlines, ESCAPE, start)
            } else {
                paragraph.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn unescape_paragraph(chunk: &str) -> String {
    let start = chunk.trim_start_matches('\n');
    match start.strip_prefix(ESCAPE) {
        Some(rest) => format!("{}{}", &chunk[..chunk.len() - start.len()], rest),
        None => chunk.to_string(),
    }
}

/// File name for an exported transcript, e.g. `discussion_20261014_093700.txt`
pub fn transcript_file_name(now: DateTime<Local>) -> String {
    format!(
        "discussion_{}.txt",
        now.format(crate::config::constants::FILE_TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 14, 9, 37, 0).unwrap()
    }

    fn sample_turns() -> Vec<ChatTurn> {
        vec![
            ChatTurn::initial_problem("Machine X stops frequently"),
            ChatTurn::assistant("Since when does it happen?"),
            ChatTurn::user("Since Monday"),
        ]
    }

    #[test]
    fn test_format_layout() {
        let text = format_transcript(&sample_turns(), fixed_now());
        assert_eq!(
            text,
            "QRQC discussion transcript exported on 14/10/2026 09:37:00\n\n\
             User: Machine X stops frequently\n\n\
             Assistant: Since when does it happen?\n\n\
             User: Since Monday\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let turns = sample_turns();
        let parsed = parse_transcript(&format_transcript(&turns, fixed_now())).unwrap();
        assert_eq!(parsed, turns);
    }

    #[test]
    fn test_round_trip_multi_paragraph_and_trailing_newline() {
        let turns = vec![
            ChatTurn::initial_problem("Scrap rate doubled"),
            ChatTurn::assistant("Noted.\n\nFirst question:\n- who detected it?\n"),
            ChatTurn::user("The night shift"),
        ];
        let parsed = parse_transcript(&format_transcript(&turns, fixed_now())).unwrap();
        assert_eq!(parsed, turns);
    }

    #[test]
    fn test_round_trip_paragraph_that_looks_like_a_label() {
        let turns = vec![
            ChatTurn::initial_problem("Machine X stops frequently"),
            ChatTurn::assistant("Let me summarise.\n\nUser: the machine stops\n\nIs that right?"),
            ChatTurn::user("Yes\n\n\\n is not a newline\n\n\nAssistant: quoted"),
        ];
        let text = format_transcript(&turns, fixed_now());
        assert!(text.contains("\n\n\\User: the machine stops"));

        let parsed = parse_transcript(&text).unwrap();
        assert_eq!(parsed, turns);
    }

    #[test]
    fn test_parse_accepts_crlf() {
        let text = format_transcript(&sample_turns(), fixed_now()).replace('\n', "\r\n");
        let parsed = parse_transcript(&text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].is_initial_problem);
    }

    #[test]
    fn test_parse_missing_header() {
        let err = parse_transcript("User: hello\n\nAssistant: hi\n").unwrap_err();
        assert!(matches!(err, QrqcError::Parse(_)));
    }

    #[test]
    fn test_parse_without_user_turn() {
        let err = parse_transcript(&format!("{} exported on x\n\n", TRANSCRIPT_HEADER)).unwrap_err();
        assert!(matches!(err, QrqcError::Parse(_)));

        let err = parse_transcript(&format!(
            "{} exported on x\n\nAssistant: hello\n",
            TRANSCRIPT_HEADER
        ))
        .unwrap_err();
        assert!(matches!(err, QrqcError::Parse(_)));
    }

    #[test]
    fn test_transcript_file_name() {
        assert_eq!(
            transcript_file_name(fixed_now()),
            "discussion_20261014_093700.txt"
        );
    }
}
