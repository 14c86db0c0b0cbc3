// Project-wide constants
//
// Import via `use crate::config::constants::*;`.

/// Reply fragment signalling that the assistant has gathered enough facts.
///
/// Matched as a verbatim substring. The prompts document may override it
/// through its `readySentinel` field.
pub const DEFAULT_READY_SENTINEL: &str = "I have enough information to generate the report.";

/// Placeholder replaced by the problem statement in the initial prompt.
pub const PROBLEM_PLACEHOLDER: &str = "{{probleme_initial}}";

/// Placeholder replaced by the user's answer in follow-up and resume prompts.
pub const RESPONSE_PLACEHOLDER: &str = "{{reponse_utilisateur}}";

/// Report field overwritten with the problem statement the user typed.
pub const DEFAULT_INITIAL_PROBLEM_PATH: &str = "etape1_detection_reaction.probleme_initial";

/// Rough number of questions a QRQC interview takes (QQOQPC + QCDSM + 5 Whys).
pub const ESTIMATED_QUESTIONS: usize = 8;

/// Upper bound for one generative request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// How long the assistant stays unavailable after a quota error, in minutes.
pub const DEFAULT_QUOTA_COOLDOWN_MINUTES: u64 = 60;

/// Timestamp format used in report and transcript file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
