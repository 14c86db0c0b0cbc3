// Conversation module
// Session state, readiness detection, transcript format and the engine driving them

mod engine;
mod sentinel;
mod state;
pub mod transcript;

pub use engine::{report_file_name, ConversationEngine};
pub use sentinel::{ReadinessDetector, SentinelPhrase};
pub use state::{ChatTurn, ConversationState, Phase, Speaker};
pub use transcript::{format_transcript, parse_transcript, transcript_file_name, TRANSCRIPT_HEADER};
