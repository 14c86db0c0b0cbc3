// Metrics module
// Daily usage log: sessions, answers, reports and errors

mod logger;
mod types;

pub use logger::UsageLogger;
pub use types::{UsageEvent, UsageKind, UsageSummary};
