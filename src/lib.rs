// QRQC assistant - guided problem analysis over a generative-language API
// Library exports

pub mod cli;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod metrics;
pub mod report;
pub mod transport;

pub use errors::{QrqcError, Result};
