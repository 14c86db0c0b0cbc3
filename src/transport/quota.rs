// Degraded mode after upstream rate limiting
//
// The first quota error arms the gate for a cooldown window. While armed,
// every request fails fast with `QuotaExceeded` and nothing is sent.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

use super::{PromptRequest, Transport};
use crate::errors::{QrqcError, Result};

#[derive(Debug)]
pub struct QuotaGate {
    cooldown: Duration,
    unavailable_until: Mutex<Option<DateTime<Utc>>>,
}

impl QuotaGate {
    pub fn new(cooldown_minutes: u64) -> Self {
        Self {
            cooldown: Duration::minutes(cooldown_minutes as i64),
            unavailable_until: Mutex::new(None),
        }
    }

    /// Fails with `QuotaExceeded` while the gate is armed
    pub fn check(&self) -> Result<()> {
        self.check_at(Utc::now())
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> Result<()> {
        let mut guard = self
            .unavailable_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match *guard {
            Some(until) if now < until => Err(QrqcError::QuotaExceeded { until: Some(until) }),
            Some(_) => {
                tracing::info!("Quota cooldown elapsed, assistant available again");
                *guard = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Arm the gate and return the error to surface
    pub fn trip(&self) -> QrqcError {
        self.trip_at(Utc::now())
    }

    pub fn trip_at(&self, now: DateTime<Utc>) -> QrqcError {
        let until = now + self.cooldown;
        let mut guard = self
            .unavailable_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(until);
        tracing::warn!(
            "Upstream quota exceeded; assistant unavailable until {}",
            until.format("%Y-%m-%d %H:%M UTC")
        );
        QrqcError::QuotaExceeded { until: Some(until) }
    }

    pub fn unavailable_until(&self) -> Option<DateTime<Utc>> {
        *self
            .unavailable_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn reset(&self) {
        let mut guard = self
            .unavailable_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

/// Wraps a transport with a shared [`QuotaGate`]
pub struct GatedTransport {
    inner: Arc<dyn Transport>,
    gate: Arc<QuotaGate>,
}

impl GatedTransport {
    pub fn new(inner: Arc<dyn Transport>, gate: Arc<QuotaGate>) -> Self {
        Self { inner, gate }
    }

    pub fn gate(&self) -> &Arc<QuotaGate> {
        &self.gate
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send_prompt(&self, request: &PromptRequest) -> Result<String> {
        self.gate.check()?;
        match self.inner.send_prompt(request).await {
            Err(QrqcError::QuotaExceeded { .. }) => Err(self.gate.trip()),
            other => other,
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
