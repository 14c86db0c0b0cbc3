// Usage logger
//
// One JSONL file per UTC day under the usage directory.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use super::types::{UsageEvent, UsageSummary};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct UsageLogger {
    usage_dir: PathBuf,
}

impl UsageLogger {
    pub fn new(usage_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&usage_dir).with_context(|| {
            format!("Failed to create usage directory: {}", usage_dir.display())
        })?;

        Ok(Self { usage_dir })
    }

    /// Append an event to the file of the day it happened
    pub fn log(&self, event: &UsageEvent) -> Result<()> {
        let day = event.timestamp.format(DATE_FORMAT).to_string();
        let log_file = self.usage_dir.join(format!("{}.jsonl", day));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open usage log: {}", log_file.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize usage event")?;

        writeln!(file, "{}", json).context("Failed to write usage event")?;

        Ok(())
    }

    /// Log without failing the caller; problems only reach the tracing output
    pub fn record(&self, event: UsageEvent) {
        if let Err(e) = self.log(&event) {
            tracing::warn!("Could not record usage event {:?}: {:#}", event.kind, e);
        }
    }

    /// Events of one day (`YYYY-MM-DD`)
    pub fn read_events(&self, date: &str) -> Result<Vec<UsageEvent>> {
        let log_file = self.usage_dir.join(format!("{}.jsonl", date));

        if !log_file.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&log_file)
            .with_context(|| format!("Failed to read usage log: {}", log_file.display()))?;

        let events: Vec<UsageEvent> = contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse usage log: {}", log_file.display()))?;

        Ok(events)
    }

    /// Counts over the last `days` days, today included
    pub fn summary(&self, days: u32) -> Result<UsageSummary> {
        let today = Utc::now().date_naive();
        let mut summary = UsageSummary {
            days,
            ..UsageSummary::default()
        };

        for offset in 0..days {
            let date = today - Duration::days(offset as i64);
            for event in self.read_events(&date.format(DATE_FORMAT).to_string())? {
                summary.record(event.kind);
            }
        }

        Ok(summary)
    }

    /// Delete day files older than `keep_days`; returns how many were removed
    pub fn prune(&self, keep_days: u32) -> Result<usize> {
        let cutoff = Utc::now().date_naive() - Duration::days(keep_days as i64);
        let mut removed = 0;

        let entries = fs::read_dir(&self.usage_dir).with_context(|| {
            format!("Failed to list usage directory: {}", self.usage_dir.display())
        })?;

        for entry in entries {
            let path = entry?.path();
            let Some(stem) = path
                .extension()
                .filter(|ext| *ext == "jsonl")
                .and_then(|_| path.file_stem())
                .and_then(|s| s.to_str())
            else {
                continue;
            };

            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                if date < cutoff {
                    fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            tracing::info!("Pruned {} old usage log files", removed);
        }
        Ok(removed)
    }
}
