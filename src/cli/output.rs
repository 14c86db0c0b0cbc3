// Files written for the user: PDF reports and discussion exports

use chrono::{DateTime, Local};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::conversation::{report_file_name, transcript_file_name, ChatTurn};
use crate::errors::Result;
use crate::report::{render_at, to_pdf_bytes, ReportTemplate};

/// A report written to disk
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub path: PathBuf,
    pub file_name: String,
    pub content: Vec<u8>,
    pub warnings: Vec<String>,
}

/// Render, serialize and write `report_<timestamp>.pdf` into `directory`
pub fn save_report(
    directory: &Path,
    template: &ReportTemplate,
    data: &Value,
    transcript: &[ChatTurn],
    now: DateTime<Local>,
) -> Result<SavedReport> {
    let document = render_at(template, data, transcript, now);
    let content = to_pdf_bytes(&document)?;

    std::fs::create_dir_all(directory)?;
    let file_name = report_file_name(now);
    let path = directory.join(&file_name);
    std::fs::write(&path, &content)?;

    tracing::info!(
        "Report written to {} ({} pages, {} warnings)",
        path.display(),
        document.page_count(),
        document.warnings.len()
    );

    Ok(SavedReport {
        path,
        file_name,
        content,
        warnings: document.warnings,
    })
}

/// Write `discussion_<timestamp>.txt` into `directory`
pub fn save_transcript(directory: &Path, transcript: &str, now: DateTime<Local>) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)?;
    let path = directory.join(transcript_file_name(now));
    std::fs::write(&path, transcript)?;
    tracing::info!("Discussion exported to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_report_names_file_by_timestamp() {
        let dir = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let template: ReportTemplate = serde_json::from_value(json!([
            {"type": "header", "text": "Rapport QRQC"},
            {"type": "text", "data_path": "absent"}
        ]))
        .unwrap();

        let saved = save_report(dir.path(), &template, &json!({}), &[], now).unwrap();

        assert_eq!(saved.file_name, "report_20240305_140709.pdf");
        assert!(saved.path.exists());
        assert!(saved.content.starts_with(b"%PDF"));
        assert_eq!(saved.warnings.len(), 1);
    }

    #[test]
    fn test_save_transcript() {
        let dir = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let path = save_transcript(&dir.path().join("out"), "text", now).unwrap();
        assert!(path.ends_with("discussion_20240305_140709.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "text");
    }
}
