// Report rendering
// Template + report data + transcript -> paginated Document -> PDF bytes

pub mod data_path;
pub mod layout;
pub mod pdf;
pub mod store;
mod template;

pub use layout::{render, render_at, Color, Document, DrawItem, Page, TableRow, TextRun};
pub use pdf::to_pdf_bytes;
pub use store::{
    create_store, spawn_store, DirectoryReportStore, ProxyReportStore, ReportStore, StoredReport,
};
pub use template::{LayoutElement, ReportTemplate, DEFAULT_TABLE_COLUMNS};
