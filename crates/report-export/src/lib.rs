//! Report Export
//!
//! Renders a frozen session `Report` for people and downstream tools:
//! - JSON (serde, compact or pretty)
//! - CSV (summary preamble followed by one row per event)

mod csv;
mod json;

pub use csv::CsvExporter;
pub use json::JsonExporter;

use std::path::Path;

use integrity::Report;
use thiserror::Error;
use tracing::info;

/// Export error types
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders a report into one file format
pub trait ReportExporter {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, report: &Report) -> Result<String, ExportError>;

    /// Render and write to `path`
    fn write_to(&self, report: &Report, path: &Path) -> Result<(), ExportError> {
        let body = self.render(report)?;
        std::fs::write(path, body)?;
        info!(
            "Exported {} report for session {} to {}",
            self.extension(),
            report.session_id,
            path.display()
        );
        Ok(())
    }
}
