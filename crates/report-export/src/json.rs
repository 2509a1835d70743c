use integrity::Report;

use crate::{ExportError, ReportExporter};

/// serde rendering of the whole report
#[derive(Debug, Clone, Copy)]
pub struct JsonExporter {
    pub pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl ReportExporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, report: &Report) -> Result<String, ExportError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        rendered.map_err(|e| ExportError::Serialization(e.to_string()))
    }
}
