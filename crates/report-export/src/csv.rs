use integrity::{Event, EventKind, Report};

use crate::{ExportError, ReportExporter};

/// Summary `field,value` rows, a blank line, then `timestamp,type,detail`
/// rows with the detail as compact JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    fn summary(report: &Report) -> Vec<(String, String)> {
        let mut rows = vec![
            ("session_id".to_string(), report.session_id.to_string()),
            ("candidate".to_string(), report.candidate_name.clone()),
            ("started_at".to_string(), report.started_at.to_rfc3339()),
            ("ended_at".to_string(), report.ended_at.to_rfc3339()),
            ("duration".to_string(), report.duration.clone()),
            ("integrity_score".to_string(), report.integrity_score.to_string()),
            ("detection_status".to_string(), report.detection_status.as_str().to_string()),
        ];
        for kind in EventKind::ALL {
            if kind == EventKind::SessionReport {
                continue;
            }
            rows.push((format!("count_{}", kind), report.count(kind).to_string()));
        }
        rows
    }

    fn detail_json(event: &Event) -> Result<String, ExportError> {
        let tagged =
            serde_json::to_value(&event.detail).map_err(|e| ExportError::Serialization(e.to_string()))?;
        let detail = tagged.get("detail").cloned().unwrap_or(serde_json::Value::Null);
        serde_json::to_string(&detail).map_err(|e| ExportError::Serialization(e.to_string()))
    }
}

impl ReportExporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, report: &Report) -> Result<String, ExportError> {
        let mut out = String::new();

        out.push_str("field,value\n");
        for (field, value) in Self::summary(report) {
            push_row(&mut out, &[field.as_str(), value.as_str()]);
        }

        out.push('\n');
        out.push_str("timestamp,type,detail\n");
        for event in &report.events {
            let timestamp = event.timestamp.to_rfc3339();
            let detail = Self::detail_json(event)?;
            push_row(
                &mut out,
                &[timestamp.as_str(), event.kind().as_str(), detail.as_str()],
            );
        }
        Ok(out)
    }
}

fn push_row(out: &mut String, cells: &[&str]) {
    let line = cells.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

/// RFC 4180 quoting
fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use integrity::{DetectionStatus, EventDetail};
    use perception::FaceBox;
    use uuid::Uuid;

    fn report(candidate: &str) -> Report {
        let start = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
        let end = DateTime::<Utc>::from_timestamp_millis(65_000).unwrap();
        Report {
            session_id: Uuid::nil(),
            candidate_name: candidate.into(),
            started_at: start,
            ended_at: end,
            duration_ms: 65_000,
            duration: "1m 05s".into(),
            counts: [(EventKind::ObjectDetected, 1), (EventKind::MultipleFaces, 1)]
                .into_iter()
                .collect(),
            integrity_score: 77,
            detection_status: DetectionStatus::Full,
            events: vec![
                Event::new(end, EventDetail::MultipleFaces { count: 2 }),
                Event::new(
                    start,
                    EventDetail::ObjectDetected {
                        object: "cell phone".into(),
                        model_class: "cell phone".into(),
                        score: 0.5,
                        bbox: FaceBox::new(1.0, 2.0, 3.0, 4.0).unwrap(),
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_layout() {
        let body = CsvExporter.render(&report("Doe, Jane")).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "field,value");
        assert!(lines.contains(&"candidate,\"Doe, Jane\""));
        assert!(lines.contains(&"integrity_score,77"));
        assert!(lines.contains(&"count_object_detected,1"));
        assert!(!body.contains("count_session_report"));

        let header = lines.iter().position(|l| *l == "timestamp,type,detail").unwrap();
        assert_eq!(lines[header - 1], "");
        assert_eq!(
            lines[header + 1],
            "1970-01-01T00:01:05+00:00,multiple_faces,\"{\"\"count\"\":2}\""
        );
        assert!(lines[header + 2].starts_with("1970-01-01T00:00:00+00:00,object_detected,\""));
        assert_eq!(lines.len(), header + 3);
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("report-{}.csv", Uuid::new_v4()));
        CsvExporter.write_to(&report("alice"), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("field,value\n"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_every_row_is_terminated() {
        let body = CsvExporter.render(&report("alice")).unwrap();
        assert!(body.ends_with('\n'));
        assert!(!body.contains("\n\n\n"));
        assert_eq!(body.matches('\n').count(), body.lines().count());
    }
}
