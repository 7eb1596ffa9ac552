//! Log export rendering.
//!
//! Three formats for the `/logs/export` endpoint: JSON lines (the log's
//! native shape), flat CSV, and a static HTML table. Rendering works on
//! the in-memory entry slice; the log file itself is never re-read.

use crate::error::ApiError;
use driftwatch_ledger::LogEntry;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One JSON object per line.
    Json,
    /// Flat columns: entry_hash, previous_hash, timestamp, data.
    Csv,
    /// Static HTML table.
    Html,
}

impl ExportFormat {
    /// Parses a format name; anything unrecognised is a 422.
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "html" => Ok(Self::Html),
            other => Err(ApiError::unprocessable(format!(
                "unsupported export format: {} (expected json, csv, or html)",
                other
            ))),
        }
    }

    /// The MIME type the response should carry.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Html => "text/html",
        }
    }

    /// File extension for the download filename.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Html => "html",
        }
    }
}

/// Renders entries in the requested format.
pub fn render(entries: &[LogEntry], format: ExportFormat) -> Result<String, ApiError> {
    match format {
        ExportFormat::Json => render_json_lines(entries),
        ExportFormat::Csv => render_csv(entries),
        ExportFormat::Html => Ok(render_html(entries, "DriftWatch Log Export")),
    }
}

fn render_json_lines(entries: &[LogEntry]) -> Result<String, ApiError> {
    let mut out = String::new();
    for entry in entries {
        let line =
            serde_json::to_string(entry).map_err(|e| ApiError::internal(e.to_string()))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

fn render_csv(entries: &[LogEntry]) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["entry_hash", "previous_hash", "timestamp", "data"])
        .map_err(|e| ApiError::internal(e.to_string()))?;

    for entry in entries {
        let data =
            serde_json::to_string(&entry.data).map_err(|e| ApiError::internal(e.to_string()))?;
        writer
            .write_record([
                entry.entry_hash.as_str(),
                entry.previous_hash.as_str(),
                &entry.timestamp.to_string(),
                &data,
            ])
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ApiError::internal(e.to_string()))
}

fn render_html(entries: &[LogEntry], title: &str) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>{}</title>\n\
         <style>\nbody {{ font-family: monospace; margin: 20px; }}\n\
         table {{ border-collapse: collapse; width: 100%; }}\n\
         th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}\n\
         th {{ background-color: #333; color: white; }}\n\
         tr:nth-child(even) {{ background-color: #f2f2f2; }}\n</style>\n\
         </head>\n<body>\n<h1>{}</h1>\n<table>\n",
        escape(title),
        escape(title)
    );

    html.push_str("<tr><th>entry_hash</th><th>previous_hash</th><th>timestamp</th><th>data</th></tr>\n");

    for entry in entries {
        let data = serde_json::to_string(&entry.data).unwrap_or_default();
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&entry.entry_hash),
            escape(&entry.previous_hash),
            entry.timestamp,
            escape(&data),
        ));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries() -> Vec<LogEntry> {
        vec![
            LogEntry {
                entry_hash: "a".repeat(64),
                previous_hash: "0".repeat(64),
                timestamp: 1000.5,
                data: json!({"drift_type": "layout"}),
            },
            LogEntry {
                entry_hash: "b".repeat(64),
                previous_hash: "a".repeat(64),
                timestamp: 1001.5,
                data: json!({"drift_type": "content", "note": "<tag>"}),
            },
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(ExportFormat::parse("json").unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::parse("csv").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("html").unwrap(), ExportFormat::Html);
        assert!(ExportFormat::parse("xml").is_err());
    }

    #[test]
    fn test_json_lines_roundtrip() {
        let rendered = render(&entries(), ExportFormat::Json).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: LogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.timestamp, 1000.5);
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let rendered = render(&entries(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("entry_hash,previous_hash,timestamp,data"));
        assert!(lines[1].contains("1000.5"));
    }

    #[test]
    fn test_html_escapes_payloads() {
        let rendered = render(&entries(), ExportFormat::Html).unwrap();
        assert!(rendered.contains("<table>"));
        assert!(rendered.contains("&lt;tag&gt;"));
        assert!(!rendered.contains("<tag>"));
    }

    #[test]
    fn test_empty_entries() {
        assert_eq!(render(&[], ExportFormat::Json).unwrap(), "");
        let csv = render(&[], ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
