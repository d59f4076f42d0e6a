//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use sheetwise_domain::ChunkRecord;
use sheetwise_extractor::{AttributeCatalog, BatchReport, ExtractionStatus, Indicator};
use sheetwise_ingest::IngestReport;
use sheetwise_store::IndexStats;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const SNIPPET_CHARS: usize = 80;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format extraction results.
    pub fn format_report(&self, report: &BatchReport, details: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let payload = serde_json::json!({
                    "session": report.session.map(|s| s.to_string()),
                    "cancelled": report.cancelled,
                    "metadata": report.metadata,
                    "results": report.presentation(),
                });
                Ok(serde_json::to_string_pretty(&payload)?)
            }
            OutputFormat::Table => Ok(self.format_report_table(report, details)),
            OutputFormat::Quiet => Ok(report
                .results
                .iter()
                .map(|r| format!("{}\t{}", r.attribute_key, r.display_value))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_report_table(&self, report: &BatchReport, details: bool) -> String {
        if report.results.is_empty() {
            return self.warning("No attributes were extracted.");
        }

        let mut builder = Builder::default();
        let mut header = vec!["Attribute", "Value", "Status"];
        if details {
            header.extend(["Source", "Normalized JSON", "Diagnostic"]);
        }
        builder.push_record(header);

        for record in report.presentation() {
            let mut row = vec![
                record.name,
                record.display_value,
                record.status.to_string(),
            ];
            if details {
                row.extend([
                    record.source,
                    record.raw_normalized_json,
                    record.diagnostic_detail,
                ]);
            }
            builder.push_record(row);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        format!("{}\n{}", table, self.batch_summary(report))
    }

    /// One-line status tally, coloured like the result badges.
    pub fn batch_summary(&self, report: &BatchReport) -> String {
        let counts = &report.metadata.counts;
        let parts: Vec<String> = ExtractionStatus::ALL
            .iter()
            .filter(|status| counts.get(**status) > 0)
            .map(|status| {
                self.colorize(
                    &format!("{} {}", counts.get(*status), status),
                    indicator_color(status.indicator()),
                )
            })
            .collect();

        let mut summary = format!(
            "{} attributes in {:.1}s ({} calls, {}): {}",
            report.results.len(),
            report.metadata.duration_ms as f64 / 1000.0,
            report.metadata.llm_calls,
            report.metadata.model_name,
            parts.join(", ")
        );
        if report.cancelled {
            summary.push_str(&format!(
                " - cancelled after {} of {}",
                report.results.len(),
                report.metadata.attributes_requested
            ));
        }
        summary
    }

    /// Format the outcome of an ingestion run.
    pub fn format_ingest(&self, report: &IngestReport, stats: &IndexStats) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let payload = serde_json::json!({
                    "documents": report.documents,
                    "index": stats,
                });
                Ok(serde_json::to_string_pretty(&payload)?)
            }
            OutputFormat::Quiet => Ok(stats.session.clone().unwrap_or_default()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Document", "Pages", "With Text", "Chunks", "Error"]);
                for doc in &report.documents {
                    builder.push_record([
                        doc.source.clone(),
                        doc.pages.to_string(),
                        doc.pages_with_text.to_string(),
                        doc.chunks.to_string(),
                        doc.error.clone().unwrap_or_default(),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));

                let summary = self.success(&format!(
                    "Indexed {} chunks from {} document(s) (session {})",
                    stats.indexed_chunks,
                    stats.sources.len(),
                    stats.session.as_deref().unwrap_or("none")
                ));
                Ok(format!("{}\n{}", table, summary))
            }
        }
    }

    /// Format similarity search hits.
    pub fn format_chunks(&self, chunks: &[ChunkRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let hits: Vec<_> = chunks
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "source": c.source,
                            "page": c.page,
                            "chunk_index": c.chunk_index,
                            "start_offset": c.start_offset,
                            "text": c.text,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&hits)?)
            }
            OutputFormat::Quiet => Ok(sheetwise_extractor::format_context(chunks)),
            OutputFormat::Table => {
                if chunks.is_empty() {
                    return Ok(self.colorize("No chunks found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["#", "Source", "Page", "Text"]);
                for (i, chunk) in chunks.iter().enumerate() {
                    builder.push_record([
                        (i + 1).to_string(),
                        chunk.source.clone(),
                        chunk.page.map(|p| p.to_string()).unwrap_or_else(|| "N/A".into()),
                        snippet(&chunk.text),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format the attribute catalog.
    pub fn format_attributes(&self, catalog: &AttributeCatalog) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let names: Vec<_> = catalog.iter().map(|spec| &spec.name).collect();
                Ok(serde_json::to_string_pretty(&names)?)
            }
            OutputFormat::Quiet => Ok(catalog
                .iter()
                .map(|spec| spec.name.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["#", "Attribute", "Web Rules"]);
                for (i, spec) in catalog.iter().enumerate() {
                    let web = if spec.web_instructions.is_some() { "yes" } else { "shared" };
                    builder.push_record([(i + 1).to_string(), spec.name.clone(), web.to_string()]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "grey" => text.bright_black().to_string(),
            _ => text.to_string(),
        }
    }
}

fn indicator_color(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Green => "green",
        Indicator::Yellow => "yellow",
        Indicator::Grey => "grey",
        Indicator::Red => "red",
    }
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetwise_domain::ContextSource;
    use sheetwise_extractor::{classify, BatchMetadata, StatusCounts};

    fn report() -> BatchReport {
        let results = vec![
            classify("Gender", Some(r#"{"Gender": "Female"}"#), ContextSource::Document),
            classify("Colour", Some(r#"{"Colour": "NOT FOUND"}"#), ContextSource::Web),
            classify("Sealing", Some(r#"{"error": "Rate limit exceeded"}"#), ContextSource::Document),
        ];
        let mut counts = StatusCounts::default();
        for result in &results {
            counts.record(result.status);
        }
        BatchReport {
            session: None,
            results,
            cancelled: false,
            metadata: BatchMetadata {
                model_name: "mock".to_string(),
                started_at: 0,
                duration_ms: 1500,
                attributes_requested: 3,
                llm_calls: 3,
                counts,
            },
        }
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&report(), false).unwrap();
        assert!(output.contains("Attribute"));
        assert!(output.contains("Female"));
        assert!(!output.contains("Diagnostic"));
        assert!(output.contains("3 attributes in 1.5s (3 calls, mock): 1 OK, 1 NOT_FOUND, 1 RATE_LIMITED"));
    }

    #[test]
    fn test_table_details() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&report(), true).unwrap();
        assert!(output.contains("Diagnostic"));
        assert!(output.contains("web"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&report(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["results"][0]["name"], "Gender");
        assert_eq!(value["results"][1]["indicator"], "yellow");
        assert_eq!(value["results"][2]["status"], "RATE_LIMITED");
        assert_eq!(value["metadata"]["llm_calls"], 3);
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_report(&report(), false).unwrap();
        assert_eq!(output.lines().next(), Some("Gender\tFemale"));
    }

    #[test]
    fn test_cancelled_summary() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let mut report = report();
        report.cancelled = true;
        report.metadata.attributes_requested = 25;
        assert!(formatter.batch_summary(&report).ends_with("cancelled after 3 of 25"));
    }

    #[test]
    fn test_empty_chunks() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert!(formatter.format_chunks(&[]).unwrap().contains("No chunks found"));
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "word ".repeat(40);
        let short = snippet(&long);
        assert_eq!(short.chars().count(), SNIPPET_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(snippet("a\n  b"), "a b");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }

    #[test]
    fn test_attribute_listing() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_attributes(&AttributeCatalog::default()).unwrap();
        assert_eq!(output.lines().count(), 25);
        assert_eq!(output.lines().next(), Some("Material Filling"));
    }
}
