use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::summary::ConversionSummary;

/// Summary plus the run metadata needed to reproduce or audit it
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConversionReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub quality: u8,
    pub summary: ConversionSummary,
}

/// Report output formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ReportFormat::Json => "webpbatch_report.json",
            ReportFormat::Csv => "webpbatch_report.csv",
        }
    }
}

/// Write the report into `dir` and return the file path
pub fn write_report(
    report: &ConversionReport,
    format: ReportFormat,
    dir: &Path,
) -> Result<PathBuf> {
    let report_path = dir.join(format.file_name());
    match format {
        ReportFormat::Json => write_json_report(report, &report_path)?,
        ReportFormat::Csv => write_csv_report(report, &report_path)?,
    }
    log::info!("Report saved to: {}", report_path.display());
    Ok(report_path)
}

fn write_json_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

fn write_csv_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;
    let summary = &report.summary;

    writer.write_record(["metric", "value"])?;
    let rows = [
        ("start_time", report.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("end_time", report.end_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("duration_seconds", format!("{:.3}", summary.elapsed.as_secs_f64())),
        ("input_dir", report.input_dir.display().to_string()),
        ("output_dir", report.output_dir.display().to_string()),
        ("workers", report.workers.to_string()),
        ("quality", report.quality.to_string()),
        ("total_files", summary.total_files().to_string()),
        ("converted_files", summary.converted.to_string()),
        ("skipped_files", summary.skipped.to_string()),
        ("failed_files", summary.failed().to_string()),
        ("original_size_bytes", summary.original_bytes.to_string()),
        ("webp_size_bytes", summary.webp_bytes.to_string()),
        ("reduction_percent", format!("{:.2}", summary.reduction_percent())),
    ];
    for (metric, value) in rows {
        writer.write_record([metric, value.as_str()])?;
    }

    for failure in &summary.failures {
        writer.write_record([
            "failed_file",
            failure.path.display().to_string().as_str(),
            failure.error.as_str(),
            if failure.fallback_copied { "copied" } else { "not_copied" },
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ConversionOutcome, FileReport};
    use std::time::Duration;
    use tempfile::tempdir;

    fn report() -> ConversionReport {
        let summary = ConversionSummary::fold(
            vec![
                FileReport::new(
                    "in/a.jpg",
                    ConversionOutcome::Converted {
                        original_size: 100,
                        webp_size: 40,
                    },
                ),
                FileReport::new(
                    "in/b, weird.png",
                    ConversionOutcome::Failed {
                        error: "failed to decode image".into(),
                        fallback_copied: true,
                    },
                ),
            ],
            Duration::from_millis(250),
        );
        ConversionReport {
            start_time: Utc::now(),
            end_time: Utc::now(),
            input_dir: "in".into(),
            output_dir: "in_webp".into(),
            workers: 2,
            quality: 80,
            summary,
        }
    }

    #[test]
    fn json_report_reads_back() {
        let dir = tempdir().unwrap();
        let path = write_report(&report(), ReportFormat::Json, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "webpbatch_report.json");

        let parsed: ConversionReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.summary, report().summary);
    }

    #[test]
    fn csv_report_lists_failures() {
        let dir = tempdir().unwrap();
        let path = write_report(&report(), ReportFormat::Csv, dir.path()).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert!(records.iter().any(|r| &r[0] == "converted_files" && &r[1] == "1"));
        let failed = records.iter().find(|r| &r[0] == "failed_file").unwrap();
        assert_eq!(&failed[1], "in/b, weird.png");
        assert_eq!(&failed[3], "copied");
    }
}
