//! Export of tables, charts and the dashboard bundle.
//!
//! Metric and breakdown tables export to CSV or JSON. Charts only have a
//! JSON form. The dashboard bundle is a directory holding `dashboard.json`
//! plus one CSV per table.

use crate::chart::ChartSpec;
use crate::summary::{MetricRow, SectorBreakdown, SectorBreakdownRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced bytes that are not UTF-8.
    #[error("Encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the format is not
    /// supported for this data.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn to_csv<T: Serialize>(records: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn to_json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(serde_json::to_string(value)?),
    }
}

impl Exporter for [MetricRow] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

impl Exporter for Vec<MetricRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        self.as_slice().export_to_string(format)
    }
}

impl Exporter for [SectorBreakdownRecord] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

impl Exporter for SectorBreakdown {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        self.records().as_slice().export_to_string(format)
    }
}

impl Exporter for ChartSpec {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "charts have no CSV form".to_string(),
            )),
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

impl Exporter for BTreeMap<String, ChartSpec> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "chart maps have no CSV form".to_string(),
            )),
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

/// Everything the static dashboard page needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardExport {
    /// Page title.
    pub title: String,

    /// Analysis date.
    pub as_of: NaiveDate,

    /// Plain-text report.
    pub report_text: String,

    /// Markdown report.
    pub report_markdown: String,

    /// Full-portfolio charts keyed by chart name.
    pub charts: BTreeMap<String, ChartSpec>,

    /// Comparison charts keyed `<sector>_<period>` or `equity_<period>`.
    pub comparison_charts: BTreeMap<String, ChartSpec>,

    /// Metric/Value table.
    pub summary: Vec<MetricRow>,

    /// Year-to-date sector breakdown.
    pub ytd_breakdown: Vec<SectorBreakdownRecord>,

    /// Since-inception sector breakdown.
    pub general_breakdown: Vec<SectorBreakdownRecord>,
}

impl DashboardExport {
    /// Bundle file holding the whole dashboard.
    pub const DASHBOARD_FILE: &'static str = "dashboard.json";
    /// Metric table file.
    pub const SUMMARY_FILE: &'static str = "summary.csv";
    /// Year-to-date breakdown file.
    pub const YTD_BREAKDOWN_FILE: &'static str = "ytd_breakdown.csv";
    /// Since-inception breakdown file.
    pub const GENERAL_BREAKDOWN_FILE: &'static str = "general_breakdown.csv";

    /// Write the bundle into `dir`, creating it if needed.
    ///
    /// Returns the paths written, in order.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;

        let dashboard = dir.join(Self::DASHBOARD_FILE);
        self.export_to_file(&dashboard, ExportFormat::PrettyJson)?;

        let summary = dir.join(Self::SUMMARY_FILE);
        self.summary.export_to_file(&summary, ExportFormat::Csv)?;

        let ytd = dir.join(Self::YTD_BREAKDOWN_FILE);
        self.ytd_breakdown.as_slice().export_to_file(&ytd, ExportFormat::Csv)?;

        let general = dir.join(Self::GENERAL_BREAKDOWN_FILE);
        self.general_breakdown
            .as_slice()
            .export_to_file(&general, ExportFormat::Csv)?;

        let written = vec![dashboard, summary, ytd, general];
        tracing::info!(dir = %dir.display(), files = written.len(), "wrote dashboard bundle");
        Ok(written)
    }
}

impl Exporter for DashboardExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "the dashboard bundle has no single-table CSV form".to_string(),
            )),
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SectorBreakdownRow;
    use smic_analytics::Period;

    fn rows() -> Vec<MetricRow> {
        vec![
            MetricRow {
                metric: "Total Return".to_string(),
                value: "20.00%".to_string(),
            },
            MetricRow {
                metric: "Portfolio Value".to_string(),
                value: "$1,200.00".to_string(),
            },
        ]
    }

    #[test]
    fn test_metric_rows_csv() {
        let csv = rows().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Metric,Value"));
        assert_eq!(lines.next(), Some("Total Return,20.00%"));
        assert_eq!(lines.next(), Some("Portfolio Value,\"$1,200.00\""));
    }

    #[test]
    fn test_metric_rows_json() {
        let json = rows().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.starts_with("[{\"Metric\":\"Total Return\""));

        let pretty = rows().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  ")); // Indentation indicates pretty format
    }

    #[test]
    fn test_breakdown_csv_header() {
        let breakdown = SectorBreakdown {
            period: Period::Ytd,
            start: None,
            end: None,
            rows: vec![SectorBreakdownRow {
                sector: "Tech".to_string(),
                etf_weight_start: 0.1,
                etf_weight_end: 0.2,
                stocks_weight_start: 0.3,
                stocks_weight_end: 0.4,
            }],
        };

        let csv = breakdown.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with(
            "Sector,ETF_Weight_Start (%),ETF_Weight_End (%),Stocks_Weight_Start (%),Stocks_Weight_End (%),Total_Sector_Start (%),Total_Sector_End (%)"
        ));
        assert!(csv.contains("Tech,10.0,20.0,30.0,40.0,40.0,60.0"));
    }

    #[test]
    fn test_chart_has_no_csv_form() {
        let err = ChartSpec::default()
            .export_to_string(ExportFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidFormat(_)));
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
