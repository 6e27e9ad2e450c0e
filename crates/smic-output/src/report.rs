//! Human-readable run report.

use crate::summary::{SectorBreakdown, SummaryStatistics};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smic_analytics::ComparisonResult;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required section was never supplied to the builder.
    #[error("Report is missing its {0}")]
    Missing(&'static str),
}

/// One line of the comparison digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonLine {
    /// Chart title of the comparison.
    pub title: String,
    /// Subject return over the window.
    pub subject_return: Option<f64>,
    /// Benchmark return over the window.
    pub benchmark_return: Option<f64>,
}

impl ComparisonLine {
    fn from_result(result: &ComparisonResult) -> Self {
        let total = |s: &smic_analytics::ReturnSeries| (!s.is_empty()).then(|| s.total_return());
        Self {
            title: result.title(),
            subject_return: total(&result.subject),
            benchmark_return: total(&result.benchmark),
        }
    }

    fn render(&self) -> String {
        let pct = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}%", v * 100.0));
        format!(
            "{}: {} vs {}",
            self.title,
            pct(self.subject_return),
            pct(self.benchmark_return)
        )
    }
}

/// Report for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// Report title.
    pub title: String,

    /// Analysis date.
    pub as_of: NaiveDate,

    /// Headline statistics.
    pub summary: SummaryStatistics,

    /// Sector breakdowns, General first.
    pub breakdowns: Vec<SectorBreakdown>,

    /// Comparison digest.
    pub comparisons: Vec<ComparisonLine>,
}

impl Report {
    /// Plain-text rendering.
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n", self.title));
        output.push_str(&format!("As of {}\n", self.as_of));
        output.push_str(&self.summary.to_ascii_table());
        for breakdown in &self.breakdowns {
            output.push_str(&breakdown.to_ascii_table());
        }
        if !self.comparisons.is_empty() {
            output.push_str("\nComparisons\n");
            output.push_str(&"-".repeat(60));
            output.push('\n');
            for line in &self.comparisons {
                output.push_str(&format!("  {}\n", line.render()));
            }
        }

        output
    }

    /// Markdown rendering.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("_{} as of {}_\n\n", self.title, self.as_of));
        output.push_str(&self.summary.to_markdown());
        for breakdown in &self.breakdowns {
            output.push('\n');
            output.push_str(&breakdown.to_markdown());
        }
        if !self.comparisons.is_empty() {
            output.push_str("\n## Comparisons\n\n");
            for line in &self.comparisons {
                output.push_str(&format!("- {}\n", line.render()));
            }
        }

        output
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    as_of: Option<NaiveDate>,
    summary: Option<SummaryStatistics>,
    breakdowns: Vec<SectorBreakdown>,
    comparisons: Vec<ComparisonLine>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the analysis date.
    pub const fn as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Set the headline statistics.
    pub fn summary(mut self, summary: SummaryStatistics) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Append a sector breakdown.
    pub fn breakdown(mut self, breakdown: SectorBreakdown) -> Self {
        self.breakdowns.push(breakdown);
        self
    }

    /// Append a comparison to the digest.
    pub fn comparison(mut self, result: &ComparisonResult) -> Self {
        self.comparisons.push(ComparisonLine::from_result(result));
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        Ok(Report {
            title: self
                .title
                .unwrap_or_else(|| "SMIC Portfolio Analysis".to_string()),
            as_of: self.as_of.ok_or(ReportError::Missing("analysis date"))?,
            summary: self.summary.ok_or(ReportError::Missing("summary statistics"))?,
            breakdowns: self.breakdowns,
            comparisons: self.comparisons,
        })
    }
}
