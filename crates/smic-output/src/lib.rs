#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/gcsu-smic/smic-analytics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod export;
pub mod report;
pub mod summary;

pub use chart::{
    Annotation, Axis, ChartSpec, Layout, Line, Marker, Trace, TraceType, bar_comparison_chart,
    comparison_chart, etf_vs_stocks_chart, performance_chart, portfolio_charts,
    sector_allocation_chart, weight_drift_chart,
};
pub use export::{DashboardExport, ExportError, ExportFormat, Exporter};
pub use report::{ComparisonLine, Report, ReportBuilder, ReportError};
pub use summary::{
    MetricRow, SectorBreakdown, SectorBreakdownRecord, SectorBreakdownRow, SummaryStatistics,
    generate_summary, sector_breakdown,
};

