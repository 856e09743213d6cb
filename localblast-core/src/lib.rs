//! LocalBlast Core Library
//!
//! Interval algebra, hit coverage, tabular and JSON report reading and BLAST+
//! invocation for LocalBlast.

pub mod error;
pub mod span;
pub mod location;
pub mod coverage;
pub mod types;
pub mod report;
pub mod json_report;
pub mod query;
#[cfg(feature = "runner")]
pub mod blast;

// Re-export commonly used types and functions
pub use error::{LocationError, LocationResult};
pub use span::{SeqPos, Span};
pub use location::Location;
pub use coverage::{coverage_ratio, AxisCoverage, CoverageTracker};
pub use types::{Hit, HitSummary, Search, SegmentPair, Strand};
pub use report::{Column, ReportError, ReportFormat, ReportLayout, ReportStats, TabularParser};
pub use json_report::JsonReportParser;
pub use query::{QueryError, QuerySequence};
#[cfg(feature = "runner")]
pub use blast::{BlastError, BlastJob, BlastParams, BlastProgram, BlastRun, BlastRunner, DbType};

/// Version information for the LocalBlast core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
