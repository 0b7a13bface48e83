//! # Media Plan Normalizer
//!
//! Turns loosely structured media-plan and campaign-delivery workbooks into a
//! flat sequence of canonical records, plus a diagnostics report describing
//! every decision taken on the way.
//!
//! ## Features
//!
//! - **Region detection**: tables are found between author-placed `START`/`END`
//!   markers and by header rows dense in known keywords; overlapping candidates
//!   are resolved deterministically
//! - **Header mapping**: raw headers resolve to canonical fields by exact alias,
//!   normalized alias, then fuzzy similarity, with market column recovery
//! - **Reach & frequency melt**: metrics-by-market blocks become one record per
//!   metric and market, first metric row included
//! - **Numeric validation**: thousands separators, currency symbols and
//!   percentages are coerced; non-numeric, negative and out-of-range values are
//!   flagged, never dropped
//! - **Failure isolation**: a sheet that cannot be processed is reported as
//!   failed while the other sheets complete
//! - **Declarative vocabulary**: aliases, markers, thresholds and range rules
//!   come from a JSON configuration with complete defaults
//!
//! ## Entry Points
//!
//! - [`Pipeline::run_path`]: normalize one `.xlsx`/`.xlsm` file
//! - [`Pipeline::run`]: normalize any [`Workbook`], e.g. a [`MemoryWorkbook`]
//! - [`Pipeline::run_files`]: normalize every file matching glob patterns

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
mod helpers;
pub mod mapping;
pub mod matching;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod spreadsheet;
pub mod validate;

pub use crate::config::NormalizerConfig;
pub use crate::error::NormalizerError;
pub use crate::pipeline::report::DiagnosticsReport;
pub use crate::pipeline::Pipeline;
pub use crate::pipeline::PipelineOutput;
pub use crate::record::CanonicalRecord;
pub use crate::spreadsheet::MemoryWorkbook;
pub use crate::spreadsheet::Workbook;
pub use crate::spreadsheet::XlsxWorkbook;
