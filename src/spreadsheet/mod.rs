//! # Spreadsheet Access
//!
//! Read-only access to workbook sheets as cell grids. Grids are addressed by
//! 1-based (row, column) and carry merged-cell ranges so callers can tell
//! merge anchors from the cells they cover.
//!
//! Two workbook sources are provided: [`XlsxWorkbook`] for Excel 2007+ packages
//! (.xlsx, .xlsm) and [`MemoryWorkbook`] for grids assembled in code.

pub mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub mod grid;
pub mod memory;
pub mod reference;
pub mod xlsx;

use crate::error::NormalizerError;
use crate::spreadsheet::grid::Grid;
use std::path::Path;
use thiserror::Error;

pub use crate::spreadsheet::memory::MemoryWorkbook;
pub use crate::spreadsheet::xlsx::XlsxWorkbook;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtected(String),

    #[error("Spreadsheet '{0}' has no sheets")]
    SpreadsheetEmpty(String),

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Cannot detect spreadsheet format for '{0}'")]
    UnsupportedFormat(String),

    #[error("Sheet '{0}' cannot be read: {1}")]
    SheetUnreadable(String, String),

    #[error("Date serial '{0}' is out of range")]
    DateOutOfRange(String),
}

/// A workbook the pipeline can pull sheet grids from.
pub trait Workbook {
    /// Workbook name, usually the file name
    fn name(&self) -> String;

    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Loads one sheet as a grid
    fn read_sheet(&mut self, name: &str) -> Result<Grid, NormalizerError>;
}

/// Opens a workbook file, choosing the reader by file extension.
pub fn open_workbook<P: AsRef<Path>>(path: P) -> Result<Box<dyn Workbook + Send>, NormalizerError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" => Ok(Box::new(XlsxWorkbook::open(path)?)),
        _ => Err(SpreadsheetError::UnsupportedFormat(path.display().to_string()))?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extensions_are_rejected() {
        let error = open_workbook("plan.ods").err().map(|error| error.to_string());
        assert_eq!(error.as_deref(), Some("Cannot detect spreadsheet format for 'plan.ods'"));
    }
}
