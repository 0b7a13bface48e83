use crate::error::NormalizerError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;

/// Sheet slot of a [`MemoryWorkbook`]
#[derive(Clone, Debug)]
enum MemorySheet {
    Loaded(Grid),
    /// Reading this sheet fails with the given cause
    Unreadable(String),
}

/// A workbook assembled in memory.
///
/// Useful for callers that parse other formats themselves, and for
/// exercising the pipeline without a file on disk.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorkbook {
    name: String,
    sheets: Vec<(String, MemorySheet)>,
}

impl MemoryWorkbook {
    pub fn new(name: &str) -> Self {
        MemoryWorkbook {
            name: name.to_owned(),
            sheets: Vec::new(),
        }
    }

    /// Adds a sheet from rows of cell text. Row `i` of `rows` becomes sheet row
    /// `i + 1`; text that parses as a number becomes a numeric cell and empty
    /// strings leave the cell empty.
    pub fn with_sheet<R, C>(self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let mut grid = Grid::new(name);
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, text) in cells.into_iter().enumerate() {
                let text = text.as_ref();
                if text.is_empty() {
                    continue;
                }
                let cell = match text.trim().parse::<f64>() {
                    Ok(number) if number.is_finite() => Cell::number(row + 1, col + 1, number),
                    _ => Cell::text(row + 1, col + 1, text),
                };
                grid.push(cell);
            }
        }
        self.with_grid(grid)
    }

    /// Adds a prepared grid under the grid's own name.
    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.sheets.push((grid.name().to_owned(), MemorySheet::Loaded(grid)));
        self
    }

    /// Adds a sheet whose grid cannot be read.
    pub fn with_unreadable_sheet(mut self, name: &str, cause: &str) -> Self {
        self.sheets.push((name.to_owned(), MemorySheet::Unreadable(cause.to_owned())));
        self
    }
}

impl Workbook for MemoryWorkbook {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid, NormalizerError> {
        match self.sheets.iter().find(|(sheet_name, _)| sheet_name == name) {
            Some((_, MemorySheet::Loaded(grid))) => Ok(grid.clone()),
            Some((_, MemorySheet::Unreadable(cause))) => {
                Err(SpreadsheetError::SheetUnreadable(name.to_owned(), cause.to_owned()))?
            }
            None => Err(SpreadsheetError::SheetNotFound(name.to_owned()))?,
        }
    }
}
