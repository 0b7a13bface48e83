use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::reference::CellRange;
use std::collections::HashMap;

/// Read-only view over one sheet's cells, addressed by 1-based (row, column).
///
/// Only non-empty cells are stored. Cells are kept in row-major order so that
/// scans see them in reading order.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    /// Sheet name
    name: String,
    /// Stored cells in row-major order
    cells: Vec<Cell>,
    /// (row, col) -> position in `cells`
    indexes: HashMap<(usize, usize), usize>,
    /// Merged ranges declared by the sheet
    merges: Vec<CellRange>,
    /// Largest row holding a cell
    last_row: usize,
    /// Largest column holding a cell
    last_col: usize,
}

impl Grid {
    pub fn new(name: &str) -> Self {
        Grid {
            name: name.to_owned(),
            ..Grid::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a cell; a later cell at the same position replaces the earlier one.
    pub fn push(&mut self, cell: Cell) {
        self.last_row = self.last_row.max(cell.row);
        self.last_col = self.last_col.max(cell.col);
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(index) => self.cells[*index] = cell,
            None => {
                let out_of_order = self
                    .cells
                    .last()
                    .map(|last| (last.row, last.col) > (cell.row, cell.col))
                    .unwrap_or(false);
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
                if out_of_order {
                    self.reindex();
                }
            }
        }
    }

    /// Declares a merged range.
    pub fn add_merge(&mut self, range: CellRange) {
        self.merges.push(range);
    }

    /// Restores row-major order and rebuilds the position index.
    fn reindex(&mut self) {
        self.cells.sort_by_key(|cell| (cell.row, cell.col));
        self.indexes = self
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| ((cell.row, cell.col), index))
            .collect();
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn last_row(&self) -> usize {
        self.last_row
    }

    pub fn last_col(&self) -> usize {
        self.last_col
    }

    /// All stored cells in reading order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes.get(&(row, col)).map(|index| &self.cells[*index])
    }

    /// Trimmed display text, empty for missing cells.
    pub fn text(&self, row: usize, col: usize) -> &str {
        self.get(row, col).map(|cell| cell.raw_text.trim()).unwrap_or("")
    }

    pub fn is_blank(&self, row: usize, col: usize) -> bool {
        self.get(row, col).map(Cell::is_blank).unwrap_or(true)
    }

    /// True when every cell of `row` within `first_col..=last_col` is blank.
    pub fn is_blank_row(&self, row: usize, first_col: usize, last_col: usize) -> bool {
        (first_col..=last_col).all(|col| self.is_blank(row, col))
    }

    /// True when column `col` is blank for every row in `first_row..=last_row`.
    pub fn is_blank_col(&self, col: usize, first_row: usize, last_row: usize) -> bool {
        (first_row..=last_row).all(|row| self.is_blank(row, col))
    }

    /// Merged range covering (row, col), if any.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&CellRange> {
        self.merges.iter().find(|range| range.contains(row, col))
    }

    /// True for cells hidden under another cell of a merged range.
    pub fn is_merged_non_anchor(&self, row: usize, col: usize) -> bool {
        self.merge_at(row, col)
            .map(|range| !range.is_anchor(row, col))
            .unwrap_or(false)
    }

    /// Text shown at (row, col): the anchor's text for any cell of a merged range.
    pub fn anchored_text(&self, row: usize, col: usize) -> &str {
        match self.merge_at(row, col) {
            Some(range) => self.text(range.first_row, range.first_col),
            None => self.text(row, col),
        }
    }
}
