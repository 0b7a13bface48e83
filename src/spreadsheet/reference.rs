//! A1-style cell references. Rows and columns are 1-based throughout the crate,
//! so `B5` is row 5, column 2.

use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Invalid cell reference '{0}'")]
    InvalidReference(String),

    #[error("Invalid range reference '{0}'")]
    InvalidRange(String),
}

/// Converts column letters (`"A"`, `"AB"`) to a 1-based column number.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |col, ch| {
        ch.is_ascii_alphabetic()
            .then(|| col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1))
    })
}

/// Converts a 1-based column number to column letters.
pub fn index_to_col(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        col -= 1;
        letters.push((b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    letters.iter().rev().collect()
}

/// Formats a 1-based (row, column) pair as an A1 reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row)
}

/// Parses an A1 reference (`"$B$5"` is accepted) into a 1-based (row, column) pair.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = col_to_index(letters)?;
    let row = digits.parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row, col))
}

/// Inclusive rectangle of cells, as used by merged ranges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CellRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl CellRange {
    pub fn new(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        CellRange {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.first_row <= row && row <= self.last_row && self.first_col <= col && col <= self.last_col
    }

    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        self.first_row == row && self.first_col == col
    }
}

impl TryFrom<&str> for CellRange {
    type Error = ReferenceError;

    /// Parses `"A1:C3"`; a single reference yields a one-cell range.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut parts = value.split(':');
        let first = parts
            .next()
            .and_then(reference_to_index)
            .ok_or_else(|| ReferenceError::InvalidRange(value.to_owned()))?;
        let last = match parts.next() {
            Some(part) => reference_to_index(part).ok_or_else(|| ReferenceError::InvalidRange(value.to_owned()))?,
            None => first,
        };
        if parts.next().is_some() {
            return Err(ReferenceError::InvalidRange(value.to_owned()));
        }
        Ok(CellRange::new(first.0, first.1, last.0, last.1))
    }
}

impl Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            index_to_reference(self.first_row, self.first_col),
            index_to_reference(self.last_row, self.last_col)
        )
    }
}
