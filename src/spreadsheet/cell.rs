use crate::error::NormalizerError;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use std::fmt::Display;

/// Types of cell data after number formats have been applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Plain numeric values
    Number,
    /// Numeric values shown with a percent format (0.015 displays as 1.5%)
    Percent,
    /// Date serials
    Date,
    /// Date + time serials
    DateTime,
    /// Time-of-day serials
    Time,
    /// Any string value (shared, inline or formula text)
    Text,
    /// Error values such as `#N/A`
    Error,
}

/// Display class of a number format, before the workbook epoch is known.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum NumberFormat {
    #[default]
    General,
    Percent,
    Date,
    DateTime,
    Time,
}

impl NumberFormat {
    /// Classifies built-in Excel number format ids.
    pub(crate) fn from_builtin_id(id: &str) -> Option<Self> {
        match id {
            "9" | "10" => Some(Self::Percent),
            "14" | "15" | "16" | "17" => Some(Self::Date),
            "22" => Some(Self::DateTime),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time),
            _ => None,
        }
    }

    /// Classifies a custom format code by scanning for date, time and percent tokens
    /// outside of string literals, escapes and bracketed sections.
    pub(crate) fn from_format_code(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut has_date = false;
        let mut has_time = false;
        let mut has_percent = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,
                '"' if !is_bracket => is_literal = !is_literal,
                '[' if !is_literal => is_bracket = true,
                ']' if is_bracket => is_bracket = false,
                _ if is_literal || is_bracket => (),
                'Y' | 'y' | 'D' | 'd' => has_date = true,
                'H' | 'h' | 'S' | 's' => has_time = true,
                '%' => has_percent = true,
                _ => (),
            }
        }

        match (has_date, has_time) {
            (true, true) => Self::DateTime,
            (true, false) => Self::Date,
            (false, true) => Self::Time,
            _ if has_percent => Self::Percent,
            _ => Self::General,
        }
    }

    pub(crate) fn cell_type(&self) -> CellType {
        match self {
            Self::General => CellType::Number,
            Self::Percent => CellType::Percent,
            Self::Date => CellType::Date,
            Self::DateTime => CellType::DateTime,
            Self::Time => CellType::Time,
        }
    }
}

/// Converts Excel error codes to their display strings.
pub(crate) fn to_error_value(code: &str) -> &str {
    match code {
        "#NULL!" | "#DIV/0!" | "#VALUE!" | "#REF!" | "#NAME?" | "#NUM!" | "#N/A" => code,
        _ => "#ERROR!",
    }
}

/// A single read-only cell: position, type, stored value and display text.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row number (1-based)
    pub row: usize,
    /// Column number (1-based)
    pub col: usize,
    /// Cell data type
    pub kind: CellType,
    /// Value as stored in the file (numbers unformatted, serials for dates)
    pub value: String,
    /// Value as a reader would see it (dates as ISO text, percents with `%`)
    pub raw_text: String,
}

impl Cell {
    /// Builds a cell, rendering the display text from the stored value.
    pub(crate) fn new(row: usize, col: usize, kind: CellType, value: String, is_1904: bool) -> Cell {
        let raw_text = render(kind, &value, is_1904).unwrap_or_else(|_| value.clone());
        Cell {
            row,
            col,
            kind,
            value,
            raw_text,
        }
    }

    /// Text cell whose display text equals its value.
    pub fn text(row: usize, col: usize, value: &str) -> Cell {
        Cell::new(row, col, CellType::Text, value.to_owned(), false)
    }

    /// Numeric cell.
    pub fn number(row: usize, col: usize, value: f64) -> Cell {
        Cell::new(row, col, CellType::Number, value.to_string(), false)
    }

    /// True for empty cells and cells holding only whitespace.
    pub fn is_blank(&self) -> bool {
        self.kind == CellType::Empty || self.raw_text.trim().is_empty()
    }

    /// Numeric value of number and percent cells.
    pub fn to_double(&self) -> Option<f64> {
        match self.kind {
            CellType::Number | CellType::Percent => self.value.parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw_text)
    }
}

/// Renders a stored value the way the workbook displays it.
fn render(kind: CellType, value: &str, is_1904: bool) -> Result<String, NormalizerError> {
    let text = match kind {
        CellType::Boolean => if value == "1" || value.eq_ignore_ascii_case("true") { "TRUE" } else { "FALSE" }.to_owned(),
        CellType::Number => to_number_string(value.parse::<f64>()?),
        CellType::Percent => format!("{}%", to_number_string(value.parse::<f64>()? * 100.0)),
        CellType::Date => to_date_string(value, is_1904)?,
        CellType::DateTime => to_datetime_string(value, is_1904)?,
        CellType::Time => to_time_string(value)?,
        CellType::Error => to_error_value(value).to_owned(),
        CellType::Empty | CellType::Text => value.to_owned(),
    };
    Ok(text)
}

/// Integral floats print without a trailing `.0`; everything else keeps full precision
/// after rounding away binary noise such as `0.1 * 100`.
fn to_number_string(number: f64) -> String {
    let rounded = (number * 1e9).round() / 1e9;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        rounded.to_string()
    }
}

/// Converts an Excel date serial to an ISO date string.
/// Serials below 60 precede the phantom 1900-02-29 of the 1900 epoch.
/// Serials beyond the calendar range are an error.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, NormalizerError> {
    let days = value.parse::<f64>()?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let date = Duration::try_days(days.saturating_add(offset))
        .and_then(|duration| NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(duration))
        .ok_or_else(|| SpreadsheetError::DateOutOfRange(value.to_owned()))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts the fractional part of a serial to `HH:MM:SS`.
fn to_time_string(value: &str) -> Result<String, NormalizerError> {
    let fraction = value.parse::<f64>()?.fract();
    let mut seconds = (fraction * 86_400f64).round() as i64;
    let hours = seconds / 3_600;
    seconds %= 3_600;
    let minutes = seconds / 60;
    seconds %= 60;
    Ok(format!("{hours:02}:{minutes:02}:{seconds:02}"))
}

/// Converts a date+time serial to `YYYY-MM-DD HH:MM:SS`.
fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, NormalizerError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}
