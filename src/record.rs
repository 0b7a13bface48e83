//! Canonical output records, the only entities that leave the engine.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Origin of a region's data
#[derive(Serialize, Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Planned,
    DeliveredMedia,
    DeliveredRf,
}

impl SourceType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceType::Planned => "planned",
            SourceType::DeliveredMedia => "delivered_media",
            SourceType::DeliveredRf => "delivered_rf",
        }
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup key of a region in the diagnostics report: sheet name plus the
/// region's position in the sheet's detection order.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "String")]
pub struct RegionId {
    pub sheet: String,
    pub index: usize,
}

impl RegionId {
    pub fn new(sheet: &str, index: usize) -> Self {
        RegionId {
            sheet: sheet.to_owned(),
            index,
        }
    }
}

impl Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.sheet, self.index)
    }
}

impl From<RegionId> for String {
    fn from(value: RegionId) -> Self {
        value.to_string()
    }
}

/// A record's value: numeric once coerced, otherwise the cell text
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Text(String),
}

impl RecordValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RecordValue::Number(number) => Some(*number),
            RecordValue::Text(_) => None,
        }
    }
}

impl Display for RecordValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordValue::Number(number) => write!(f, "{number}"),
            RecordValue::Text(text) => f.write_str(text),
        }
    }
}

/// Problem found by the numeric validator
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFlag {
    NonNumeric,
    NegativeValue,
    RangeViolation,
}

impl ValidationFlag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ValidationFlag::NonNumeric => "non_numeric",
            ValidationFlag::NegativeValue => "negative_value",
            ValidationFlag::RangeViolation => "range_violation",
        }
    }
}

/// One normalized output row.
///
/// Created by the table extractor or the reach & frequency normalizer; only
/// the validator touches `value` and `flag` afterwards.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CanonicalRecord {
    pub sheet_name: String,
    pub platform: Option<String>,
    pub market: Option<String>,
    /// Canonical metric name, uniquified within a region (`CLICKS_1`)
    pub metric_name: String,
    /// Header or row label the metric was read from
    pub metric_label: String,
    pub value: RecordValue,
    pub source_type: SourceType,
    pub region_id: RegionId,
    /// Sheet row of the value cell (1-based)
    pub row: usize,
    /// Sheet column of the value cell (1-based)
    pub column: usize,
    /// Other mapped dimensions of the row (campaign, dates, ...)
    pub dimensions: BTreeMap<String, String>,
    /// Cells of the row under unmapped headers, keyed by raw header
    pub extras: BTreeMap<String, String>,
    pub flag: Option<ValidationFlag>,
}
