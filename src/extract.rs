//! # Table Extraction
//!
//! Walks the data rows of a mapped region and emits one record per non-blank
//! metric cell. Dimension columns label the records; cells under unmapped
//! headers travel along as raw pass-through fields.

use crate::config::vocabulary::FieldRole;
use crate::config::Compiled;
use crate::mapping::HeaderMapping;
use crate::mapping::RegionMapping;
use crate::mapping::MARKET;
use crate::mapping::PLATFORM;
use crate::record::CanonicalRecord;
use crate::record::RecordValue;
use crate::record::RegionId;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::index_to_col;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use tracing::warn;

/// Diagnostics of extraction
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionNote {
    /// A blank row ended extraction before the region's last row
    TerminatedEarly { row: usize, end_row: usize },
    /// A row repeating the header row was skipped
    RepeatedHeader { row: usize },
}

/// Records of one region
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<CanonicalRecord>,
    pub notes: Vec<ExtractionNote>,
    /// Data rows read, header repeats excluded
    pub rows_read: usize,
}

/// Value of a metric cell: numbers stay numeric, everything else (percent
/// cells included) is kept as displayed for the validator to coerce.
pub fn cell_value(grid: &Grid, row: usize, col: usize) -> Option<RecordValue> {
    let cell = grid.get(row, col).filter(|cell| !cell.is_blank())?;
    match (cell.kind, cell.to_double()) {
        (CellType::Number, Some(number)) => Some(RecordValue::Number(number)),
        _ => Some(RecordValue::Text(cell.raw_text.trim().to_owned())),
    }
}

fn is_repeated_header(grid: &Grid, row: usize, headers: &[HeaderMapping]) -> bool {
    let mut labelled = headers.iter().filter(|header| !header.raw.is_empty()).peekable();
    labelled.peek().is_some()
        && labelled.all(|header| grid.text(row, header.column).eq_ignore_ascii_case(header.raw.trim()))
}

/// Extracts the rows below the header row, stopping at the first blank row.
pub fn extract(mapping: &RegionMapping, grid: &Grid, region_id: &RegionId, compiled: &Compiled) -> Extraction {
    let region = &mapping.region;
    let mut extraction = Extraction::default();
    let market_col = mapping.column_of(MARKET);
    let platform_col = mapping.column_of(PLATFORM);

    for row in region.header_row + 1..=region.end_row {
        if grid.is_blank_row(row, region.start_col, region.end_col) {
            let remaining = (row + 1..=region.end_row).any(|next| !grid.is_blank_row(next, region.start_col, region.end_col));
            if remaining {
                warn!(
                    sheet = %region.sheet_name,
                    region = %region_id,
                    row,
                    end_row = region.end_row,
                    "blank row ended extraction early"
                );
                extraction.notes.push(ExtractionNote::TerminatedEarly {
                    row,
                    end_row: region.end_row,
                });
            }
            break;
        }
        if is_repeated_header(grid, row, &mapping.headers) {
            debug!(sheet = %region.sheet_name, region = %region_id, row, "repeated header skipped");
            extraction.notes.push(ExtractionNote::RepeatedHeader { row });
            continue;
        }
        extraction.rows_read += 1;

        let market = market_col
            .map(|col| grid.anchored_text(row, col))
            .filter(|text| !text.is_empty())
            .map(str::to_owned);
        let platform = platform_col
            .map(|col| grid.anchored_text(row, col))
            .filter(|text| !text.is_empty())
            .map(|text| compiled.platform_of(text).unwrap_or_else(|| text.to_uppercase()))
            .or_else(|| region.platform.clone());

        let mut dimensions = BTreeMap::new();
        let mut extras = BTreeMap::new();
        for header in &mapping.headers {
            let text = grid.text(row, header.column);
            if text.is_empty() {
                continue;
            }
            match (&header.canonical, header.role) {
                (Some(name), Some(FieldRole::Dimension)) if name != MARKET && name != PLATFORM => {
                    dimensions.insert(name.to_owned(), text.to_owned());
                }
                (None, _) => {
                    let mut key = header.extra_key();
                    if extras.contains_key(&key) {
                        key = format!("{key}@{}", index_to_col(header.column));
                    }
                    extras.insert(key, text.to_owned());
                }
                _ => (),
            }
        }

        for header in mapping.headers.iter().filter(|header| header.is_metric()) {
            let value = match cell_value(grid, row, header.column) {
                Some(value) => value,
                None => continue,
            };
            extraction.records.push(CanonicalRecord {
                sheet_name: region.sheet_name.to_owned(),
                platform: platform.clone(),
                market: market.clone(),
                metric_name: header.canonical.clone().unwrap_or_default(),
                metric_label: header.raw.to_owned(),
                value,
                source_type: region.source_type_hint,
                region_id: region_id.clone(),
                row,
                column: header.column,
                dimensions: dimensions.clone(),
                extras: extras.clone(),
                flag: None,
            });
        }
    }
    debug!(
        sheet = %region.sheet_name,
        region = %region_id,
        rows = extraction.rows_read,
        records = extraction.records.len(),
        "region extracted"
    );
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::detect::DetectionMethod;
    use crate::detect::Region;
    use crate::mapping::map_region;
    use crate::record::SourceType;
    use crate::spreadsheet::cell::Cell;
    use crate::spreadsheet::cell::CellType;
    use crate::spreadsheet::memory::MemoryWorkbook;
    use crate::spreadsheet::reference::CellRange;
    use crate::spreadsheet::Workbook;

    fn run(grid: &Grid, region: Region) -> Extraction {
        let config = NormalizerConfig::default();
        let compiled = config.compile().unwrap();
        let mapping = map_region(&region, grid, &compiled, &config.mapping);
        extract(&mapping, grid, &RegionId::new(grid.name(), 0), &compiled)
    }

    fn sheet(rows: Vec<Vec<&str>>) -> Grid {
        MemoryWorkbook::new("plan.xlsx")
            .with_sheet("Plan", rows)
            .read_sheet("Plan")
            .unwrap()
    }

    #[test]
    fn one_record_per_metric_cell() {
        let grid = sheet(vec![
            vec!["Market", "Platform", "Campaign", "Impressions", "Clicks", "Notes"],
            vec!["UAE", "DV360", "Launch", "1000", "10", "check"],
            vec!["KSA", "TikTok", "Launch", "2000", "", ""],
        ]);
        let mut region = Region::new("Plan", (1, 3), (1, 6), 1, DetectionMethod::Identifier);
        region.source_type_hint = SourceType::DeliveredMedia;
        let extraction = run(&grid, region);

        let summary: Vec<(Option<&str>, Option<&str>, &str, RecordValue)> = extraction
            .records
            .iter()
            .map(|record| {
                (record.market.as_deref(), record.platform.as_deref(), record.metric_name.as_str(), record.value.clone())
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("UAE"), Some("GOOGLE"), "IMPRESSIONS", RecordValue::Number(1000.0)),
                (Some("UAE"), Some("GOOGLE"), "CLICKS", RecordValue::Number(10.0)),
                (Some("KSA"), Some("TIKTOK"), "IMPRESSIONS", RecordValue::Number(2000.0)),
            ]
        );
        let first = &extraction.records[0];
        assert_eq!(first.source_type, SourceType::DeliveredMedia);
        assert_eq!(first.dimensions.get("CAMPAIGN").map(String::as_str), Some("Launch"));
        assert_eq!(first.extras.get("Notes").map(String::as_str), Some("check"));
        assert_eq!((first.row, first.column), (2, 4));
        assert_eq!(first.region_id.to_string(), "Plan#0");
        assert_eq!(first.metric_label, "Impressions");
        assert!(extraction.records[2].extras.is_empty());
        assert_eq!(extraction.rows_read, 2);
    }

    #[test]
    fn blank_row_terminates_extraction() {
        let grid = sheet(vec![
            vec!["Market", "Budget"],
            vec!["UAE", "10"],
            vec![],
            vec!["KSA", "20"],
        ]);
        let extraction = run(&grid, Region::new("Plan", (1, 4), (1, 2), 1, DetectionMethod::Marker));
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.notes, vec![ExtractionNote::TerminatedEarly { row: 3, end_row: 4 }]);
    }

    #[test]
    fn repeated_headers_are_skipped() {
        let grid = sheet(vec![
            vec!["Market", "Budget"],
            vec!["UAE", "10"],
            vec!["market", "BUDGET"],
            vec!["KSA", "20"],
        ]);
        let extraction = run(&grid, Region::new("Plan", (1, 4), (1, 2), 1, DetectionMethod::Marker));
        let markets: Vec<_> = extraction.records.iter().map(|record| record.market.clone()).collect();
        assert_eq!(markets, vec![Some("UAE".to_owned()), Some("KSA".to_owned())]);
        assert_eq!(extraction.notes, vec![ExtractionNote::RepeatedHeader { row: 3 }]);
    }

    #[test]
    fn merged_market_cells_label_every_row() {
        let mut grid = sheet(vec![
            vec!["Market", "Platform", "Budget"],
            vec!["UAE", "Meta", "10"],
            vec!["", "Snap", "20"],
            vec!["", "", "30"],
        ]);
        grid.add_merge(CellRange::new(2, 1, 4, 1));
        let extraction = run(&grid, Region::new("Plan", (1, 4), (1, 3), 1, DetectionMethod::Marker));
        let labels: Vec<_> = extraction
            .records
            .iter()
            .map(|record| (record.market.clone(), record.platform.clone()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (Some("UAE".to_owned()), Some("META".to_owned())),
                (Some("UAE".to_owned()), Some("SNAPCHAT".to_owned())),
                (Some("UAE".to_owned()), None),
            ]
        );
    }

    #[test]
    fn missing_market_and_text_values() {
        let mut grid = sheet(vec![vec!["CTR", "Budget", "Budget"], vec!["N/A", "1,200", "5"]]);
        grid.push(Cell::new(3, 1, CellType::Percent, "0.015".to_owned(), false));
        let mut region = Region::new("Plan", (1, 3), (1, 3), 1, DetectionMethod::Marker);
        region.platform = Some("META".to_owned());
        let extraction = run(&grid, region);
        let values: Vec<(&str, Option<&str>, RecordValue)> = extraction
            .records
            .iter()
            .map(|record| (record.metric_name.as_str(), record.market.as_deref(), record.value.clone()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("CTR", None, RecordValue::Text("N/A".to_owned())),
                ("BUDGET", None, RecordValue::Text("1,200".to_owned())),
                ("BUDGET_1", None, RecordValue::Number(5.0)),
                ("CTR", None, RecordValue::Text("1.5%".to_owned())),
            ]
        );
        assert!(extraction.records.iter().all(|record| record.platform.as_deref() == Some("META")));
    }
}
