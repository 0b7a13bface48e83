//! # Reach & Frequency Normalization
//!
//! Reach and frequency reports are laid out wide: metric names down the
//! first column, one column per market. Such a block is melted into one
//! record per (metric row, market column) cell. Every metric row is melted,
//! the first one included.

use crate::config::Compiled;
use crate::config::MappingConfig;
use crate::config::vocabulary::FieldRole;
use crate::extract::cell_value;
use crate::mapping::RegionMapping;
use crate::matching::tokens;
use crate::record::CanonicalRecord;
use crate::record::RegionId;
use crate::record::SourceType;
use crate::spreadsheet::grid::Grid;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// A wide metrics-by-market block found inside a region
#[derive(Clone, Debug, PartialEq)]
pub struct RfBlock {
    /// Row holding the metrics/market label and the market names
    pub row: usize,
    /// Column holding the metric labels
    pub label_col: usize,
    /// Market columns as (column, market name)
    pub markets: Vec<(usize, String)>,
}

/// Summary of a melt, kept for the diagnostics report
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RfMelt {
    pub row: usize,
    pub markets: Vec<String>,
    pub metric_rows: usize,
    pub records: usize,
}

/// Records of a region after normalization
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<CanonicalRecord>,
    pub melt: Option<RfMelt>,
}

/// Finds the first row of the region whose leading cell matches a
/// metrics/market pattern and whose other cells look like markets rather
/// than metrics.
pub fn find_rf_block(mapping: &RegionMapping, grid: &Grid, compiled: &Compiled) -> Option<RfBlock> {
    let region = &mapping.region;
    (region.header_row..=region.end_row).find_map(|row| {
        if !compiled.is_rf_header(grid.text(row, region.start_col)) {
            return None;
        }
        let markets: Vec<(usize, String)> = (region.start_col + 1..=region.end_col)
            .map(|col| (col, grid.text(row, col).to_owned()))
            .filter(|(_, text)| !text.is_empty())
            .collect();
        let metric_like = markets.iter().filter(|(_, text)| is_metric_like(compiled, text)).count();
        let market_like = markets.iter().filter(|(_, text)| is_market_like(compiled, text)).count();
        (market_like > 0 && market_like > metric_like).then(|| RfBlock {
            row,
            label_col: region.start_col,
            markets,
        })
    })
}

fn is_metric_like(compiled: &Compiled, text: &str) -> bool {
    compiled
        .fields
        .resolve(text)
        .map(|found| found.role == FieldRole::Metric)
        .unwrap_or(false)
}

/// Known market names, and any label that is neither a vocabulary field nor a number
fn is_market_like(compiled: &Compiled, text: &str) -> bool {
    compiled.markets.matches(text)
        || (compiled.fields.resolve(text).is_none() && text.replace([',', '%'], "").trim().parse::<f64>().is_err())
}

/// Canonical metric of a row label, or the label in upper snake case.
pub fn rf_metric_name(compiled: &Compiled, config: &MappingConfig, label: &str) -> String {
    compiled
        .rf_metrics
        .resolve(label)
        .filter(|found| found.confidence >= config.acceptance_threshold)
        .map(|found| found.name)
        .unwrap_or_else(|| tokens(label).join("_").to_uppercase())
}

/// Melts the region's reach & frequency block, if it has one.
///
/// Records from the block row downward are replaced by the melted records;
/// records above it are kept. Without a block the records come back unchanged.
pub fn normalize(
    mapping: &RegionMapping,
    grid: &Grid,
    region_id: &RegionId,
    records: Vec<CanonicalRecord>,
    compiled: &Compiled,
    config: &MappingConfig,
) -> Normalized {
    let block = match find_rf_block(mapping, grid, compiled) {
        Some(block) => block,
        None => return Normalized { records, melt: None },
    };
    let region = &mapping.region;

    let mut output: Vec<CanonicalRecord> = records.into_iter().filter(|record| record.row < block.row).collect();
    let kept = output.len();
    let mut metric_rows = 0;
    for row in block.row + 1..=region.end_row {
        if grid.is_blank_row(row, region.start_col, region.end_col) {
            break;
        }
        let label = grid.anchored_text(row, block.label_col);
        if label.is_empty() {
            continue;
        }
        metric_rows += 1;
        let metric_name = rf_metric_name(compiled, config, label);
        for (col, market) in &block.markets {
            let value = match cell_value(grid, row, *col) {
                Some(value) => value,
                None => continue,
            };
            output.push(CanonicalRecord {
                sheet_name: region.sheet_name.to_owned(),
                platform: region.platform.clone(),
                market: Some(market.to_owned()),
                metric_name: metric_name.to_owned(),
                metric_label: label.to_owned(),
                value,
                source_type: SourceType::DeliveredRf,
                region_id: region_id.clone(),
                row,
                column: *col,
                dimensions: BTreeMap::new(),
                extras: BTreeMap::new(),
                flag: None,
            });
        }
    }

    let melt = RfMelt {
        row: block.row,
        markets: block.markets.iter().map(|(_, market)| market.to_owned()).collect(),
        metric_rows,
        records: output.len() - kept,
    };
    info!(
        sheet = %region.sheet_name,
        region = %region_id,
        row = melt.row,
        markets = melt.markets.len(),
        metric_rows,
        records = melt.records,
        "reach and frequency block melted"
    );
    Normalized {
        records: output,
        melt: Some(melt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::detect::DetectionMethod;
    use crate::detect::Region;
    use crate::extract::extract;
    use crate::mapping::map_region;
    use crate::record::RecordValue;
    use crate::spreadsheet::memory::MemoryWorkbook;
    use crate::spreadsheet::Workbook;

    fn run(rows: Vec<Vec<&str>>, region: Region) -> Normalized {
        let config = NormalizerConfig::default();
        let compiled = config.compile().unwrap();
        let grid = MemoryWorkbook::new("plan.xlsx")
            .with_sheet("R&F", rows)
            .read_sheet("R&F")
            .unwrap();
        let mapping = map_region(&region, &grid, &compiled, &config.mapping);
        let region_id = RegionId::new("R&F", 0);
        let extraction = extract(&mapping, &grid, &region_id, &compiled);
        normalize(&mapping, &grid, &region_id, extraction.records, &compiled, &config.mapping)
    }

    fn summary(normalized: &Normalized) -> Vec<(String, String, String, RecordValue)> {
        normalized
            .records
            .iter()
            .map(|record| {
                (
                    record.market.clone().unwrap_or_default(),
                    record.metric_name.to_owned(),
                    record.metric_label.to_owned(),
                    record.value.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn first_metric_row_is_melted() {
        let rows = vec![
            vec!["METRICS/MARKET", "UAE", "KSA"],
            vec!["Campaign Reach (Absl)", "4019507", "2000000"],
        ];
        let normalized = run(rows, Region::new("R&F", (1, 2), (1, 3), 1, DetectionMethod::Identifier));
        assert_eq!(
            summary(&normalized),
            vec![
                ("UAE".into(), "UNIQUES_REACH".into(), "Campaign Reach (Absl)".into(), RecordValue::Number(4019507.0)),
                ("KSA".into(), "UNIQUES_REACH".into(), "Campaign Reach (Absl)".into(), RecordValue::Number(2000000.0)),
            ]
        );
        assert!(normalized.records.iter().all(|record| record.source_type == SourceType::DeliveredRf));
        assert_eq!(
            normalized.melt,
            Some(RfMelt {
                row: 1,
                markets: vec!["UAE".into(), "KSA".into()],
                metric_rows: 1,
                records: 2
            })
        );
    }

    #[test]
    fn every_metric_row_is_melted() {
        let rows = vec![
            vec!["Metrics / Market", "UAE", "KSA", "Levant"],
            vec!["Campaign Reach (Absl)", "4019507", "2000000", "150000"],
            vec!["Reach (%)", "45%", "30%", ""],
            vec!["Frequency", "2.4", "1.9", "3.1"],
            vec!["Cost per Reach", "0.01", "0.02", "0.03"],
        ];
        let normalized = run(rows, Region::new("R&F", (1, 5), (1, 4), 1, DetectionMethod::Identifier));
        let names: Vec<(usize, &str)> = normalized
            .records
            .iter()
            .map(|record| (record.row, record.metric_name.as_str()))
            .collect();
        assert_eq!(names.len(), 11);
        assert_eq!(&names[..3], &[(2, "UNIQUES_REACH"), (2, "UNIQUES_REACH"), (2, "UNIQUES_REACH")]);
        assert_eq!(&names[3..5], &[(3, "REACH_PERCENT"), (3, "REACH_PERCENT")]);
        assert_eq!(names[5], (4, "FREQUENCY"));
        assert_eq!(names[8], (5, "COST_PER_REACH"));
        assert_eq!(normalized.melt.as_ref().map(|melt| melt.metric_rows), Some(4));
    }

    #[test]
    fn block_inside_region_keeps_rows_above() {
        let rows = vec![
            vec!["Market", "Budget", ""],
            vec!["UAE", "100", ""],
            vec!["Metrics / Market", "UAE", "KSA"],
            vec!["Frequency", "2.1", "1.7"],
        ];
        let normalized = run(rows, Region::new("R&F", (1, 4), (1, 3), 1, DetectionMethod::Marker));
        let rows: Vec<(usize, &str, Option<&str>)> = normalized
            .records
            .iter()
            .map(|record| (record.row, record.metric_name.as_str(), record.market.as_deref()))
            .collect();
        assert_eq!(
            rows,
            vec![(2, "BUDGET", Some("UAE")), (4, "FREQUENCY", Some("UAE")), (4, "FREQUENCY", Some("KSA"))]
        );
        assert_eq!(normalized.records[0].source_type, SourceType::Planned);
    }

    #[test]
    fn metric_columns_are_not_melted() {
        let rows = vec![
            vec!["Metrics / Market", "Impressions", "Clicks"],
            vec!["UAE", "100", "4"],
        ];
        let normalized = run(rows, Region::new("R&F", (1, 2), (1, 3), 1, DetectionMethod::Identifier));
        assert_eq!(normalized.melt, None);
        let names: Vec<&str> = normalized.records.iter().map(|record| record.metric_name.as_str()).collect();
        assert_eq!(names, vec!["IMPRESSIONS", "CLICKS"]);
    }
}
