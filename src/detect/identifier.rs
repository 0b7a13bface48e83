//! Identifier-based detection: header rows are recognized by the density of
//! vocabulary keywords, and a region grows downward from its header row.

use crate::config::Compiled;
use crate::config::DetectionConfig;
use crate::detect::keyword_hits;
use crate::detect::DetectionMethod;
use crate::detect::DetectionNote;
use crate::detect::Region;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::CellRange;
use tracing::debug;

/// Scans the first `scan_depth` rows for header candidates and bounds a region
/// below each one.
///
/// A header row may hold several tables side by side; runs of occupied cells
/// separated by `blank_col_run` blank columns are judged separately. Scanning
/// resumes below the longest region found on a row.
pub fn detect_identifiers(grid: &Grid, compiled: &Compiled, config: &DetectionConfig) -> (Vec<Region>, Vec<DetectionNote>) {
    let mut regions = Vec::new();
    let mut notes = Vec::new();
    let depth = config.scan_depth.min(grid.last_row());

    let mut row = 1;
    while row <= depth {
        let mut next_row = row + 1;
        for (first_col, last_col) in header_spans(grid, row, config.blank_col_run) {
            let hits = keyword_hits(grid, compiled, row, first_col, last_col);
            if hits < config.min_keyword_matches && !is_rf_header(grid, compiled, row, first_col, last_col) {
                continue;
            }
            let span = CellRange::new(row, first_col, row, last_col).to_string();
            debug!(sheet = grid.name(), row, %span, keyword_hits = hits, "header candidate");
            notes.push(DetectionNote::HeaderCandidate {
                row,
                span,
                keyword_hits: hits,
            });

            let end_row = grow_region(grid, compiled, config, row, first_col, last_col);
            regions.push(Region::new(
                grid.name(),
                (row, end_row),
                (first_col, last_col),
                row,
                DetectionMethod::Identifier,
            ));
            next_row = next_row.max(end_row + 1);
        }
        row = next_row;
    }
    (regions, notes)
}

/// Column runs of occupied cells in `row`. Cells covered by a merged range
/// count as occupied so a merged header does not split its table.
pub(crate) fn header_spans(grid: &Grid, row: usize, blank_col_run: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut blanks = 0;
    for col in 1..=grid.last_col() {
        if !grid.is_blank(row, col) || grid.is_merged_non_anchor(row, col) {
            current = Some(current.map(|(first, _)| (first, col)).unwrap_or((col, col)));
            blanks = 0;
        } else if let Some(span) = current {
            blanks += 1;
            if blanks >= blank_col_run {
                spans.push(span);
                current = None;
            }
        }
    }
    spans.extend(current);
    spans
}

/// First cell labels a metrics-by-market block with at least one market column.
fn is_rf_header(grid: &Grid, compiled: &Compiled, row: usize, first_col: usize, last_col: usize) -> bool {
    last_col > first_col && compiled.is_rf_header(grid.text(row, first_col))
}

fn is_header_like(grid: &Grid, compiled: &Compiled, config: &DetectionConfig, row: usize, first_col: usize, last_col: usize) -> bool {
    keyword_hits(grid, compiled, row, first_col, last_col) >= config.min_keyword_matches
        || is_rf_header(grid, compiled, row, first_col, last_col)
}

/// Rows whose only content is start or end markers
fn is_marker_row(grid: &Grid, compiled: &Compiled, row: usize, first_col: usize, last_col: usize) -> bool {
    (first_col..=last_col)
        .map(|col| grid.text(row, col))
        .filter(|text| !text.is_empty())
        .all(|text| compiled.is_start_marker(text) || compiled.is_end_marker(text))
}

/// Last data row below `header_row`: growth stops at a run of blank rows,
/// a new header-like row, a marker row or the end of the sheet.
fn grow_region(
    grid: &Grid,
    compiled: &Compiled,
    config: &DetectionConfig,
    header_row: usize,
    first_col: usize,
    last_col: usize,
) -> usize {
    let mut end_row = header_row;
    let mut blanks = 0;
    for row in header_row + 1..=grid.last_row() {
        if grid.is_blank_row(row, first_col, last_col) {
            blanks += 1;
            if blanks >= config.blank_row_run {
                break;
            }
        } else if is_header_like(grid, compiled, config, row, first_col, last_col)
            || is_marker_row(grid, compiled, row, first_col, last_col)
        {
            break;
        } else {
            blanks = 0;
            end_row = row;
        }
    }
    end_row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::spreadsheet::memory::MemoryWorkbook;
    use crate::spreadsheet::Workbook;

    fn scan_with(config: &NormalizerConfig, rows: Vec<Vec<&str>>) -> (Vec<Region>, Vec<DetectionNote>) {
        let compiled = config.compile().unwrap();
        let grid = MemoryWorkbook::new("plan.xlsx")
            .with_sheet("Sheet1", rows)
            .read_sheet("Sheet1")
            .unwrap();
        detect_identifiers(&grid, &compiled, &config.detection)
    }

    fn scan(rows: Vec<Vec<&str>>) -> (Vec<Region>, Vec<DetectionNote>) {
        scan_with(&NormalizerConfig::default(), rows)
    }

    fn bounds(region: &Region) -> (usize, usize, usize, usize, usize) {
        (region.header_row, region.start_row, region.end_row, region.start_col, region.end_col)
    }

    #[test]
    fn header_row_by_keywords() {
        let rows = vec![
            vec!["Media plan Q3"],
            vec![],
            vec!["Impressions", "Clicks", "Market"],
            vec!["1000", "10", "UAE"],
            vec!["2000", "20", "KSA"],
            vec![],
            vec!["3000", "30", "Qatar"],
            vec![],
            vec![],
            vec!["footnote"],
        ];
        let (regions, notes) = scan(rows);
        assert_eq!(regions.len(), 1);
        // a single blank row does not end the region
        assert_eq!(bounds(&regions[0]), (3, 3, 7, 1, 3));
        assert_eq!(
            notes,
            vec![DetectionNote::HeaderCandidate {
                row: 3,
                span: "A3:C3".to_owned(),
                keyword_hits: 3
            }]
        );
    }

    #[test]
    fn blank_row_run_is_configurable() {
        let mut config = NormalizerConfig::default();
        config.detection.blank_row_run = 1;
        let rows = vec![
            vec!["Market", "Budget"],
            vec!["UAE", "10"],
            vec![],
            vec!["KSA", "20"],
        ];
        let (regions, _) = scan_with(&config, rows);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].end_row, 2);
    }

    #[test]
    fn new_header_row_ends_region() {
        let rows = vec![
            vec!["Market", "Budget"],
            vec!["UAE", "10"],
            vec!["Platform", "Impressions", "Clicks"],
            vec!["Meta", "100", "4"],
        ];
        let (regions, _) = scan(rows);
        let found: Vec<_> = regions.iter().map(bounds).collect();
        assert_eq!(found, vec![(1, 1, 2, 1, 2), (3, 3, 4, 1, 3)]);
    }

    #[test]
    fn side_by_side_tables() {
        let rows = vec![
            vec!["Market", "Budget", "", "", "Platform", "Clicks", "CTR"],
            vec!["UAE", "10", "", "", "Meta", "4", "1.5"],
            vec!["KSA", "20"],
        ];
        let (regions, _) = scan(rows);
        let found: Vec<_> = regions.iter().map(bounds).collect();
        assert_eq!(found, vec![(1, 1, 3, 1, 2), (1, 1, 2, 5, 7)]);
    }

    #[test]
    fn rf_header_needs_one_keyword() {
        let rows = vec![
            vec!["METRICS/MARKET", "UAE", "KSA"],
            vec!["Campaign Reach (Absl)", "4019507", "2000000"],
            vec!["Frequency", "2.1", "1.8"],
        ];
        let (regions, _) = scan(rows);
        assert_eq!(regions.len(), 1);
        assert_eq!(bounds(&regions[0]), (1, 1, 3, 1, 3));
    }

    #[test]
    fn scan_depth_bounds_candidates() {
        let mut config = NormalizerConfig::default();
        config.detection.scan_depth = 2;
        let rows = vec![vec!["title"], vec![], vec!["Market", "Budget"], vec!["UAE", "1"]];
        let (regions, notes) = scan_with(&config, rows);
        assert!(regions.is_empty());
        assert!(notes.is_empty());
    }

    #[test]
    fn marker_rows_end_growth() {
        let rows = vec![vec!["Market", "Budget"], vec!["UAE", "1"], vec!["END"], vec!["KSA", "2"]];
        let (regions, _) = scan(rows);
        assert_eq!(regions[0].end_row, 2);
    }
}
