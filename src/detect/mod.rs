//! # Region Detection
//!
//! Finds the rectangular tables inside a sheet. Two strategies run
//! independently: sentinel markers placed by the report author
//! ([`marker::detect_markers`]) and header rows dense in known keywords
//! ([`identifier::detect_identifiers`]). Their candidates are then merged by
//! [`merge_candidates`], where marker regions are authoritative.

pub mod identifier;
pub mod marker;

use crate::config::Compiled;
use crate::config::DetectionConfig;
use crate::config::IdentifierPass;
use crate::record::SourceType;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::CellRange;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::info;

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("Region {0} of sheet '{1}' has inconsistent bounds (header row {2})")]
    InvalidBounds(String, String, usize),
}

#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Marker,
    Identifier,
}

/// A detected candidate table. Bounds are inclusive and 1-based.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Region {
    pub sheet_name: String,
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub header_row: usize,
    pub method: DetectionMethod,
    pub source_type_hint: SourceType,
    /// Platform inferred from the sheet or workbook name
    pub platform: Option<String>,
}

impl Region {
    pub(crate) fn new(
        sheet_name: &str,
        (start_row, end_row): (usize, usize),
        (start_col, end_col): (usize, usize),
        header_row: usize,
        method: DetectionMethod,
    ) -> Self {
        Region {
            sheet_name: sheet_name.to_owned(),
            start_row,
            end_row,
            start_col,
            end_col,
            header_row,
            method,
            source_type_hint: SourceType::default(),
            platform: None,
        }
    }

    pub fn range(&self) -> CellRange {
        CellRange::new(self.start_row, self.start_col, self.end_row, self.end_col)
    }

    pub fn width(&self) -> usize {
        self.end_col + 1 - self.start_col
    }

    pub fn columns_overlap(&self, other: &Region) -> bool {
        self.start_col <= other.end_col && other.start_col <= self.end_col
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.range().contains(row, col)
    }

    /// Checks `end_row >= header_row >= start_row` and `end_col >= start_col`.
    pub fn check(&self) -> Result<(), RegionError> {
        if self.start_row <= self.header_row
            && self.header_row <= self.end_row
            && self.start_col <= self.end_col
            && self.start_col > 0
        {
            Ok(())
        } else {
            Err(RegionError::InvalidBounds(
                self.range().to_string(),
                self.sheet_name.to_owned(),
                self.header_row,
            ))
        }
    }
}

/// One step of detection, kept for the diagnostics report
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionNote {
    /// Start marker without a matching end marker
    UnmatchedStart { cell: String },
    /// End marker without an open start marker
    UnmatchedEnd { cell: String },
    /// Marker pair enclosing no content
    EmptyMarkerRegion { start: String, end: String },
    /// Row accepted as a header candidate by keyword density
    HeaderCandidate { row: usize, span: String, keyword_hits: usize },
    Accepted { method: DetectionMethod, range: String, header_row: usize },
    Rejected { method: DetectionMethod, range: String, header_row: usize, reason: String },
    NoRegions,
}

impl DetectionNote {
    fn rejected(region: &Region, reason: String) -> Self {
        DetectionNote::Rejected {
            method: region.method,
            range: region.range().to_string(),
            header_row: region.header_row,
            reason,
        }
    }
}

/// Result of detecting one sheet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    /// Regions ordered by header row, then start column
    pub regions: Vec<Region>,
    pub notes: Vec<DetectionNote>,
}

/// Runs both strategies on a grid and merges their candidates.
pub fn detect(grid: &Grid, workbook_name: &str, compiled: &Compiled, config: &DetectionConfig) -> Detection {
    let (markers, mut notes) = marker::detect_markers(grid, compiled, config);
    let identifiers = if config.identifier_pass == IdentifierPass::WhenNoMarkers && !markers.is_empty() {
        Vec::new()
    } else {
        let (identifiers, identifier_notes) = identifier::detect_identifiers(grid, compiled, config);
        notes.extend(identifier_notes);
        identifiers
    };

    let (mut regions, merge_notes) = merge_candidates(markers, identifiers);
    notes.extend(merge_notes);

    let source_type_hint = infer_source_type(compiled, grid.name(), workbook_name);
    let platform = infer_platform(compiled, grid.name(), workbook_name);
    for region in &mut regions {
        region.source_type_hint = source_type_hint;
        region.platform = platform.clone();
        info!(
            sheet = grid.name(),
            range = %region.range(),
            header_row = region.header_row,
            method = ?region.method,
            "region accepted"
        );
        notes.push(DetectionNote::Accepted {
            method: region.method,
            range: region.range().to_string(),
            header_row: region.header_row,
        });
    }
    if regions.is_empty() {
        debug!(sheet = grid.name(), "no regions detected");
        notes.push(DetectionNote::NoRegions);
    }
    Detection { regions, notes }
}

/// Unions marker and identifier candidates and removes overlaps.
///
/// An identifier candidate whose header row lies inside a marker region is
/// shadowed by it. Candidates sharing a header row over overlapping columns
/// keep the marker region, otherwise the wider span; on equal spans the
/// earlier candidate stays. The result is ordered by header row and column.
pub fn merge_candidates(markers: Vec<Region>, identifiers: Vec<Region>) -> (Vec<Region>, Vec<DetectionNote>) {
    let mut notes = Vec::new();
    let mut accepted: Vec<Region> = Vec::new();
    for candidate in markers.into_iter().chain(identifiers) {
        let shadow = accepted.iter().find(|region| {
            region.method == DetectionMethod::Marker
                && candidate.method == DetectionMethod::Identifier
                && candidate.header_row >= region.start_row
                && candidate.header_row <= region.end_row
                && region.columns_overlap(&candidate)
        });
        if let Some(region) = shadow {
            let reason = format!("inside marker region {}", region.range());
            debug!(sheet = %candidate.sheet_name, range = %candidate.range(), %reason, "candidate rejected");
            notes.push(DetectionNote::rejected(&candidate, reason));
            continue;
        }

        let clash = accepted
            .iter()
            .position(|region| region.header_row == candidate.header_row && region.columns_overlap(&candidate));
        match clash {
            None => accepted.push(candidate),
            Some(index) => {
                let existing = &accepted[index];
                let candidate_wins = existing.method == DetectionMethod::Identifier
                    && (candidate.method == DetectionMethod::Marker || candidate.width() > existing.width());
                let (winner, loser) = if candidate_wins {
                    (candidate.clone(), accepted[index].clone())
                } else {
                    (accepted[index].clone(), candidate)
                };
                let reason = match winner.method {
                    DetectionMethod::Marker => format!("overlaps marker region {}", winner.range()),
                    DetectionMethod::Identifier => format!("overlaps wider region {}", winner.range()),
                };
                debug!(sheet = %loser.sheet_name, range = %loser.range(), %reason, "candidate rejected");
                notes.push(DetectionNote::rejected(&loser, reason));
                accepted[index] = winner;
            }
        }
    }
    accepted.sort_by_key(|region| (region.header_row, region.start_col));
    (accepted, notes)
}

/// Report type from sheet name keywords, then workbook name keywords.
pub fn infer_source_type(compiled: &Compiled, sheet_name: &str, workbook_name: &str) -> SourceType {
    let workbook_stem = file_stem(workbook_name);
    [sheet_name, workbook_stem.as_str()]
        .iter()
        .find_map(|name| {
            if compiled.rf_sheets.matches(name) {
                Some(SourceType::DeliveredRf)
            } else if compiled.delivery_sheets.matches(name) {
                Some(SourceType::DeliveredMedia)
            } else {
                None
            }
        })
        .unwrap_or_default()
}

/// Platform from sheet name aliases, then workbook name aliases.
pub fn infer_platform(compiled: &Compiled, sheet_name: &str, workbook_name: &str) -> Option<String> {
    compiled
        .platform_of(sheet_name)
        .or_else(|| compiled.platform_of(&file_stem(workbook_name)))
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_owned())
}

/// Number of cells in `row` within the column span matching detection keywords
pub(crate) fn keyword_hits(grid: &Grid, compiled: &Compiled, row: usize, first_col: usize, last_col: usize) -> usize {
    (first_col..=last_col)
        .filter(|col| !grid.is_merged_non_anchor(row, *col))
        .filter(|col| compiled.keywords.matches(grid.text(row, *col)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::spreadsheet::memory::MemoryWorkbook;
    use crate::spreadsheet::Workbook;

    fn region(method: DetectionMethod, rows: (usize, usize), cols: (usize, usize), header_row: usize) -> Region {
        Region::new("Sheet1", rows, cols, header_row, method)
    }

    #[test]
    fn region_bounds_are_checked() {
        assert!(region(DetectionMethod::Marker, (5, 20), (2, 6), 5).check().is_ok());
        assert!(region(DetectionMethod::Marker, (5, 20), (2, 6), 21).check().is_err());
        assert!(region(DetectionMethod::Marker, (5, 20), (6, 2), 5).check().is_err());
        assert_eq!(region(DetectionMethod::Marker, (5, 20), (2, 6), 5).width(), 5);
    }

    #[test]
    fn marker_region_wins_over_identifier() {
        let marker = region(DetectionMethod::Marker, (5, 20), (2, 6), 5);
        let identifier = region(DetectionMethod::Identifier, (5, 30), (1, 8), 5);
        let (regions, notes) = merge_candidates(vec![marker.clone()], vec![identifier]);
        assert_eq!(regions, vec![marker]);
        assert_eq!(notes.len(), 1);
        assert!(matches!(&notes[0], DetectionNote::Rejected { method: DetectionMethod::Identifier, .. }));
    }

    #[test]
    fn wider_identifier_span_wins() {
        let narrow = region(DetectionMethod::Identifier, (3, 9), (2, 4), 3);
        let wide = region(DetectionMethod::Identifier, (3, 9), (1, 6), 3);
        let (regions, _) = merge_candidates(vec![], vec![narrow.clone(), wide.clone()]);
        assert_eq!(regions, vec![wide.clone()]);

        // equal spans keep the earlier candidate
        let shifted = region(DetectionMethod::Identifier, (3, 9), (2, 7), 3);
        let (regions, _) = merge_candidates(vec![], vec![wide.clone(), shifted]);
        assert_eq!(regions, vec![wide]);
    }

    #[test]
    fn shadowed_and_disjoint_candidates() {
        let marker = region(DetectionMethod::Marker, (5, 20), (2, 6), 5);
        let inside = region(DetectionMethod::Identifier, (12, 15), (2, 6), 12);
        let beside = region(DetectionMethod::Identifier, (2, 9), (9, 12), 2);
        let (regions, notes) = merge_candidates(vec![marker.clone()], vec![inside, beside.clone()]);
        assert_eq!(regions, vec![beside, marker]);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn hints_from_names() {
        let compiled = NormalizerConfig::default().compile().unwrap();
        assert_eq!(infer_source_type(&compiled, "R&F", "plan.xlsx"), SourceType::DeliveredRf);
        assert_eq!(infer_source_type(&compiled, "Sheet1", "Meta PCA Report.xlsx"), SourceType::DeliveredMedia);
        assert_eq!(infer_source_type(&compiled, "Delivery", "reach.xlsx"), SourceType::DeliveredMedia);
        assert_eq!(infer_source_type(&compiled, "Plan", "media_plan.xlsx"), SourceType::Planned);
        assert_eq!(infer_platform(&compiled, "DV360", "plan.xlsx").as_deref(), Some("GOOGLE"));
        assert_eq!(infer_platform(&compiled, "Sheet1", "snapchat_plan.xlsx").as_deref(), Some("SNAPCHAT"));
        assert_eq!(infer_platform(&compiled, "Sheet1", "plan.xlsx"), None);
    }

    #[test]
    fn detect_reports_empty_sheets() {
        let compiled = NormalizerConfig::default().compile().unwrap();
        let mut workbook = MemoryWorkbook::new("plan.xlsx").with_sheet("Notes", [vec!["just a note"]]);
        let grid = workbook.read_sheet("Notes").unwrap();
        let detection = detect(&grid, "plan.xlsx", &compiled, &DetectionConfig::default());
        assert!(detection.regions.is_empty());
        assert_eq!(detection.notes, vec![DetectionNote::NoRegions]);
    }

    #[test]
    fn detect_fills_hints_and_orders_regions() {
        let compiled = NormalizerConfig::default().compile().unwrap();
        let mut workbook = MemoryWorkbook::new("meta_delivery.xlsx").with_sheet(
            "Sheet1",
            [
                vec!["Market", "Impressions", "Clicks"],
                vec!["UAE", "100", "5"],
                vec![],
                vec![],
                vec!["Market", "Budget", "CTR"],
                vec!["KSA", "50", "1.2"],
            ],
        );
        let grid = workbook.read_sheet("Sheet1").unwrap();
        let detection = detect(&grid, "meta_delivery.xlsx", &compiled, &DetectionConfig::default());
        let headers: Vec<usize> = detection.regions.iter().map(|region| region.header_row).collect();
        assert_eq!(headers, vec![1, 5]);
        for region in &detection.regions {
            assert_eq!(region.source_type_hint, SourceType::DeliveredMedia);
            assert_eq!(region.platform.as_deref(), Some("META"));
            assert!(region.check().is_ok());
        }
    }

    #[test]
    fn identifier_pass_only_without_markers() {
        let rows = [
            vec!["START"],
            vec!["Market", "Impressions", "Clicks"],
            vec!["UAE", "100", "5"],
            vec!["END"],
            vec![],
            vec![],
            vec!["Market", "Budget", "CTR"],
            vec!["KSA", "50", "1.2"],
        ];
        let compiled = NormalizerConfig::default().compile().unwrap();
        let mut workbook = MemoryWorkbook::new("plan.xlsx").with_sheet("Plan", rows.clone());
        let grid = workbook.read_sheet("Plan").unwrap();

        let mut config = DetectionConfig::default();
        let always = detect(&grid, "plan.xlsx", &compiled, &config);
        let methods: Vec<(usize, DetectionMethod)> = always.regions.iter().map(|region| (region.header_row, region.method)).collect();
        assert_eq!(methods, vec![(2, DetectionMethod::Marker), (7, DetectionMethod::Identifier)]);

        config.identifier_pass = IdentifierPass::WhenNoMarkers;
        let markers_only = detect(&grid, "plan.xlsx", &compiled, &config);
        assert_eq!(markers_only.regions.len(), 1);
        assert_eq!(markers_only.regions[0].method, DetectionMethod::Marker);
        assert!(!markers_only
            .notes
            .iter()
            .any(|note| matches!(note, DetectionNote::HeaderCandidate { .. })));

        let mut workbook = MemoryWorkbook::new("plan.xlsx").with_sheet("Plan", rows[6..].to_vec());
        let grid = workbook.read_sheet("Plan").unwrap();
        let unmarked = detect(&grid, "plan.xlsx", &compiled, &config);
        assert_eq!(unmarked.regions.len(), 1);
        assert_eq!(unmarked.regions[0].method, DetectionMethod::Identifier);
    }
}
