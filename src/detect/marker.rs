//! Marker-based detection: a region lies between a start marker and the next
//! end marker in reading order, within the same or an adjacent column band.

use crate::config::Compiled;
use crate::config::DetectionConfig;
use crate::detect::identifier::header_spans;
use crate::detect::keyword_hits;
use crate::detect::DetectionMethod;
use crate::detect::DetectionNote;
use crate::detect::Region;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::index_to_reference;
use tracing::debug;
use tracing::warn;

/// Position of a marker cell
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Marker {
    row: usize,
    col: usize,
}

impl Marker {
    fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    fn in_band(&self, col: usize, band: usize) -> bool {
        self.col.abs_diff(col) <= band
    }
}

/// Scans every cell row-major for start and end markers.
///
/// A second start marker in the band of an open one replaces it, and the
/// replaced marker is reported as unmatched. Marker tokens on a header-like
/// row are column labels, not markers.
pub fn detect_markers(grid: &Grid, compiled: &Compiled, config: &DetectionConfig) -> (Vec<Region>, Vec<DetectionNote>) {
    let mut regions = Vec::new();
    let mut notes = Vec::new();
    let mut open: Vec<Marker> = Vec::new();

    for cell in grid.cells() {
        let text = cell.raw_text.trim();
        let is_start = compiled.is_start_marker(text);
        let is_end = !is_start && compiled.is_end_marker(text);
        if !is_start && !is_end {
            continue;
        }
        if is_column_label(grid, compiled, config, cell.row, cell.col) {
            continue;
        }

        let marker = Marker {
            row: cell.row,
            col: cell.col,
        };
        if is_start {
            if let Some(index) = open.iter().position(|start| start.in_band(marker.col, config.marker_band)) {
                let replaced = open.remove(index);
                warn!(sheet = grid.name(), cell = %replaced.reference(), "start marker without end marker");
                notes.push(DetectionNote::UnmatchedStart {
                    cell: replaced.reference(),
                });
            }
            open.push(marker);
            continue;
        }

        let start = open
            .iter()
            .rposition(|start| start.row < marker.row && start.in_band(marker.col, config.marker_band));
        match start {
            Some(index) => {
                let start = open.remove(index);
                match enclosed_region(grid, start, marker) {
                    Some(region) => {
                        debug!(sheet = grid.name(), range = %region.range(), "marker region");
                        regions.push(region);
                    }
                    None => notes.push(DetectionNote::EmptyMarkerRegion {
                        start: start.reference(),
                        end: marker.reference(),
                    }),
                }
            }
            None => {
                warn!(sheet = grid.name(), cell = %marker.reference(), "end marker without start marker");
                notes.push(DetectionNote::UnmatchedEnd {
                    cell: marker.reference(),
                });
            }
        }
    }

    for start in open {
        warn!(sheet = grid.name(), cell = %start.reference(), "start marker without end marker");
        notes.push(DetectionNote::UnmatchedStart {
            cell: start.reference(),
        });
    }
    (regions, notes)
}

/// A marker token inside a header-like run of cells is a column label. Only
/// the run holding the token counts, so a table beside it has no say.
fn is_column_label(grid: &Grid, compiled: &Compiled, config: &DetectionConfig, row: usize, col: usize) -> bool {
    header_spans(grid, row, config.blank_col_run)
        .into_iter()
        .find(|(first_col, last_col)| (*first_col..=*last_col).contains(&col))
        .is_some_and(|(first_col, last_col)| {
            keyword_hits(grid, compiled, row, first_col, last_col) >= config.min_keyword_matches
        })
}

/// Region strictly between the marker rows. Columns start at the first
/// occupied column at or right of the start marker and run until a column
/// that is blank over every body row.
fn enclosed_region(grid: &Grid, start: Marker, end: Marker) -> Option<Region> {
    let first_row = start.row + 1;
    let last_row = end.row.checked_sub(1)?;
    if first_row > last_row {
        return None;
    }

    let first_col = (start.col..=grid.last_col()).find(|col| !grid.is_blank_col(*col, first_row, last_row))?;
    let mut last_col = first_col;
    while last_col < grid.last_col() && !grid.is_blank_col(last_col + 1, first_row, last_row) {
        last_col += 1;
    }
    let header_row = (first_row..=last_row).find(|row| !grid.is_blank_row(*row, first_col, last_col))?;

    Some(Region::new(
        grid.name(),
        (first_row, last_row),
        (first_col, last_col),
        header_row,
        DetectionMethod::Marker,
    ))
}
