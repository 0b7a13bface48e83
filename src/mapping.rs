//! # Header Mapping
//!
//! Resolves each raw header of a region to a canonical field. Matching runs
//! exact alias, then normalized alias, then fuzzy similarity; mappings below
//! the acceptance threshold stay unmapped but keep their raw text. Repeated
//! canonical names are uniquified (`CLICKS`, `CLICKS_1`, ...).

use crate::config::vocabulary::FieldRole;
use crate::config::vocabulary::Unit;
use crate::config::Compiled;
use crate::config::MappingConfig;
use crate::detect::Region;
use crate::matching::MatchMethod;
use crate::matching::Matcher;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::index_to_col;
use crate::spreadsheet::reference::index_to_reference;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use tracing::info;

/// Canonical name of the market dimension
pub const MARKET: &str = "MARKET";
/// Canonical name of the platform dimension
pub const PLATFORM: &str = "PLATFORM";

/// Mapping of one header cell
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HeaderMapping {
    /// Sheet column (1-based)
    pub column: usize,
    /// Header text as read
    pub raw: String,
    /// Uniquified canonical name; `None` when unmapped
    pub canonical: Option<String>,
    /// Best vocabulary match, even when rejected
    pub candidate: Option<String>,
    pub confidence: f64,
    pub method: MatchMethod,
    pub role: Option<FieldRole>,
    pub unit: Option<Unit>,
}

impl HeaderMapping {
    fn unmapped(column: usize, raw: &str) -> Self {
        HeaderMapping {
            column,
            raw: raw.to_owned(),
            canonical: None,
            candidate: None,
            confidence: 0.0,
            method: MatchMethod::Unmatched,
            role: None,
            unit: None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.canonical.is_some()
    }

    pub fn is_metric(&self) -> bool {
        self.is_mapped() && self.role == Some(FieldRole::Metric)
    }

    /// Canonical name before uniquification
    pub fn base_name(&self) -> Option<&str> {
        self.canonical.as_ref().and(self.candidate.as_deref())
    }

    /// Key of this column among a record's pass-through extras
    pub fn extra_key(&self) -> String {
        if self.raw.is_empty() {
            index_to_col(self.column)
        } else {
            self.raw.to_owned()
        }
    }
}

/// Diagnostics of header mapping
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingNote {
    /// Header kept raw; `best` is the rejected candidate, if any
    Unmapped { cell: String, raw: String, best: Option<String>, confidence: f64 },
    /// Region widened left to include a market column
    MarketRecovered { column: String, indicator: String },
}

/// Header mappings of one region. `region` is the region after any widening.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RegionMapping {
    pub region: Region,
    pub headers: Vec<HeaderMapping>,
    pub notes: Vec<MappingNote>,
}

impl RegionMapping {
    pub fn header_at(&self, column: usize) -> Option<&HeaderMapping> {
        self.headers.iter().find(|header| header.column == column)
    }

    /// Column of the first header mapped to `canonical`
    pub fn column_of(&self, canonical: &str) -> Option<usize> {
        self.headers
            .iter()
            .find(|header| header.canonical.as_deref() == Some(canonical))
            .map(|header| header.column)
    }

    pub fn has(&self, canonical: &str) -> bool {
        self.column_of(canonical).is_some()
    }
}

/// Header text of a cell. Cells hidden by a horizontal merge are blank;
/// cells under a vertical merge read the anchor above them.
pub fn header_text(grid: &Grid, row: usize, col: usize) -> String {
    match grid.merge_at(row, col) {
        Some(range) if range.first_col == col => grid.anchored_text(row, col).to_owned(),
        Some(_) => String::new(),
        None => grid.text(row, col).to_owned(),
    }
}

/// Maps raw header cells `(column, text)` against a matcher.
pub fn map_header_row(cells: &[(usize, String)], matcher: &Matcher, acceptance_threshold: f64) -> Vec<HeaderMapping> {
    let mut headers: Vec<HeaderMapping> = cells
        .iter()
        .map(|(column, raw)| match matcher.resolve(raw) {
            Some(found) => {
                let accepted = found.confidence >= acceptance_threshold;
                HeaderMapping {
                    column: *column,
                    raw: raw.to_owned(),
                    canonical: accepted.then(|| found.name.to_owned()),
                    candidate: Some(found.name),
                    confidence: found.confidence,
                    method: found.method,
                    role: Some(found.role),
                    unit: Some(found.unit),
                }
            }
            None => HeaderMapping::unmapped(*column, raw),
        })
        .collect();
    uniquify(&mut headers);
    headers
}

/// Appends `_1`, `_2`, ... to repeated canonical names; the first keeps the bare name.
fn uniquify(headers: &mut [HeaderMapping]) {
    let mut seen = HashMap::<String, usize>::new();
    for header in headers.iter_mut() {
        if let Some(name) = header.candidate.as_ref().filter(|_| header.canonical.is_some()) {
            let count = seen.entry(name.to_owned()).or_insert(0);
            if *count > 0 {
                header.canonical = Some(format!("{name}_{count}"));
            }
            *count += 1;
        }
    }
}

fn read_headers(grid: &Grid, region: &Region) -> Vec<(usize, String)> {
    (region.start_col..=region.end_col)
        .map(|col| (col, header_text(grid, region.header_row, col)))
        .collect()
}

/// Maps a region's header row, recovering a market column left of the region
/// when no header maps to MARKET.
pub fn map_region(region: &Region, grid: &Grid, compiled: &Compiled, config: &MappingConfig) -> RegionMapping {
    let headers = map_header_row(&read_headers(grid, region), &compiled.fields, config.acceptance_threshold);
    let mut mapping = RegionMapping {
        region: region.clone(),
        headers,
        notes: Vec::new(),
    };

    if config.recover_market_column && !mapping.has(MARKET) && region.start_col > 1 {
        recover_market_column(&mut mapping, grid, compiled, config);
    }

    for header in &mapping.headers {
        if !header.is_mapped() && !header.raw.is_empty() {
            debug!(
                sheet = %region.sheet_name,
                header = %header.raw,
                best = ?header.candidate,
                confidence = header.confidence,
                "header unmapped"
            );
            mapping.notes.push(MappingNote::Unmapped {
                cell: index_to_reference(mapping.region.header_row, header.column),
                raw: header.raw.to_owned(),
                best: header.candidate.clone(),
                confidence: header.confidence,
            });
        }
    }
    mapping
}

/// Looks one column left of the region, from its first row down to the header
/// row, for a market indicator. When found the region is widened by that
/// column, headers are mapped again and the column is mapped to MARKET.
fn recover_market_column(mapping: &mut RegionMapping, grid: &Grid, compiled: &Compiled, config: &MappingConfig) {
    let region = &mapping.region;
    let column = region.start_col - 1;
    let indicator = (region.start_row..=region.header_row)
        .map(|row| grid.anchored_text(row, column))
        .find(|text| compiled.market_indicators.matches(text));
    let indicator = match indicator {
        Some(indicator) => indicator.to_owned(),
        None => return,
    };

    let mut widened = region.clone();
    widened.start_col = column;
    let mut headers = map_header_row(&read_headers(grid, &widened), &compiled.fields, config.acceptance_threshold);
    if let Some(header) = headers.iter_mut().find(|header| header.column == column) {
        let market = compiled.fields.field(MARKET);
        header.canonical = Some(MARKET.to_owned());
        header.candidate = Some(MARKET.to_owned());
        header.confidence = 1.0;
        header.method = MatchMethod::MarketRecovery;
        header.role = Some(market.map(|field| field.role).unwrap_or(FieldRole::Dimension));
        header.unit = Some(market.map(|field| field.unit).unwrap_or_default());
        if header.raw.is_empty() {
            header.raw = indicator.to_owned();
        }
    }
    // the forced column may change which occurrence of a name comes first
    for header in headers.iter_mut().filter(|header| header.is_mapped()) {
        header.canonical = header.candidate.clone();
    }
    uniquify(&mut headers);

    info!(
        sheet = %widened.sheet_name,
        from = %mapping.region.range(),
        to = %widened.range(),
        %indicator,
        "market column recovered"
    );
    mapping.notes.push(MappingNote::MarketRecovered {
        column: index_to_col(column),
        indicator,
    });
    mapping.region = widened;
    mapping.headers = headers;
}
