//! Diagnostics report: what happened to every sheet and region of a workbook.

use crate::detect::DetectionMethod;
use crate::detect::DetectionNote;
use crate::error::NormalizerError;
use crate::extract::ExtractionNote;
use crate::mapping::HeaderMapping;
use crate::mapping::MappingNote;
use crate::normalize::RfMelt;
use crate::record::RegionId;
use crate::record::SourceType;
use crate::validate::ValidationIssue;
use serde::Serialize;
use std::fmt::Display;

/// Processing state of a sheet
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SheetState {
    Pending,
    Detecting,
    Mapping,
    Extracting,
    Normalizing,
    Validating,
    Done,
    /// Not selected by the sheet filter
    Skipped,
    Failed,
}

impl SheetState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SheetState::Pending => "pending",
            SheetState::Detecting => "detecting",
            SheetState::Mapping => "mapping",
            SheetState::Extracting => "extracting",
            SheetState::Normalizing => "normalizing",
            SheetState::Validating => "validating",
            SheetState::Done => "done",
            SheetState::Skipped => "skipped",
            SheetState::Failed => "failed",
        }
    }
}

impl Display for SheetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a sheet failed and in which state
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SheetFailure {
    pub stage: SheetState,
    pub cause: String,
}

/// A region dropped from the output, by error or by panic
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RegionFailure {
    pub id: RegionId,
    pub range: String,
    pub stage: SheetState,
    pub cause: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RegionReport {
    pub id: RegionId,
    /// Final bounds, after any market column recovery
    pub range: String,
    pub method: DetectionMethod,
    pub header_row: usize,
    pub source_type: SourceType,
    pub platform: Option<String>,
    pub mappings: Vec<HeaderMapping>,
    pub mapping_notes: Vec<MappingNote>,
    pub extraction_notes: Vec<ExtractionNote>,
    pub melt: Option<RfMelt>,
    pub record_count: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SheetReport {
    pub name: String,
    pub state: SheetState,
    pub failure: Option<SheetFailure>,
    pub detection: Vec<DetectionNote>,
    pub regions: Vec<RegionReport>,
    /// Regions whose records were dropped while the rest of the sheet went on
    pub failed_regions: Vec<RegionFailure>,
    pub issues: Vec<ValidationIssue>,
}

impl SheetReport {
    pub fn new(name: &str) -> Self {
        SheetReport {
            name: name.to_owned(),
            state: SheetState::Pending,
            failure: None,
            detection: Vec::new(),
            regions: Vec::new(),
            failed_regions: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn skipped(name: &str) -> Self {
        SheetReport {
            state: SheetState::Skipped,
            ..SheetReport::new(name)
        }
    }

    /// Marks the sheet failed in its current state.
    pub fn fail(&mut self, cause: String) {
        self.failure = Some(SheetFailure {
            stage: self.state,
            cause,
        });
        self.state = SheetState::Failed;
    }

    pub fn is_failed(&self) -> bool {
        self.state == SheetState::Failed
    }

    pub fn record_count(&self) -> usize {
        self.regions.iter().map(|region| region.record_count).sum()
    }
}

/// Report of one pipeline run, one entry per sheet in workbook order
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DiagnosticsReport {
    pub workbook: String,
    pub sheets: Vec<SheetReport>,
}

impl DiagnosticsReport {
    pub fn new(workbook: &str) -> Self {
        DiagnosticsReport {
            workbook: workbook.to_owned(),
            sheets: Vec::new(),
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetReport> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn region(&self, id: &RegionId) -> Option<&RegionReport> {
        self.sheet(&id.sheet)
            .and_then(|sheet| sheet.regions.iter().find(|region| region.id == *id))
    }

    pub fn failed_sheets(&self) -> impl Iterator<Item = &SheetReport> {
        self.sheets.iter().filter(|sheet| sheet.is_failed())
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.sheets.iter().flat_map(|sheet| sheet.issues.iter())
    }

    pub fn to_json(&self) -> Result<String, NormalizerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_stage() {
        let mut sheet = SheetReport::new("Plan");
        sheet.state = SheetState::Mapping;
        sheet.fail("boom".to_owned());
        assert_eq!(sheet.state, SheetState::Failed);
        assert_eq!(
            sheet.failure,
            Some(SheetFailure {
                stage: SheetState::Mapping,
                cause: "boom".to_owned()
            })
        );
    }

    #[test]
    fn report_to_json() {
        let mut report = DiagnosticsReport::new("plan.xlsx");
        report.sheets.push(SheetReport::skipped("Notes"));
        let mut failed = SheetReport::new("Broken");
        failed.fail("Sheet 'Broken' cannot be read: corrupt".to_owned());
        report.sheets.push(failed);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["workbook"], "plan.xlsx");
        assert_eq!(json["sheets"][0]["state"], "skipped");
        assert_eq!(json["sheets"][1]["state"], "failed");
        assert_eq!(json["sheets"][1]["failure"]["stage"], "pending");
        assert_eq!(report.failed_sheets().count(), 1);
        assert!(report.sheet("Notes").is_some());
    }
}
