//! # Extraction Pipeline
//!
//! Drives every selected sheet of a workbook through detection, header
//! mapping, extraction, reach & frequency normalization and validation.
//!
//! Grids are read one after another from the workbook, then processed
//! independently (in parallel when configured) and merged back in sheet
//! order. A sheet that fails, by error or by panic, is recorded as failed in
//! the diagnostics report and the other sheets carry on. Within a sheet, a
//! failing region only loses its own records. The run as a whole only fails
//! when the workbook cannot be opened or no selected sheet produced output.

pub mod report;

use crate::config::Compiled;
use crate::config::NormalizerConfig;
use crate::detect::detect;
use crate::detect::Region;
use crate::error::NormalizerError;
use crate::error::ResultMessage;
use crate::extract::extract;
use crate::mapping::map_region;
use crate::normalize::normalize;
use crate::pipeline::report::DiagnosticsReport;
use crate::pipeline::report::RegionFailure;
use crate::pipeline::report::RegionReport;
use crate::pipeline::report::SheetReport;
use crate::pipeline::report::SheetState;
use crate::record::CanonicalRecord;
use crate::record::RegionId;
use crate::record::SourceType;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::open_workbook;
use crate::spreadsheet::Workbook;
use crate::validate::NumericValidator;
use anyhow::Context;
use rayon::prelude::*;
use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No sheet of workbook '{}' produced usable output", .0.workbook)]
    NoUsableSheets(Box<DiagnosticsReport>),

    #[error("No regions detected in sheet '{0}'")]
    NoRegions(String),
}

/// Records and diagnostics of one workbook
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    /// Records of every sheet, in sheet then region order
    pub records: Vec<CanonicalRecord>,
    pub report: DiagnosticsReport,
}

/// Result of one file of a batch run
#[derive(Debug)]
pub struct FileOutput {
    pub path: PathBuf,
    pub result: Result<PipelineOutput, NormalizerError>,
}

/// A sheet waiting to be processed, or already settled while loading
enum SheetSlot {
    Loaded(Grid),
    Settled(SheetOutcome),
}

struct SheetOutcome {
    report: SheetReport,
    records: Vec<CanonicalRecord>,
}

impl SheetOutcome {
    fn without_records(report: SheetReport) -> Self {
        SheetOutcome {
            report,
            records: Vec::new(),
        }
    }
}

pub struct Pipeline {
    config: NormalizerConfig,
    compiled: Compiled,
}

impl Pipeline {
    /// Validates and compiles the configuration once for all runs.
    pub fn new(config: NormalizerConfig) -> Result<Pipeline, NormalizerError> {
        config.validate()?;
        let compiled = config.compile()?;
        Ok(Pipeline { config, compiled })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Opens a workbook file and runs it.
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutput, NormalizerError> {
        let path = path.as_ref();
        let mut workbook = open_workbook(path).with_prefix(&path.display().to_string())?;
        self.run(workbook.as_mut())
    }

    /// Runs every file matching the glob patterns, in path order. A file that
    /// cannot be processed only fails its own entry.
    pub fn run_files<S: AsRef<str>>(&self, patterns: &[S]) -> anyhow::Result<Vec<FileOutput>> {
        let mut paths = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            for entry in glob::glob(pattern).with_context(|| format!("Invalid file pattern '{pattern}'"))? {
                paths.push(entry.with_context(|| format!("Cannot read a path matching '{pattern}'"))?);
            }
        }
        paths.sort();
        paths.dedup();

        Ok(paths
            .into_iter()
            .map(|path| {
                let result = self.run_path(&path);
                if let Err(error) = &result {
                    warn!(file = %path.display(), %error, "workbook failed");
                }
                FileOutput { path, result }
            })
            .collect())
    }

    /// Runs every sheet of a workbook.
    pub fn run(&self, workbook: &mut dyn Workbook) -> Result<PipelineOutput, NormalizerError> {
        let workbook_name = workbook.name();
        info!(workbook = %workbook_name, "pipeline started");

        let mut slots = Vec::new();
        for name in workbook.sheet_names() {
            if !self.compiled.criteria.accept(&name) {
                debug!(workbook = %workbook_name, sheet = %name, "sheet skipped");
                slots.push(SheetSlot::Settled(SheetOutcome::without_records(SheetReport::skipped(&name))));
                continue;
            }
            match isolate(|| workbook.read_sheet(&name)) {
                Ok(grid) => slots.push(SheetSlot::Loaded(grid)),
                Err(cause) => {
                    warn!(workbook = %workbook_name, sheet = %name, %cause, "sheet failed");
                    let mut report = SheetReport::new(&name);
                    report.fail(cause);
                    slots.push(SheetSlot::Settled(SheetOutcome::without_records(report)));
                }
            }
        }

        let process = |slot: SheetSlot| match slot {
            SheetSlot::Loaded(grid) => self.process_isolated(&grid, &workbook_name),
            SheetSlot::Settled(outcome) => outcome,
        };
        let outcomes: Vec<SheetOutcome> = if self.config.parallel {
            slots.into_par_iter().map(process).collect()
        } else {
            slots.into_iter().map(process).collect()
        };

        let mut report = DiagnosticsReport::new(&workbook_name);
        let mut records = Vec::new();
        for outcome in outcomes {
            records.extend(outcome.records);
            report.sheets.push(outcome.report);
        }

        let selected = report.sheets.iter().filter(|sheet| sheet.state != SheetState::Skipped).count();
        let failed = report.failed_sheets().count();
        if selected > 0 && failed == selected {
            warn!(workbook = %workbook_name, sheets = selected, "no sheet produced usable output");
            return Err(PipelineError::NoUsableSheets(Box::new(report)).into());
        }
        info!(
            workbook = %workbook_name,
            sheets = selected,
            failed,
            records = records.len(),
            "pipeline finished"
        );
        Ok(PipelineOutput { records, report })
    }

    /// Processes one sheet, turning errors and panics into a failed report.
    fn process_isolated(&self, grid: &Grid, workbook_name: &str) -> SheetOutcome {
        let mut report = SheetReport::new(grid.name());
        match isolate(|| self.process_sheet(grid, workbook_name, &mut report)) {
            Ok(records) => SheetOutcome { report, records },
            Err(cause) => {
                warn!(sheet = grid.name(), stage = %report.state, %cause, "sheet failed");
                report.fail(cause);
                SheetOutcome::without_records(report)
            }
        }
    }

    fn process_sheet(
        &self,
        grid: &Grid,
        workbook_name: &str,
        report: &mut SheetReport,
    ) -> Result<Vec<CanonicalRecord>, NormalizerError> {
        report.state = SheetState::Detecting;
        let detection = detect(grid, workbook_name, &self.compiled, &self.config.detection);
        report.detection = detection.notes;
        if detection.regions.is_empty() && self.config.require_regions {
            Err(PipelineError::NoRegions(grid.name().to_owned()))?
        }

        let records = self.process_regions(grid, &detection.regions, report);

        report.state = SheetState::Validating;
        let (records, issues) = NumericValidator::new(&self.config.validation, &self.compiled).validate(records);
        report.issues = issues;
        report.state = SheetState::Done;
        debug!(sheet = grid.name(), records = records.len(), "sheet done");
        Ok(records)
    }

    /// Processes regions one by one. A region that fails is reported with its
    /// stage and cause and the next region carries on.
    fn process_regions(&self, grid: &Grid, regions: &[Region], report: &mut SheetReport) -> Vec<CanonicalRecord> {
        let mut records = Vec::new();
        for (index, region) in regions.iter().enumerate() {
            let region_id = RegionId::new(grid.name(), index);
            match isolate(|| self.process_region(grid, region, &region_id, &mut report.state)) {
                Ok((region_report, region_records)) => {
                    report.regions.push(region_report);
                    records.extend(region_records);
                }
                Err(cause) => {
                    warn!(sheet = grid.name(), range = %region.range(), stage = %report.state, %cause, "region failed");
                    report.failed_regions.push(RegionFailure {
                        id: region_id,
                        range: region.range().to_string(),
                        stage: report.state,
                        cause,
                    });
                }
            }
        }
        records
    }

    fn process_region(
        &self,
        grid: &Grid,
        region: &Region,
        region_id: &RegionId,
        state: &mut SheetState,
    ) -> Result<(RegionReport, Vec<CanonicalRecord>), NormalizerError> {
        *state = SheetState::Mapping;
        region.check()?;
        let mapping = map_region(region, grid, &self.compiled, &self.config.mapping);
        mapping.region.check()?;

        *state = SheetState::Extracting;
        let extraction = extract(&mapping, grid, region_id, &self.compiled);

        *state = SheetState::Normalizing;
        let normalized = normalize(
            &mapping,
            grid,
            region_id,
            extraction.records,
            &self.compiled,
            &self.config.mapping,
        );

        let source_type = match normalized.melt {
            Some(_) => SourceType::DeliveredRf,
            None => mapping.region.source_type_hint,
        };
        let region_report = RegionReport {
            id: region_id.clone(),
            range: mapping.region.range().to_string(),
            method: mapping.region.method,
            header_row: mapping.region.header_row,
            source_type,
            platform: mapping.region.platform.clone(),
            mappings: mapping.headers,
            mapping_notes: mapping.notes,
            extraction_notes: extraction.notes,
            melt: normalized.melt,
            record_count: normalized.records.len(),
        };
        Ok((region_report, normalized.records))
    }
}

/// Runs one unit of work, turning its error or panic into a failure cause.
fn isolate<T>(work: impl FnOnce() -> Result<T, NormalizerError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.to_string()),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectionMethod;
    use crate::detect::DetectionNote;
    use crate::mapping::MappingNote;
    use crate::mapping::MARKET;
    use crate::matching::MatchMethod;
    use crate::record::RecordValue;
    use crate::record::ValidationFlag;
    use crate::spreadsheet::memory::MemoryWorkbook;
    use crate::spreadsheet::xlsx::fixture::package;
    use crate::spreadsheet::xlsx::fixture::sheet_data;
    use crate::spreadsheet::XlsxWorkbook;

    fn plan_rows() -> Vec<Vec<&'static str>> {
        vec![
            vec!["Media plan"],
            vec![],
            vec!["Market", "Platform", "Impressions", "Clicks", "CTR"],
            vec!["UAE", "Meta", "1000", "10", "150"],
            vec!["KSA", "DV360", "2000", "N/A", "1.5"],
        ]
    }

    fn rf_rows() -> Vec<Vec<&'static str>> {
        vec![
            vec!["METRICS/MARKET", "UAE", "KSA"],
            vec!["Campaign Reach (Absl)", "4019507", "2000000"],
        ]
    }

    fn workbook() -> MemoryWorkbook {
        MemoryWorkbook::new("campaign.xlsx")
            .with_sheet("Plan", plan_rows())
            .with_unreadable_sheet("Broken", "corrupt worksheet part")
            .with_sheet("R&F", rf_rows())
            .with_sheet("Notes", vec![vec!["free text"]])
    }

    fn run_with(config: NormalizerConfig, mut workbook: MemoryWorkbook) -> Result<PipelineOutput, NormalizerError> {
        Pipeline::new(config).unwrap().run(&mut workbook)
    }

    #[test]
    fn healthy_sheets_survive_a_failing_one() {
        let output = run_with(NormalizerConfig::default(), workbook()).unwrap();
        let report = &output.report;

        let states: Vec<(&str, SheetState)> = report.sheets.iter().map(|sheet| (sheet.name.as_str(), sheet.state)).collect();
        assert_eq!(
            states,
            vec![
                ("Plan", SheetState::Done),
                ("Broken", SheetState::Failed),
                ("R&F", SheetState::Done),
                ("Notes", SheetState::Done),
            ]
        );
        let broken = report.sheet("Broken").unwrap();
        let failure = broken.failure.as_ref().unwrap();
        assert_eq!(failure.stage, SheetState::Pending);
        assert_eq!(failure.cause, "Sheet 'Broken' cannot be read: corrupt worksheet part");
        assert_eq!(report.sheet("Notes").unwrap().detection, vec![DetectionNote::NoRegions]);

        assert_eq!(output.records.len(), 8);
        assert!(output.records[..6].iter().all(|record| record.sheet_name == "Plan"));
        let platforms: Vec<Option<&str>> = output.records[..6].iter().map(|record| record.platform.as_deref()).collect();
        assert_eq!(platforms[0], Some("META"));
        assert_eq!(platforms[3], Some("GOOGLE"));

        let flags: Vec<(&str, ValidationFlag)> = report
            .issues()
            .map(|issue| (issue.cell.as_str(), issue.flag))
            .collect();
        assert_eq!(flags, vec![("E4", ValidationFlag::RangeViolation), ("D5", ValidationFlag::NonNumeric)]);
        assert_eq!(output.records[4].value, RecordValue::Text("N/A".to_owned()));

        let melted: Vec<(Option<&str>, &str, &RecordValue)> = output.records[6..]
            .iter()
            .map(|record| (record.market.as_deref(), record.metric_name.as_str(), &record.value))
            .collect();
        assert_eq!(
            melted,
            vec![
                (Some("UAE"), "UNIQUES_REACH", &RecordValue::Number(4019507.0)),
                (Some("KSA"), "UNIQUES_REACH", &RecordValue::Number(2000000.0)),
            ]
        );
        let rf_region = report.region(&output.records[6].region_id).unwrap();
        assert_eq!(rf_region.source_type, SourceType::DeliveredRf);
        assert_eq!(rf_region.record_count, 2);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let first = run_with(NormalizerConfig::default(), workbook()).unwrap();
        let second = run_with(NormalizerConfig::default(), workbook()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.report.to_json().unwrap(), second.report.to_json().unwrap());

        let mut sequential = NormalizerConfig::default();
        sequential.parallel = false;
        assert_eq!(run_with(sequential, workbook()).unwrap(), first);
    }

    #[test]
    fn all_sheets_failing_is_an_error() {
        let workbook = MemoryWorkbook::new("broken.xlsx")
            .with_unreadable_sheet("One", "bad")
            .with_unreadable_sheet("Two", "bad");
        match run_with(NormalizerConfig::default(), workbook) {
            Err(NormalizerError::PipelineError(PipelineError::NoUsableSheets(report))) => {
                assert_eq!(report.failed_sheets().count(), 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn sheet_filter_and_required_regions() {
        let mut config = NormalizerConfig::default();
        config.sheets = vec!["Plan".to_owned(), "N*".to_owned()];
        config.require_regions = true;
        let output = run_with(config, workbook()).unwrap();

        let states: Vec<SheetState> = output.report.sheets.iter().map(|sheet| sheet.state).collect();
        assert_eq!(
            states,
            vec![SheetState::Done, SheetState::Skipped, SheetState::Skipped, SheetState::Failed]
        );
        let failure = output.report.sheet("Notes").and_then(|sheet| sheet.failure.clone()).unwrap();
        assert_eq!(failure.stage, SheetState::Detecting);
        assert_eq!(failure.cause, "No regions detected in sheet 'Notes'");
        assert_eq!(output.records.len(), 6);
    }

    #[test]
    fn market_column_recovered_end_to_end() {
        let workbook = MemoryWorkbook::new("campaign.xlsx").with_sheet(
            "Plan",
            vec![
                vec!["", "START"],
                vec!["Metrics / Market", "Impressions", "Clicks"],
                vec!["UAE", "100", "4"],
                vec!["KSA", "200", "8"],
                vec!["", "END"],
            ],
        );
        let output = run_with(NormalizerConfig::default(), workbook).unwrap();
        let markets: Vec<(Option<&str>, &str)> = output
            .records
            .iter()
            .map(|record| (record.market.as_deref(), record.metric_name.as_str()))
            .collect();
        assert_eq!(
            markets,
            vec![
                (Some("UAE"), "IMPRESSIONS"),
                (Some("UAE"), "CLICKS"),
                (Some("KSA"), "IMPRESSIONS"),
                (Some("KSA"), "CLICKS"),
            ]
        );

        let sheet = output.report.sheet("Plan").unwrap();
        assert_eq!(sheet.regions.len(), 1);
        let region = &sheet.regions[0];
        assert_eq!(region.range, "A2:C4");
        assert_eq!(
            region.mapping_notes,
            vec![MappingNote::MarketRecovered {
                column: "A".to_owned(),
                indicator: "Metrics / Market".to_owned()
            }]
        );
        let market = region.mappings.iter().find(|header| header.canonical.as_deref() == Some(MARKET)).unwrap();
        assert_eq!(market.method, MatchMethod::MarketRecovery);
    }

    #[test]
    fn xlsx_workbook_end_to_end() {
        let bytes = package(
            &[
                (
                    "R&F Meta",
                    sheet_data(&[
                        &["METRICS/MARKET", "UAE", "KSA"],
                        &["Campaign Reach (Absl)", "4019507", "2000000"],
                        &["Frequency", "2.1", "1.8"],
                    ]),
                ),
                ("Plan", sheet_data(&[&["Market", "Budget", "Clicks"], &["UAE", "1,500", "-3"]])),
            ],
            &[],
            false,
        );
        let mut workbook = XlsxWorkbook::from_bytes("campaign.xlsx", bytes).unwrap();
        let output = Pipeline::new(NormalizerConfig::default()).unwrap().run(&mut workbook).unwrap();

        let rows: Vec<(&str, Option<&str>, Option<&str>, &str, RecordValue, SourceType)> = output
            .records
            .iter()
            .map(|record| {
                (
                    record.sheet_name.as_str(),
                    record.platform.as_deref(),
                    record.market.as_deref(),
                    record.metric_name.as_str(),
                    record.value.clone(),
                    record.source_type,
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("R&F Meta", Some("META"), Some("UAE"), "UNIQUES_REACH", RecordValue::Number(4019507.0), SourceType::DeliveredRf),
                ("R&F Meta", Some("META"), Some("KSA"), "UNIQUES_REACH", RecordValue::Number(2000000.0), SourceType::DeliveredRf),
                ("R&F Meta", Some("META"), Some("UAE"), "FREQUENCY", RecordValue::Number(2.1), SourceType::DeliveredRf),
                ("R&F Meta", Some("META"), Some("KSA"), "FREQUENCY", RecordValue::Number(1.8), SourceType::DeliveredRf),
                ("Plan", None, Some("UAE"), "BUDGET", RecordValue::Number(1500.0), SourceType::Planned),
                ("Plan", None, Some("UAE"), "CLICKS", RecordValue::Number(-3.0), SourceType::Planned),
            ]
        );
        assert_eq!(output.records[5].flag, Some(ValidationFlag::NegativeValue));
    }

    #[test]
    fn unopenable_files_fail_alone() {
        let directory = std::env::temp_dir().join(format!("media_normalizer_batch_{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let bytes = package(&[("Plan", sheet_data(&[&["Market", "Budget"], &["UAE", "10"]]))], &[], false);
        std::fs::write(directory.join("a.xlsx"), bytes).unwrap();
        std::fs::write(directory.join("b.xlsx"), b"not a workbook").unwrap();

        let pattern = directory.join("*.xlsx").display().to_string();
        let outputs = Pipeline::new(NormalizerConfig::default()).unwrap().run_files(&[pattern]).unwrap();
        std::fs::remove_dir_all(&directory).unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].path.ends_with("a.xlsx"));
        assert_eq!(outputs[0].result.as_ref().map(|output| output.records.len()).ok(), Some(1));
        assert!(outputs[1].result.is_err());
    }

    /// Workbook whose extra sheet panics while being read
    struct ExplodingWorkbook(MemoryWorkbook);

    impl Workbook for ExplodingWorkbook {
        fn name(&self) -> String {
            self.0.name()
        }

        fn sheet_names(&self) -> Vec<String> {
            let mut names = self.0.sheet_names();
            names.push("Exploding".to_owned());
            names
        }

        fn read_sheet(&mut self, name: &str) -> Result<Grid, NormalizerError> {
            if name == "Exploding" {
                panic!("worksheet part exploded");
            }
            self.0.read_sheet(name)
        }
    }

    #[test]
    fn isolate_reports_errors_and_panics() {
        assert_eq!(isolate(|| Ok(3)), Ok(3));
        let error = isolate(|| -> Result<(), NormalizerError> { Err(PipelineError::NoRegions("Plan".to_owned()).into()) });
        assert_eq!(error, Err("No regions detected in sheet 'Plan'".to_owned()));
        let panicked = isolate(|| -> Result<(), NormalizerError> { panic!("grid exploded") });
        assert_eq!(panicked, Err("panicked: grid exploded".to_owned()));
    }

    #[test]
    fn panicking_sheet_fails_alone() {
        let mut workbook = ExplodingWorkbook(MemoryWorkbook::new("campaign.xlsx").with_sheet("Plan", plan_rows()));
        let output = Pipeline::new(NormalizerConfig::default()).unwrap().run(&mut workbook).unwrap();

        assert_eq!(output.records.len(), 6);
        assert_eq!(output.report.sheet("Plan").map(|sheet| sheet.state), Some(SheetState::Done));
        let exploding = output.report.sheet("Exploding").unwrap();
        assert_eq!(exploding.state, SheetState::Failed);
        assert_eq!(exploding.failure.as_ref().map(|failure| failure.cause.as_str()), Some("panicked: worksheet part exploded"));
    }

    #[test]
    fn out_of_range_date_serial_beside_a_healthy_sheet() {
        let bad = r#"<sheetData><row r="1"><c r="A1" s="1"><v>1e12</v></c></row></sheetData>"#;
        let bytes = package(
            &[
                ("Bad", bad.to_owned()),
                ("Plan", sheet_data(&[&["Market", "Budget", "Clicks"], &["UAE", "10", "4"]])),
            ],
            &[],
            false,
        );
        let mut workbook = XlsxWorkbook::from_bytes("campaign.xlsx", bytes).unwrap();
        assert_eq!(workbook.read_sheet("Bad").unwrap().text(1, 1), "1e12");

        let output = Pipeline::new(NormalizerConfig::default()).unwrap().run(&mut workbook).unwrap();
        let states: Vec<SheetState> = output.report.sheets.iter().map(|sheet| sheet.state).collect();
        assert_eq!(states, vec![SheetState::Done, SheetState::Done]);
        assert_eq!(output.records.len(), 2);
        assert!(output.records.iter().all(|record| record.sheet_name == "Plan"));
    }

    #[test]
    fn failing_region_keeps_the_others() {
        let pipeline = Pipeline::new(NormalizerConfig::default()).unwrap();
        let grid = MemoryWorkbook::new("campaign.xlsx")
            .with_sheet("Plan", plan_rows())
            .read_sheet("Plan")
            .unwrap();
        let broken = Region::new("Plan", (3, 5), (1, 5), 9, DetectionMethod::Identifier);
        let healthy = Region::new("Plan", (3, 5), (1, 5), 3, DetectionMethod::Identifier);

        let mut report = SheetReport::new("Plan");
        let records = pipeline.process_regions(&grid, &[broken, healthy], &mut report);

        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|record| record.region_id == RegionId::new("Plan", 1)));
        assert_eq!(report.regions.len(), 1);
        assert_eq!(report.regions[0].id, RegionId::new("Plan", 1));
        assert_eq!(
            report.failed_regions,
            vec![RegionFailure {
                id: RegionId::new("Plan", 0),
                range: "A3:E5".to_owned(),
                stage: SheetState::Mapping,
                cause: "Region A3:E5 of sheet 'Plan' has inconsistent bounds (header row 9)".to_owned(),
            }]
        );
    }
}
