//! # Numeric Validation
//!
//! Coerces metric values to numbers and flags the ones that cannot be
//! trusted. Flagged records are never dropped: a non-numeric value stays as
//! text, a negative count stays or is clamped depending on policy.

use crate::config::vocabulary::Unit;
use crate::config::Compiled;
use crate::config::NegativePolicy;
use crate::config::RangeRule;
use crate::config::ValidationConfig;
use crate::record::CanonicalRecord;
use crate::record::RecordValue;
use crate::record::RegionId;
use crate::record::ValidationFlag;
use crate::spreadsheet::reference::index_to_reference;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// What the validator did with a flagged value
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueAction {
    Retained,
    ClampedToZero,
}

/// A flagged record, kept for the diagnostics report
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub region_id: RegionId,
    pub sheet_name: String,
    pub cell: String,
    pub metric_name: String,
    pub flag: ValidationFlag,
    /// Value as read, before any correction
    pub value: String,
    pub action: IssueAction,
}

/// Displayed number once separators and currency symbols are removed
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<open>\()?(?P<sign>[-+])?(?P<digits>\d+(?:\.\d*)?|\.\d+)(?P<percent>%)?(?P<close>\))?$").unwrap()
});

/// Parses a displayed number: thousands separators, currency symbols, a
/// leading sign or accounting parentheses and a trailing `%` are accepted.
///
/// A percentage stays in percentage points for [`Unit::Percent`] metrics and
/// becomes a fraction of 100 for every other unit.
pub fn coerce(text: &str, unit: Unit) -> Option<f64> {
    let text: String = text
        .chars()
        .filter(|character| !matches!(character, ',' | '$' | '€' | '£') && !character.is_whitespace())
        .collect();
    let captures = NUMBER_RE.captures(&text)?;
    let parenthesized = captures.name("open").is_some();
    if parenthesized != captures.name("close").is_some() {
        return None;
    }

    let mut number: f64 = captures.name("digits")?.as_str().parse().ok()?;
    if parenthesized != (captures.name("sign").map(|sign| sign.as_str()) == Some("-")) {
        number = -number;
    }
    if captures.name("percent").is_some() && unit != Unit::Percent {
        number /= 100.0;
    }
    Some(number)
}

/// Metric name without the `_n` suffix added to duplicate headers
fn base_metric<'a>(compiled: &Compiled, metric_name: &'a str) -> &'a str {
    if compiled.fields.field(metric_name).is_some() || compiled.rf_metrics.field(metric_name).is_some() {
        return metric_name;
    }
    match metric_name.rsplit_once('_') {
        Some((base, suffix)) if !base.is_empty() && !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) => base,
        _ => metric_name,
    }
}

pub struct NumericValidator<'a> {
    config: &'a ValidationConfig,
    compiled: &'a Compiled,
}

impl<'a> NumericValidator<'a> {
    pub fn new(config: &'a ValidationConfig, compiled: &'a Compiled) -> Self {
        NumericValidator { config, compiled }
    }

    /// Declared unit of a metric; `None` for metrics outside the vocabulary.
    pub fn unit_of(&self, metric_name: &str) -> Option<Unit> {
        let base = base_metric(self.compiled, metric_name);
        self.compiled
            .fields
            .field(base)
            .or_else(|| self.compiled.rf_metrics.field(base))
            .map(|field| field.unit)
    }

    fn rule_of(&self, metric_name: &str) -> Option<&RangeRule> {
        let base = base_metric(self.compiled, metric_name);
        self.config.ranges.iter().find(|rule| rule.metric.eq_ignore_ascii_case(base))
    }

    /// Coerces and checks every record of a numeric metric. Records of text
    /// or unknown metrics pass through untouched.
    pub fn validate(&self, records: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, Vec<ValidationIssue>) {
        let mut issues = Vec::new();
        let records = records
            .into_iter()
            .map(|mut record| {
                if let Some(issue) = self.validate_record(&mut record) {
                    issues.push(issue);
                }
                record
            })
            .collect();
        (records, issues)
    }

    fn validate_record(&self, record: &mut CanonicalRecord) -> Option<ValidationIssue> {
        let unit = self.unit_of(&record.metric_name).filter(|unit| *unit != Unit::Text)?;
        let original = record.value.to_string();
        let number = match &record.value {
            RecordValue::Number(number) => Some(*number),
            RecordValue::Text(text) => coerce(text, unit),
        };

        let (flag, action) = match number {
            None => (ValidationFlag::NonNumeric, IssueAction::Retained),
            Some(number) if number < 0.0 && unit.is_count_like() => match self.config.negative_policy {
                NegativePolicy::Clamp => {
                    record.value = RecordValue::Number(0.0);
                    (ValidationFlag::NegativeValue, IssueAction::ClampedToZero)
                }
                NegativePolicy::PassThrough => {
                    record.value = RecordValue::Number(number);
                    (ValidationFlag::NegativeValue, IssueAction::Retained)
                }
            },
            Some(number) => {
                record.value = RecordValue::Number(number);
                match self.rule_of(&record.metric_name) {
                    Some(rule) if !rule.contains(number) => (ValidationFlag::RangeViolation, IssueAction::Retained),
                    _ => return None,
                }
            }
        };

        let cell = index_to_reference(record.row, record.column);
        warn!(
            sheet = %record.sheet_name,
            %cell,
            metric = %record.metric_name,
            value = %original,
            flag = flag.as_str(),
            action = ?action,
            "value flagged"
        );
        record.flag = Some(flag);
        Some(ValidationIssue {
            region_id: record.region_id.clone(),
            sheet_name: record.sheet_name.to_owned(),
            cell,
            metric_name: record.metric_name.to_owned(),
            flag,
            value: original,
            action,
        })
    }
}
