//! # Configuration
//!
//! Everything the engine's heuristics depend on: marker tokens, detection
//! windows, similarity thresholds, reach & frequency header patterns,
//! validation rules and the vocabulary. Every section has defaults, so a JSON
//! document only needs the keys it changes.

pub mod vocabulary;

use crate::config::vocabulary::Vocabulary;
use crate::error::NormalizerError;
use crate::error::ResultMessage;
use crate::matching::KeywordSet;
use crate::matching::Matcher;
use crate::spreadsheet::criteria::Criteria;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Threshold '{0}' must be within [0, 1], got {1}")]
    ThresholdOutOfRange(&'static str, f64),

    #[error("At least one {0} marker is required")]
    MissingMarkers(&'static str),

    #[error("Setting '{0}' must be greater than zero")]
    ZeroSetting(&'static str),

    #[error("Range rule for '{0}' has min {1} above max {2}")]
    InvalidRange(String, f64, f64),
}

/// Sentinel tokens delimiting marker-based regions
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MarkerConfig {
    pub start: Vec<String>,
    pub end: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            start: vec!["START".to_owned(), "TABLE START".to_owned()],
            end: vec!["END".to_owned(), "TABLE END".to_owned()],
        }
    }
}

/// When the identifier-based strategy runs
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierPass {
    /// On every sheet, supplementing marker regions
    #[default]
    Always,
    /// Only on sheets without marker regions
    WhenNoMarkers,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Rows from the top of the sheet searched for header candidates
    pub scan_depth: usize,
    /// Keyword hits a row needs to become a header candidate
    pub min_keyword_matches: usize,
    /// Consecutive blank rows ending an identifier-based region
    pub blank_row_run: usize,
    /// Consecutive blank columns splitting a header row into separate tables
    pub blank_col_run: usize,
    /// Column distance tolerated between a start marker and its end marker
    pub marker_band: usize,
    pub identifier_pass: IdentifierPass,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            scan_depth: 200,
            min_keyword_matches: 2,
            blank_row_run: 2,
            blank_col_run: 2,
            marker_band: 1,
            identifier_pass: IdentifierPass::Always,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MappingConfig {
    /// Minimum similarity for a fuzzy header match
    pub similarity_floor: f64,
    /// Mappings below this confidence are treated as unmapped
    pub acceptance_threshold: f64,
    /// Widen regions left to recover a market column
    pub recover_market_column: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        MappingConfig {
            similarity_floor: 0.75,
            acceptance_threshold: 0.75,
            recover_market_column: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RfConfig {
    /// Regular expressions matching the first header of a metrics-by-market block
    pub header_patterns: Vec<String>,
}

impl Default for RfConfig {
    fn default() -> Self {
        RfConfig {
            header_patterns: vec![
                r"(?i)^\s*metrics?\s*[/\\|&-]?\s*markets?\s*$".to_owned(),
                r"(?i)^\s*kpis?\s*[/\\|&-]?\s*markets?\s*$".to_owned(),
                r"(?i)^\s*metrics?\s*$".to_owned(),
            ],
        }
    }
}

/// Handling of negative values in count-like metrics
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NegativePolicy {
    /// Keep the value and flag it
    #[default]
    PassThrough,
    /// Replace the value with zero and flag it
    Clamp,
}

/// Inclusive bounds for one metric
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RangeRule {
    pub metric: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl RangeRule {
    pub fn new(metric: &str, min: Option<f64>, max: Option<f64>) -> Self {
        RangeRule {
            metric: metric.to_owned(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map(|min| value >= min).unwrap_or(true) && self.max.map(|max| value <= max).unwrap_or(true)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub negative_policy: NegativePolicy,
    pub ranges: Vec<RangeRule>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            negative_policy: NegativePolicy::PassThrough,
            ranges: vec![
                RangeRule::new("CTR", Some(0.0), Some(100.0)),
                RangeRule::new("VTR", Some(0.0), Some(100.0)),
                RangeRule::new("REACH_PERCENT", Some(0.0), Some(100.0)),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NormalizerConfig {
    pub markers: MarkerConfig,
    pub detection: DetectionConfig,
    pub mapping: MappingConfig,
    pub rf: RfConfig,
    pub validation: ValidationConfig,
    pub vocabulary: Vocabulary,
    /// Glob patterns selecting sheets by name; empty selects all
    pub sheets: Vec<String>,
    /// Treat a sheet without regions as failed
    pub require_regions: bool,
    /// Process sheets in parallel
    pub parallel: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            markers: MarkerConfig::default(),
            detection: DetectionConfig::default(),
            mapping: MappingConfig::default(),
            rf: RfConfig::default(),
            validation: ValidationConfig::default(),
            vocabulary: Vocabulary::default(),
            sheets: Vec::new(),
            require_regions: false,
            parallel: true,
        }
    }
}

impl NormalizerConfig {
    pub fn from_json_str(json: &str) -> Result<NormalizerConfig, NormalizerError> {
        let config: NormalizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<NormalizerConfig, NormalizerError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let json = std::fs::read_to_string(path)
            .map_err(NormalizerError::from)
            .with_prefix(&name)?;
        NormalizerConfig::from_json_str(&json).with_prefix(&name)
    }

    /// Checks thresholds, marker lists and patterns.
    pub fn validate(&self) -> Result<(), NormalizerError> {
        for (name, value) in [
            ("mapping.similarity_floor", self.mapping.similarity_floor),
            ("mapping.acceptance_threshold", self.mapping.acceptance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                Err(ConfigError::ThresholdOutOfRange(name, value))?
            }
        }
        if self.markers.start.iter().all(|marker| marker.trim().is_empty()) {
            Err(ConfigError::MissingMarkers("start"))?
        }
        if self.markers.end.iter().all(|marker| marker.trim().is_empty()) {
            Err(ConfigError::MissingMarkers("end"))?
        }
        for (name, value) in [
            ("detection.scan_depth", self.detection.scan_depth),
            ("detection.min_keyword_matches", self.detection.min_keyword_matches),
            ("detection.blank_row_run", self.detection.blank_row_run),
            ("detection.blank_col_run", self.detection.blank_col_run),
        ] {
            if value == 0 {
                Err(ConfigError::ZeroSetting(name))?
            }
        }
        for rule in &self.validation.ranges {
            if let Some((min, max)) = rule.min.zip(rule.max) {
                if min > max {
                    Err(ConfigError::InvalidRange(rule.metric.to_owned(), min, max))?
                }
            }
        }
        self.compile().map(|_| ())
    }

    /// Builds the matchers, keyword sets, regexes and sheet filter once.
    pub fn compile(&self) -> Result<Compiled, NormalizerError> {
        let vocabulary = &self.vocabulary;
        let rf_headers = self
            .rf
            .header_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Compiled {
            fields: Matcher::new(&vocabulary.fields, self.mapping.similarity_floor),
            rf_metrics: Matcher::new(&vocabulary.rf_metrics, self.mapping.similarity_floor),
            keywords: KeywordSet::new(&vocabulary.identifier_keywords),
            market_indicators: KeywordSet::new(&vocabulary.market_indicators),
            markets: KeywordSet::new(&vocabulary.markets),
            platforms: vocabulary
                .platforms
                .iter()
                .map(|platform| (platform.name.to_owned(), KeywordSet::new(&platform.aliases)))
                .collect(),
            rf_sheets: KeywordSet::new(&vocabulary.rf_keywords),
            delivery_sheets: KeywordSet::new(&vocabulary.delivery_keywords),
            start_markers: to_marker_tokens(&self.markers.start),
            end_markers: to_marker_tokens(&self.markers.end),
            rf_headers,
            criteria: Criteria::new(&self.sheets)?,
        })
    }
}

fn to_marker_tokens(markers: &[String]) -> Vec<String> {
    markers
        .iter()
        .map(|marker| marker.trim().to_lowercase())
        .filter(|marker| !marker.is_empty())
        .collect()
}

/// Compiled view of a [`NormalizerConfig`], shared read-only by all sheets.
#[derive(Clone, Debug)]
pub struct Compiled {
    pub fields: Matcher,
    pub rf_metrics: Matcher,
    pub keywords: KeywordSet,
    pub market_indicators: KeywordSet,
    pub markets: KeywordSet,
    pub platforms: Vec<(String, KeywordSet)>,
    pub rf_sheets: KeywordSet,
    pub delivery_sheets: KeywordSet,
    /// Lowercased start marker tokens
    pub start_markers: Vec<String>,
    /// Lowercased end marker tokens
    pub end_markers: Vec<String>,
    pub rf_headers: Vec<Regex>,
    pub(crate) criteria: Criteria,
}

impl Compiled {
    pub fn is_start_marker(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        self.start_markers.iter().any(|marker| *marker == text)
    }

    pub fn is_end_marker(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        self.end_markers.iter().any(|marker| *marker == text)
    }

    /// True for the first header of a metrics-by-market block
    pub fn is_rf_header(&self, text: &str) -> bool {
        self.rf_headers.iter().any(|regex| regex.is_match(text))
    }

    /// Canonical platform named by the text, if any
    pub fn platform_of(&self, text: &str) -> Option<String> {
        self.platforms
            .iter()
            .find(|(_, aliases)| aliases.matches(text))
            .map(|(name, _)| name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NormalizerConfig::default();
        assert!(config.validate().is_ok());
        let compiled = config.compile().unwrap();
        assert!(compiled.is_start_marker("  start "));
        assert!(compiled.is_end_marker("Table End"));
        assert!(!compiled.is_end_marker("Ending"));
        assert!(compiled.is_rf_header("METRICS/MARKET"));
        assert!(compiled.is_rf_header("Metrics / Market"));
        assert!(!compiled.is_rf_header("Market"));
        assert_eq!(compiled.platform_of("DV360").as_deref(), Some("GOOGLE"));
        assert_eq!(compiled.platform_of("YouTube Delivery").as_deref(), Some("GOOGLE"));
        assert_eq!(compiled.platform_of("Instagram"), Some("META".to_owned()));
        assert_eq!(compiled.platform_of("Radio"), None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = NormalizerConfig::from_json_str(
            r#"{
                "markers": {"start": ["BEGIN"]},
                "validation": {"negative_policy": "clamp"},
                "sheets": ["Plan*"],
                "parallel": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.markers.start, vec!["BEGIN"]);
        assert_eq!(config.markers.end, MarkerConfig::default().end);
        assert_eq!(config.validation.negative_policy, NegativePolicy::Clamp);
        assert_eq!(config.validation.ranges.len(), 3);
        assert_eq!(config.detection, DetectionConfig::default());
        assert!(!config.parallel);
        assert!(config.compile().unwrap().criteria.accept("Plan Q1"));
    }

    #[test]
    fn vocabulary_aliases_from_json() {
        let config = NormalizerConfig::from_json_str(
            r#"{"vocabulary": {"fields": [
                {"name": "SPEND", "aliases": ["media cost"], "role": "metric", "unit": "currency"}
            ]}}"#,
        )
        .unwrap();
        let compiled = config.compile().unwrap();
        assert_eq!(compiled.fields.resolve("Media Cost").unwrap().name, "SPEND");
        // other vocabulary tables keep their defaults
        assert!(compiled.markets.is_exact("UAE"));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let errors = [
            r#"{"mapping": {"similarity_floor": 1.5}}"#,
            r#"{"markers": {"end": []}}"#,
            r#"{"detection": {"blank_row_run": 0}}"#,
            r#"{"rf": {"header_patterns": ["("]}}"#,
            r#"{"sheets": ["["]}"#,
            r#"{"validation": {"ranges": [{"metric": "CTR", "min": 5, "max": 1}]}}"#,
            r#"{"parallel": "yes"}"#,
        ];
        for json in errors {
            assert!(NormalizerConfig::from_json_str(json).is_err(), "{json}");
        }
        let message = NormalizerConfig::from_json_str(errors[0]).err().map(|error| error.to_string());
        assert_eq!(
            message.as_deref(),
            Some("Threshold 'mapping.similarity_floor' must be within [0, 1], got 1.5")
        );
    }
}
