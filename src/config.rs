//! Evaluator configuration and JSON loading.
//!
//! ```json
//! {
//!   "metrics": ["dsc", "iou"],
//!   "decision_metric": "dsc",
//!   "decision_threshold": 0.5,
//!   "matching": "optimal",
//!   "expected_input": "unmatched",
//!   "groups": [
//!     { "name": "vertebra", "labels": [1, 2, 3] }
//!   ]
//! }
//! ```
//!
//! Every field is optional; missing fields take the values of
//! [`EvaluatorConfig::default`].

use crate::error::{PanopticEvalError, Result};
use crate::groups::SegmentationGroups;
use crate::matching::MatchingStrategy;
use crate::metrics::{DSC, IOU};
use crate::threshold::validate_threshold;
use crate::types::InputKind;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Resolved evaluator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Metrics computed for every matched pair
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
    /// Metric deciding whether a candidate pair matches; also drives SQ
    #[serde(default = "default_decision_metric")]
    pub decision_metric: String,
    /// Minimum decision-metric value of a match, in [0, 1]
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    #[serde(default)]
    pub matching: MatchingStrategy,
    /// Reject pairs of the other variant when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_input: Option<InputKind>,
    #[serde(default, skip_serializing_if = "SegmentationGroups::is_empty")]
    pub groups: SegmentationGroups,
}

fn default_metrics() -> Vec<String> {
    vec![DSC.to_string(), IOU.to_string()]
}

fn default_decision_metric() -> String {
    IOU.to_string()
}

fn default_decision_threshold() -> f64 {
    0.5
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
            decision_metric: default_decision_metric(),
            decision_threshold: default_decision_threshold(),
            matching: MatchingStrategy::default(),
            expected_input: None,
            groups: SegmentationGroups::default(),
        }
    }
}

impl EvaluatorConfig {
    pub fn new<S: AsRef<str>>(metrics: &[S], decision_metric: &str, decision_threshold: f64) -> Self {
        Self {
            metrics: metrics.iter().map(|m| m.as_ref().to_string()).collect(),
            decision_metric: decision_metric.to_string(),
            decision_threshold,
            ..Self::default()
        }
    }

    pub fn with_matching(mut self, matching: MatchingStrategy) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_expected_input(mut self, expected_input: InputKind) -> Self {
        self.expected_input = Some(expected_input);
        self
    }

    pub fn with_groups(mut self, groups: SegmentationGroups) -> Self {
        self.groups = groups;
        self
    }

    /// Registry-independent checks: threshold range, non-empty metric list,
    /// group consistency. Metric names are checked by the evaluator against
    /// its registry.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.decision_threshold)?;
        if self.metrics.is_empty() {
            return Err(PanopticEvalError::InvalidConfiguration(
                "at least one report metric is required".to_string(),
            ));
        }
        if self.decision_metric.trim().is_empty() {
            return Err(PanopticEvalError::InvalidConfiguration(
                "decision metric must not be empty".to_string(),
            ));
        }
        self.groups.validate()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Load and validate a configuration from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// configuration is invalid.
///
/// # Example
///
/// ```no_run
/// use panoptic_eval::config::load_from_file;
///
/// let config = load_from_file("configs/spine.json").unwrap();
/// println!("Decision metric: {}", config.decision_metric);
/// ```
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<EvaluatorConfig> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: EvaluatorConfig = serde_json::from_reader(reader)?;

    config.validate()?;

    Ok(config)
}

/// Load and validate a configuration from a JSON string.
///
/// # Example
///
/// ```
/// use panoptic_eval::config::load_from_string;
/// use panoptic_eval::matching::MatchingStrategy;
///
/// let config = load_from_string(r#"{ "decision_metric": "dsc", "matching": "greedy" }"#).unwrap();
/// assert_eq!(config.decision_metric, "dsc");
/// assert_eq!(config.decision_threshold, 0.5);
/// assert_eq!(config.matching, MatchingStrategy::Greedy);
/// ```
pub fn load_from_string(json_str: &str) -> Result<EvaluatorConfig> {
    let config: EvaluatorConfig = serde_json::from_str(json_str)?;

    config.validate()?;

    Ok(config)
}

/// Load a named configuration profile, `<dir>/<name>.json`.
///
/// `name` may be given with or without the `.json` extension but must not
/// contain path separators.
pub fn load_profile<P: AsRef<Path>>(dir: P, name: &str) -> Result<EvaluatorConfig> {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    if stem.is_empty() || stem.contains(['/', '\\']) || stem == ".." || stem == "." {
        return Err(PanopticEvalError::InvalidConfiguration(format!(
            "invalid configuration profile name '{name}'"
        )));
    }
    load_from_file(dir.as_ref().join(format!("{stem}.json")))
}
