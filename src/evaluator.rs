//! Evaluation orchestrator: label indexing, overlap, matching and
//! aggregation for one prediction/reference pair.

use crate::aggregate::Aggregator;
use crate::config::EvaluatorConfig;
use crate::error::{PanopticEvalError, Result};
use crate::groups::UNGROUPED;
use crate::label_index::LabelIndex;
use crate::matching::{MatchResult, Matcher};
use crate::metrics::MetricRegistry;
use crate::overlap::OverlapMatrix;
use crate::types::{EvaluationReport, InstancePair};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Wall-clock duration of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration: Duration,
}

/// Intermediate artifacts of an evaluation, filled only in verbose mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugData {
    pub overlaps: Option<OverlapMatrix>,
    /// Raw matching per report key (`"ungrouped"` and each group name)
    pub match_results: BTreeMap<String, MatchResult>,
    pub timings: Vec<StageTiming>,
}

impl DebugData {
    pub fn is_empty(&self) -> bool {
        self.overlaps.is_none() && self.match_results.is_empty() && self.timings.is_empty()
    }

    pub fn timing(&self, stage: &str) -> Option<Duration> {
        self.timings
            .iter()
            .find(|timing| timing.stage == stage)
            .map(|timing| timing.duration)
    }
}

/// Records stage durations when enabled.
struct StageClock {
    enabled: bool,
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    fn record(&mut self, stage: &str, started: Instant) {
        let duration = started.elapsed();
        debug!("Stage {} took {:?}", stage, duration);
        if self.enabled {
            self.timings.push(StageTiming {
                stage: stage.to_string(),
                duration,
            });
        }
    }
}

/// A configured evaluator.
///
/// All configuration is checked in [`Evaluator::new`]; an evaluator that
/// exists can only fail on its input.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluatorConfig,
    matcher: Matcher,
    aggregator: Aggregator,
}

impl Evaluator {
    /// Build an evaluator over the default metric registry (DSC and IoU).
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an out-of-range threshold, an
    /// unregistered metric, an empty metric list or inconsistent groups.
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        Self::with_registry(config, &MetricRegistry::with_defaults())
    }

    /// Build an evaluator resolving metric names against `registry`.
    pub fn with_registry(config: EvaluatorConfig, registry: &MetricRegistry) -> Result<Self> {
        config.validate()?;
        let matcher = Matcher::new(
            registry,
            &config.decision_metric,
            config.decision_threshold,
            config.matching,
        )?;
        let aggregator = Aggregator::new(registry, config.metrics.as_slice(), &config.decision_metric)?;

        Ok(Self {
            config,
            matcher,
            aggregator,
        })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate one pair.
    ///
    /// # Arguments
    ///
    /// * `pair` - Prediction and reference arrays, matched or unmatched
    /// * `verbose` - Collect the overlap matrix, raw matchings and stage
    ///   timings into the returned `DebugData`
    ///
    /// # Returns
    ///
    /// The report over all instances and per configured group. The report is
    /// the same whether `verbose` is set or not.
    ///
    /// # Example
    ///
    /// ```
    /// use ndarray::{arr1, ArrayD};
    /// use panoptic_eval::{EvaluatorConfig, Evaluator, InstancePair};
    ///
    /// let prediction: ArrayD<u32> = arr1(&[1, 1, 1, 0, 0, 2, 2, 0, 0]).into_dyn();
    /// let reference: ArrayD<u32> = arr1(&[1, 1, 1, 1, 0, 0, 0, 2, 2]).into_dyn();
    /// let pair = InstancePair::unmatched(prediction, reference).unwrap();
    ///
    /// let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();
    /// let (report, _) = evaluator.evaluate(&pair, false).unwrap();
    ///
    /// assert_eq!(report.ungrouped.true_positives, 1);
    /// assert!((report.ungrouped.pq - 0.375).abs() < 1e-12);
    /// ```
    pub fn evaluate(
        &self,
        pair: &InstancePair,
        verbose: bool,
    ) -> Result<(EvaluationReport, DebugData)> {
        let mut clock = StageClock::new(verbose);
        let overlaps = self.prepare(pair, &mut clock)?;

        let started = Instant::now();
        let mut match_results = BTreeMap::new();
        let report = self.report(pair, &overlaps, &self.matcher, verbose.then_some(&mut match_results))?;
        clock.record("match_and_aggregate", started);

        info!(
            "Evaluated {} prediction and {} reference instances: TP={}, FP={}, FN={}, PQ={:.4}",
            report.ungrouped.num_pred_instances,
            report.ungrouped.num_ref_instances,
            report.ungrouped.true_positives,
            report.ungrouped.false_positives,
            report.ungrouped.false_negatives,
            report.ungrouped.pq
        );

        let debug_data = if verbose {
            DebugData {
                overlaps: Some(overlaps),
                match_results,
                timings: clock.timings,
            }
        } else {
            DebugData::default()
        };

        Ok((report, debug_data))
    }

    /// Evaluate one pair at several decision thresholds.
    ///
    /// The label indexes and the overlap matrix are computed once and reused
    /// for every threshold. Results are in input order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if any threshold is outside `[0, 1]`;
    /// this is checked before the arrays are scanned.
    pub fn evaluate_at_thresholds(
        &self,
        pair: &InstancePair,
        thresholds: &[f64],
    ) -> Result<Vec<(f64, EvaluationReport)>> {
        let matchers = thresholds
            .iter()
            .map(|&threshold| self.matcher.with_threshold(threshold))
            .collect::<Result<Vec<_>>>()?;

        let mut clock = StageClock::new(false);
        let overlaps = self.prepare(pair, &mut clock)?;

        let mut results = Vec::with_capacity(matchers.len());
        for matcher in &matchers {
            let report = self.report(pair, &overlaps, matcher, None)?;
            debug!(
                "Threshold {:.3}: TP={}, PQ={:.4}",
                matcher.decision_threshold(),
                report.ungrouped.true_positives,
                report.ungrouped.pq
            );
            results.push((matcher.decision_threshold(), report));
        }

        Ok(results)
    }

    fn check_input(&self, pair: &InstancePair) -> Result<()> {
        match self.config.expected_input {
            Some(expected) if expected != pair.kind() => {
                Err(PanopticEvalError::InvalidConfiguration(format!(
                    "expected {:?} input, got {:?}",
                    expected,
                    pair.kind()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Index both arrays and compute their overlap matrix.
    fn prepare(&self, pair: &InstancePair, clock: &mut StageClock) -> Result<OverlapMatrix> {
        self.check_input(pair)?;
        let labels = pair.labels();

        let started = Instant::now();
        let (pred_index, ref_index) = rayon::join(
            || LabelIndex::build(labels.prediction()),
            || LabelIndex::build(labels.reference()),
        );
        clock.record("label_index", started);
        debug!(
            "Indexed {} prediction and {} reference instances in a {:?} array",
            pred_index.len(),
            ref_index.len(),
            labels.shape()
        );

        let started = Instant::now();
        let overlaps = OverlapMatrix::compute(
            labels.prediction(),
            labels.reference(),
            &pred_index,
            &ref_index,
        )?;
        clock.record("overlap", started);

        Ok(overlaps)
    }

    fn report(
        &self,
        pair: &InstancePair,
        overlaps: &OverlapMatrix,
        matcher: &Matcher,
        mut match_results: Option<&mut BTreeMap<String, MatchResult>>,
    ) -> Result<EvaluationReport> {
        let matches = pair.resolve_matches(overlaps, matcher)?;
        let ungrouped = self.aggregator.aggregate(&matches, overlaps)?;
        if let Some(results) = match_results.as_deref_mut() {
            results.insert(UNGROUPED.to_string(), matches);
        }

        let mut groups = BTreeMap::new();
        for group in self.config.groups.iter() {
            let subset = overlaps.restrict(|id| group.contains(id), |id| group.contains(id));
            let matches = pair.resolve_matches(&subset, matcher)?;
            let report = self.aggregator.aggregate(&matches, &subset)?;
            debug!(
                "Group '{}': TP={}, FP={}, FN={}",
                group.name, report.true_positives, report.false_positives, report.false_negatives
            );

            if let Some(results) = match_results.as_deref_mut() {
                results.insert(group.name.clone(), matches);
            }
            groups.insert(group.name.clone(), report);
        }

        Ok(EvaluationReport { ungrouped, groups })
    }
}

/// Evaluate one pair without building a configuration first.
///
/// Uses optimal matching and no groups.
///
/// # Arguments
///
/// * `pair` - Prediction and reference arrays
/// * `metrics` - Names of the metrics reported per matched pair
/// * `decision_metric` - Metric used to accept matches and compute SQ
/// * `decision_threshold` - Minimum decision-metric value of a match
/// * `verbose` - Collect debug data
pub fn evaluate<S: AsRef<str>>(
    pair: &InstancePair,
    metrics: &[S],
    decision_metric: &str,
    decision_threshold: f64,
    verbose: bool,
) -> Result<(EvaluationReport, DebugData)> {
    let config = EvaluatorConfig::new(metrics, decision_metric, decision_threshold);
    Evaluator::new(config)?.evaluate(pair, verbose)
}
