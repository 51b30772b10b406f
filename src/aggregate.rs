//! Aggregation of a matching into a panoptic-quality report.

use crate::error::{PanopticEvalError, Result};
use crate::matching::MatchResult;
use crate::metrics::{panoptic_quality, MetricRegistry, NamedMetric};
use crate::overlap::OverlapMatrix;
use crate::stats::{mean, std_dev};
use crate::types::{MetricReport, MetricSummary, PairMetrics};
use std::collections::BTreeMap;

/// Computes per-pair metric values and summary scores.
#[derive(Debug, Clone)]
pub struct Aggregator {
    metrics: Vec<NamedMetric>,
    decision_metric: NamedMetric,
}

impl Aggregator {
    /// Resolve the report metrics and the decision metric.
    ///
    /// Duplicate names (after case folding) are reported once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an empty metric list or a name the
    /// registry does not know.
    pub fn new<S: AsRef<str>>(
        registry: &MetricRegistry,
        metrics: &[S],
        decision_metric: &str,
    ) -> Result<Self> {
        if metrics.is_empty() {
            return Err(PanopticEvalError::InvalidConfiguration(
                "at least one report metric is required".to_string(),
            ));
        }

        let resolve = |name: &str| {
            registry.resolve(name).map_err(|_| {
                PanopticEvalError::InvalidConfiguration(format!(
                    "metric '{name}' is not registered"
                ))
            })
        };

        let mut resolved: Vec<NamedMetric> = Vec::with_capacity(metrics.len());
        for name in metrics {
            let metric = resolve(name.as_ref())?;
            if !resolved.iter().any(|m| m.name() == metric.name()) {
                resolved.push(metric);
            }
        }

        Ok(Self {
            metrics: resolved,
            decision_metric: resolve(decision_metric)?,
        })
    }

    /// Canonical names of the report metrics, in request order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(NamedMetric::name).collect()
    }

    pub fn decision_metric(&self) -> &NamedMetric {
        &self.decision_metric
    }

    /// Build the report of one matching.
    ///
    /// `overlaps` is the matrix the matching was computed from; it provides
    /// instance counts and the global binary Dice.
    pub fn aggregate(&self, matches: &MatchResult, overlaps: &OverlapMatrix) -> Result<MetricReport> {
        let counts = matches.counts();

        let mut values_by_metric: BTreeMap<String, Vec<f64>> = self
            .metrics
            .iter()
            .map(|m| (m.name().to_string(), Vec::with_capacity(matches.matched.len())))
            .collect();
        let mut decision_values = Vec::with_capacity(matches.matched.len());
        let mut pairs = Vec::with_capacity(matches.matched.len());

        for pair in &matches.matched {
            let mut values = BTreeMap::new();
            for metric in &self.metrics {
                let value = metric.compute(pair.intersection, pair.pred_size, pair.ref_size)?;
                values.insert(metric.name().to_string(), value);
                if let Some(column) = values_by_metric.get_mut(metric.name()) {
                    column.push(value);
                }
            }

            let decision = match values.get(self.decision_metric.name()) {
                Some(&value) => value,
                None => self
                    .decision_metric
                    .compute(pair.intersection, pair.pred_size, pair.ref_size)?,
            };
            decision_values.push(decision);

            pairs.push(PairMetrics {
                pred_id: pair.pred_id,
                ref_id: pair.ref_id,
                values,
            });
        }

        let rq = counts.recognition_quality();
        let sq = mean(&decision_values);

        let metrics = values_by_metric
            .into_iter()
            .map(|(name, values)| {
                let summary_mean = mean(&values);
                let summary = MetricSummary {
                    mean: summary_mean,
                    std: std_dev(&values),
                    pq: panoptic_quality(summary_mean, rq),
                };
                (name, summary)
            })
            .collect();

        let foreground = overlaps.total_prediction_voxels() + overlaps.total_reference_voxels();
        let global_bin_dsc = if foreground == 0 {
            0.0
        } else {
            2.0 * overlaps.total_intersection() as f64 / foreground as f64
        };

        Ok(MetricReport {
            num_pred_instances: overlaps.num_predictions(),
            num_ref_instances: overlaps.num_references(),
            true_positives: counts.true_positives,
            false_positives: counts.false_positives,
            false_negatives: counts.false_negatives,
            precision: counts.precision(),
            recall: counts.recall(),
            rq,
            sq,
            sq_std: std_dev(&decision_values),
            pq: panoptic_quality(sq, rq),
            global_bin_dsc,
            decision_metric: self.decision_metric.name().to_string(),
            metrics,
            pairs,
        })
    }
}
