//! Name-keyed registry of pair metrics.
//!
//! Every metric is a plain function of `(intersection, size_a, size_b)`.
//! Names are matched case-insensitively and stored in lowercase.

use crate::error::{PanopticEvalError, Result};
use crate::metrics::{dice, iou};
use std::collections::BTreeMap;
use std::fmt;

/// Dice similarity coefficient.
pub const DSC: &str = "dsc";
/// Intersection over Union.
pub const IOU: &str = "iou";

/// Signature shared by all pair metrics: `(intersection, size_a, size_b) -> value`.
pub type PairMetricFn = fn(u64, u64, u64) -> Result<f64>;

/// A metric resolved from the registry.
#[derive(Clone)]
pub struct NamedMetric {
    name: String,
    func: PairMetricFn,
}

impl NamedMetric {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compute(&self, intersection: u64, size_a: u64, size_b: u64) -> Result<f64> {
        (self.func)(intersection, size_a, size_b)
    }
}

impl fmt::Debug for NamedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedMetric").field(&self.name).finish()
    }
}

/// Mapping from metric name to metric function.
#[derive(Clone)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, PairMetricFn>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.metrics.keys()).finish()
    }
}

impl MetricRegistry {
    /// Registry without any metric.
    pub fn empty() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    /// Registry holding `dsc` and `iou`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.metrics.insert(DSC.to_string(), dice as PairMetricFn);
        registry.metrics.insert(IOU.to_string(), iou as PairMetricFn);
        registry
    }

    /// Add or replace a metric.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a blank name.
    ///
    /// # Example
    ///
    /// ```
    /// use panoptic_eval::metrics::MetricRegistry;
    ///
    /// fn overlap_fraction(intersection: u64, _a: u64, size_b: u64) -> panoptic_eval::Result<f64> {
    ///     Ok(if size_b == 0 { 0.0 } else { intersection as f64 / size_b as f64 })
    /// }
    ///
    /// let mut registry = MetricRegistry::with_defaults();
    /// registry.register("Coverage", overlap_fraction).unwrap();
    /// assert_eq!(registry.compute("coverage", 2, 5, 4).unwrap(), 0.5);
    /// ```
    pub fn register(&mut self, name: &str, metric: PairMetricFn) -> Result<()> {
        let key = normalize(name);
        if key.is_empty() {
            return Err(PanopticEvalError::InvalidConfiguration(
                "metric name must not be empty".to_string(),
            ));
        }
        self.metrics.insert(key, metric);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(&normalize(name))
    }

    /// Registered names in lowercase, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    /// Resolve a metric by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMetric` when `name` is not registered.
    pub fn resolve(&self, name: &str) -> Result<NamedMetric> {
        let key = normalize(name);
        self.metrics
            .get(&key)
            .map(|&func| NamedMetric { name: key.clone(), func })
            .ok_or_else(|| PanopticEvalError::UnknownMetric(name.to_string()))
    }

    /// Compute a metric by name.
    pub fn compute(&self, name: &str, intersection: u64, size_a: u64, size_b: u64) -> Result<f64> {
        self.resolve(name)?.compute(intersection, size_a, size_b)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
