//! Per-pair metrics and panoptic-quality formulas.

pub mod dice;
pub mod iou;
pub mod panoptic;
pub mod registry;

pub use dice::dice;
pub use iou::iou;
pub use panoptic::{panoptic_quality, InstanceCounts};
pub use registry::{MetricRegistry, NamedMetric, PairMetricFn, DSC, IOU};

use crate::error::{PanopticEvalError, Result};

/// Compute a named metric with the default registry.
///
/// # Example
///
/// ```
/// use panoptic_eval::metrics::compute_metric;
///
/// let dsc = compute_metric("DSC", 3, 3, 4).unwrap();
/// assert!((dsc - 6.0 / 7.0).abs() < 1e-12);
/// assert!(compute_metric("hausdorff", 3, 3, 4).is_err());
/// ```
pub fn compute_metric(name: &str, intersection: u64, size_a: u64, size_b: u64) -> Result<f64> {
    MetricRegistry::with_defaults().compute(name, intersection, size_a, size_b)
}

/// Reject counts no pair of non-empty instances can produce.
pub(crate) fn check_pair_counts(
    metric: &str,
    intersection: u64,
    size_a: u64,
    size_b: u64,
) -> Result<()> {
    if size_a + size_b == 0 {
        return Err(PanopticEvalError::DegenerateInput(format!(
            "{metric}: both instances are empty"
        )));
    }
    if intersection > size_a.min(size_b) {
        return Err(PanopticEvalError::DegenerateInput(format!(
            "{metric}: intersection {intersection} exceeds instance sizes ({size_a}, {size_b})"
        )));
    }
    Ok(())
}
