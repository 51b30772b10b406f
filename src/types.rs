//! Core data types for labeled arrays, instance pairs and evaluation reports.

use crate::error::{PanopticEvalError, Result};
use ndarray::{ArrayD, ArrayViewD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance label stored in a labeled array. `0` is background.
pub type LabelId = u32;

/// An n-dimensional array of instance labels.
pub type LabeledArray = ArrayD<LabelId>;

/// Inclusive n-dimensional bounding box in voxel coordinates.
///
/// `min[axis]` and `max[axis]` are both part of the box, so a single voxel
/// has `min == max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec<usize>,
    pub max: Vec<usize>,
}

impl BoundingBox {
    /// Create a new bounding box from inclusive corners.
    pub fn new(min: Vec<usize>, max: Vec<usize>) -> Self {
        debug_assert_eq!(min.len(), max.len());
        Self { min, max }
    }

    /// Box covering exactly one voxel.
    pub fn from_point(coord: &[usize]) -> Self {
        Self {
            min: coord.to_vec(),
            max: coord.to_vec(),
        }
    }

    /// Grow the box so that it contains `coord`.
    pub fn extend(&mut self, coord: &[usize]) {
        for (axis, &c) in coord.iter().enumerate() {
            if c < self.min[axis] {
                self.min[axis] = c;
            }
            if c > self.max[axis] {
                self.max[axis] = c;
            }
        }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.min.len()
    }

    /// Number of voxels covered by the box.
    pub fn volume(&self) -> u64 {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(&lo, &hi)| (hi - lo + 1) as u64)
            .product()
    }

    /// Check whether `coord` lies inside the box.
    pub fn contains(&self, coord: &[usize]) -> bool {
        coord.len() == self.ndim()
            && coord
                .iter()
                .enumerate()
                .all(|(axis, &c)| c >= self.min[axis] && c <= self.max[axis])
    }

    /// Check whether two boxes share at least one voxel.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.ndim() == other.ndim()
            && (0..self.ndim())
                .all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// The common sub-box of two boxes, if any.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }
        let min = self
            .min
            .iter()
            .zip(&other.min)
            .map(|(&a, &b)| a.max(b))
            .collect();
        let max = self
            .max
            .iter()
            .zip(&other.max)
            .map(|(&a, &b)| a.min(b))
            .collect();
        Some(BoundingBox::new(min, max))
    }
}

/// Which kind of [`InstancePair`] an evaluator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Instance ids already correspond across both arrays.
    Matched,
    /// Instance ids are unrelated; matching must run.
    Unmatched,
}

/// A prediction/reference pair of labeled arrays with identical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPair {
    prediction: LabeledArray,
    reference: LabeledArray,
}

impl LabelPair {
    /// Create a new pair, rejecting arrays of different shape.
    pub fn new(prediction: LabeledArray, reference: LabeledArray) -> Result<Self> {
        if prediction.shape() != reference.shape() {
            return Err(PanopticEvalError::ShapeMismatch {
                prediction: prediction.shape().to_vec(),
                reference: reference.shape().to_vec(),
            });
        }
        Ok(Self {
            prediction,
            reference,
        })
    }

    pub fn prediction(&self) -> ArrayViewD<'_, LabelId> {
        self.prediction.view()
    }

    pub fn reference(&self) -> ArrayViewD<'_, LabelId> {
        self.reference.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.prediction.shape()
    }

    /// The same pair with prediction and reference exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            prediction: self.reference.clone(),
            reference: self.prediction.clone(),
        }
    }
}

/// Input to the evaluator.
///
/// `Matched` pairs skip the matching stage: an id present in both arrays is
/// taken as a correspondence. `Unmatched` pairs go through overlap
/// computation and matching first.
#[derive(Debug, Clone, PartialEq)]
pub enum InstancePair {
    Matched(LabelPair),
    Unmatched(LabelPair),
}

impl InstancePair {
    /// Build a pair whose ids were correlated upstream.
    pub fn matched(prediction: LabeledArray, reference: LabeledArray) -> Result<Self> {
        Ok(Self::Matched(LabelPair::new(prediction, reference)?))
    }

    /// Build a pair whose ids still need to be matched.
    pub fn unmatched(prediction: LabeledArray, reference: LabeledArray) -> Result<Self> {
        Ok(Self::Unmatched(LabelPair::new(prediction, reference)?))
    }

    pub fn labels(&self) -> &LabelPair {
        match self {
            Self::Matched(labels) | Self::Unmatched(labels) => labels,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            Self::Matched(_) => InputKind::Matched,
            Self::Unmatched(_) => InputKind::Unmatched,
        }
    }

    /// The same pair with prediction and reference exchanged, keeping the variant.
    pub fn swapped(&self) -> Self {
        match self {
            Self::Matched(labels) => Self::Matched(labels.swapped()),
            Self::Unmatched(labels) => Self::Unmatched(labels.swapped()),
        }
    }
}

/// Metric values computed for one matched prediction/reference pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    pub pred_id: LabelId,
    pub ref_id: LabelId,
    /// Metric name to value, for every requested metric.
    pub values: BTreeMap<String, f64>,
}

/// Summary of one metric over all matched pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Mean value over matched pairs (segmentation quality for this metric)
    pub mean: f64,
    /// Population standard deviation over matched pairs
    pub std: f64,
    /// `mean * rq`
    pub pq: f64,
}

/// Panoptic-quality report for one set of instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    /// Number of prediction instances considered
    pub num_pred_instances: usize,
    /// Number of reference instances considered
    pub num_ref_instances: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// TP / (TP + FP)
    pub precision: f64,
    /// TP / (TP + FN)
    pub recall: f64,
    /// Recognition quality: TP / (TP + 0.5 FP + 0.5 FN)
    pub rq: f64,
    /// Segmentation quality: mean decision-metric value over matched pairs
    pub sq: f64,
    /// Standard deviation of the decision metric over matched pairs
    pub sq_std: f64,
    /// Panoptic quality: SQ * RQ
    pub pq: f64,
    /// Dice of the foreground union of all considered instances
    pub global_bin_dsc: f64,
    /// Name of the metric used for matching and SQ
    pub decision_metric: String,
    /// Per requested metric summaries
    pub metrics: BTreeMap<String, MetricSummary>,
    /// Per matched pair values, ordered by prediction id
    pub pairs: Vec<PairMetrics>,
}

impl MetricReport {
    /// Look up the summary for a metric by (case-insensitive) name.
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(&name.to_ascii_lowercase())
    }

    /// Look up the matched pair for a prediction id.
    pub fn pair_for_prediction(&self, pred_id: LabelId) -> Option<&PairMetrics> {
        self.pairs.iter().find(|pair| pair.pred_id == pred_id)
    }
}

/// Full result of one evaluation: the report over every instance plus one
/// report per configured group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub ungrouped: MetricReport,
    pub groups: BTreeMap<String, MetricReport>,
}

impl EvaluationReport {
    pub fn group(&self, name: &str) -> Option<&MetricReport> {
        self.groups.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_bbox_extend_and_volume() {
        let mut bbox = BoundingBox::from_point(&[2, 3]);
        bbox.extend(&[4, 1]);
        assert_eq!(bbox.min, vec![2, 1]);
        assert_eq!(bbox.max, vec![4, 3]);
        assert_eq!(bbox.volume(), 9);
        assert!(bbox.contains(&[3, 2]));
        assert!(!bbox.contains(&[5, 2]));
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BoundingBox::new(vec![0, 0], vec![4, 4]);
        let b = BoundingBox::new(vec![3, 2], vec![8, 8]);
        let c = BoundingBox::new(vec![5, 5], vec![6, 6]);

        let ab = a.intersection(&b).unwrap();
        assert_eq!(ab.min, vec![3, 2]);
        assert_eq!(ab.max, vec![4, 4]);
        assert!(a.intersection(&c).is_none());
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_touching_boxes_intersect() {
        let a = BoundingBox::new(vec![0], vec![3]);
        let b = BoundingBox::new(vec![3], vec![5]);
        assert_eq!(a.intersection(&b).unwrap().volume(), 1);
    }

    #[test]
    fn test_pair_rejects_shape_mismatch() {
        let pred = LabeledArray::zeros(IxDyn(&[4, 4]));
        let reference = LabeledArray::zeros(IxDyn(&[4, 5]));
        let result = InstancePair::unmatched(pred, reference);
        assert!(matches!(
            result,
            Err(PanopticEvalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_pair_swap_keeps_variant() {
        let pred = LabeledArray::from_elem(IxDyn(&[2]), 1);
        let reference = LabeledArray::zeros(IxDyn(&[2]));
        let pair = InstancePair::matched(pred.clone(), reference.clone()).unwrap();
        let swapped = pair.swapped();
        assert_eq!(swapped.kind(), InputKind::Matched);
        assert_eq!(swapped.labels().prediction(), reference.view());
        assert_eq!(swapped.labels().reference(), pred.view());
    }
}
