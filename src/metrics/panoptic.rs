//! Instance-level detection counts and the panoptic-quality formulas.

use serde::{Deserialize, Serialize};

/// True/false positive and false negative counts of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl InstanceCounts {
    pub fn new(true_positives: usize, false_positives: usize, false_negatives: usize) -> Self {
        Self {
            true_positives,
            false_positives,
            false_negatives,
        }
    }

    /// Number of prediction instances (TP + FP).
    pub fn predictions(&self) -> usize {
        self.true_positives + self.false_positives
    }

    /// Number of reference instances (TP + FN).
    pub fn references(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    /// Precision = TP / (TP + FP), 0.0 without predictions.
    ///
    /// ```
    /// use panoptic_eval::metrics::InstanceCounts;
    ///
    /// let counts = InstanceCounts::new(8, 2, 3);
    /// assert_eq!(counts.precision(), 0.8);
    /// ```
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives as f64, self.predictions() as f64)
    }

    /// Recall = TP / (TP + FN), 0.0 without references.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives as f64, self.references() as f64)
    }

    /// Recognition quality RQ = TP / (TP + 0.5 FP + 0.5 FN).
    ///
    /// This is the instance-level F1 score; it is 0.0 when there are no
    /// instances at all.
    ///
    /// ```
    /// use panoptic_eval::metrics::InstanceCounts;
    ///
    /// let counts = InstanceCounts::new(1, 1, 1);
    /// assert_eq!(counts.recognition_quality(), 0.5);
    /// assert_eq!(InstanceCounts::default().recognition_quality(), 0.0);
    /// ```
    #[must_use]
    pub fn recognition_quality(&self) -> f64 {
        let tp = self.true_positives as f64;
        let denominator = tp + 0.5 * self.false_positives as f64 + 0.5 * self.false_negatives as f64;
        ratio(tp, denominator)
    }
}

/// PQ = SQ × RQ.
#[must_use]
pub fn panoptic_quality(segmentation_quality: f64, recognition_quality: f64) -> f64 {
    segmentation_quality * recognition_quality
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rq_equals_f1() {
        let counts = InstanceCounts::new(8, 2, 3);
        let p = counts.precision();
        let r = counts.recall();
        let f1 = 2.0 * p * r / (p + r);
        assert!((counts.recognition_quality() - f1).abs() < 1e-12);
    }

    #[test]
    fn test_all_false_positives() {
        let counts = InstanceCounts::new(0, 4, 0);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.recognition_quality(), 0.0);
    }

    #[test]
    fn test_perfect_counts() {
        let counts = InstanceCounts::new(5, 0, 0);
        assert_eq!(counts.precision(), 1.0);
        assert_eq!(counts.recall(), 1.0);
        assert_eq!(counts.recognition_quality(), 1.0);
        assert_eq!(panoptic_quality(0.9, counts.recognition_quality()), 0.9);
    }
}
