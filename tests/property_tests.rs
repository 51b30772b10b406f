//! Property-based tests using proptest
//!
//! These tests verify invariants of overlap counting, metrics and matching
//! on randomly generated label arrays.

use ndarray::{arr1, ArrayD};
use panoptic_eval::evaluator::evaluate;
use panoptic_eval::label_index::LabelIndex;
use panoptic_eval::matching::{Matcher, MatchingStrategy};
use panoptic_eval::metrics::iou::iou_from_dice;
use panoptic_eval::metrics::{dice, iou, MetricRegistry};
use panoptic_eval::overlap::OverlapMatrix;
use panoptic_eval::InstancePair;
use proptest::prelude::*;

/// Two 1-D label arrays of equal length with a handful of ids each.
fn label_arrays() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
    (1usize..64).prop_flat_map(|len| {
        (
            prop::collection::vec(0u32..6, len),
            prop::collection::vec(0u32..6, len),
        )
    })
}

/// Intersection and sizes of two non-empty instances.
fn pair_counts() -> impl Strategy<Value = (u64, u64, u64)> {
    (1u64..1000, 1u64..1000).prop_flat_map(|(a, b)| (0..=a.min(b), Just(a), Just(b)))
}

fn to_array(values: &[u32]) -> ArrayD<u32> {
    arr1(values).into_dyn()
}

fn overlap_matrix(prediction: &[u32], reference: &[u32]) -> OverlapMatrix {
    let (prediction, reference) = (to_array(prediction), to_array(reference));
    let pred_index = LabelIndex::build(prediction.view());
    let ref_index = LabelIndex::build(reference.view());
    OverlapMatrix::compute(prediction.view(), reference.view(), &pred_index, &ref_index).unwrap()
}

fn matcher(threshold: f64, strategy: MatchingStrategy) -> Matcher {
    Matcher::new(&MetricRegistry::with_defaults(), "iou", threshold, strategy).unwrap()
}

// Property: pair metrics stay in [0, 1] and agree with each other
proptest! {
    #[test]
    fn prop_metric_range((i, a, b) in pair_counts()) {
        let dsc = dice(i, a, b).unwrap();
        let jaccard = iou(i, a, b).unwrap();
        prop_assert!((0.0..=1.0).contains(&dsc), "DSC should be in [0,1], got {}", dsc);
        prop_assert!((0.0..=1.0).contains(&jaccard), "IoU should be in [0,1], got {}", jaccard);
        prop_assert!(jaccard <= dsc + 1e-12, "IoU should never exceed DSC");
    }

    #[test]
    fn prop_iou_from_dice((i, a, b) in pair_counts()) {
        let derived = iou_from_dice(dice(i, a, b).unwrap());
        let direct = iou(i, a, b).unwrap();
        prop_assert!((derived - direct).abs() < 1e-9,
                     "IoU from DSC {} differs from direct IoU {}", derived, direct);
    }

    #[test]
    fn prop_metrics_symmetric((i, a, b) in pair_counts()) {
        prop_assert_eq!(dice(i, a, b).unwrap(), dice(i, b, a).unwrap());
        prop_assert_eq!(iou(i, a, b).unwrap(), iou(i, b, a).unwrap());
    }
}

// Property: the overlap matrix accounts for every shared foreground voxel
proptest! {
    #[test]
    fn prop_overlap_conservation((prediction, reference) in label_arrays()) {
        let overlaps = overlap_matrix(&prediction, &reference);
        let both_foreground = prediction
            .iter()
            .zip(&reference)
            .filter(|&(&p, &r)| p != 0 && r != 0)
            .count() as u64;
        prop_assert_eq!(overlaps.total_intersection(), both_foreground);
        prop_assert_eq!(
            overlaps.total_prediction_voxels(),
            prediction.iter().filter(|&&p| p != 0).count() as u64
        );
    }
}

// Property: reports are consistent with instance counts
proptest! {
    #[test]
    fn prop_report_counts((prediction, reference) in label_arrays(), threshold in 0.0f64..=1.0) {
        let pair = InstancePair::unmatched(to_array(&prediction), to_array(&reference)).unwrap();
        let (report, _) = evaluate(&pair, &["dsc", "iou"], "iou", threshold, false).unwrap();
        let r = &report.ungrouped;

        prop_assert_eq!(r.true_positives + r.false_positives, r.num_pred_instances);
        prop_assert_eq!(r.true_positives + r.false_negatives, r.num_ref_instances);
        prop_assert_eq!(r.pairs.len(), r.true_positives);
        for value in [r.sq, r.rq, r.pq, r.global_bin_dsc] {
            prop_assert!((0.0..=1.0).contains(&value), "Score out of range: {}", value);
        }
        for pair in &r.pairs {
            prop_assert!(pair.values["iou"] >= threshold, "Matched pair below threshold");
        }
    }

    #[test]
    fn prop_swap_symmetry((prediction, reference) in label_arrays()) {
        let pair = InstancePair::unmatched(to_array(&prediction), to_array(&reference)).unwrap();
        let (forward, _) = evaluate(&pair, &["iou"], "iou", 0.5, false).unwrap();
        let (backward, _) = evaluate(&pair.swapped(), &["iou"], "iou", 0.5, false).unwrap();

        prop_assert_eq!(forward.ungrouped.true_positives, backward.ungrouped.true_positives);
        prop_assert_eq!(forward.ungrouped.false_positives, backward.ungrouped.false_negatives);
        prop_assert_eq!(forward.ungrouped.false_negatives, backward.ungrouped.false_positives);
        prop_assert!((forward.ungrouped.pq - backward.ungrouped.pq).abs() < 1e-5);
    }
}

// Property: matching behaves monotonically and deterministically
proptest! {
    #[test]
    fn prop_threshold_monotonic(
        (prediction, reference) in label_arrays(),
        low in 0.0f64..=1.0,
        high in 0.0f64..=1.0
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let overlaps = overlap_matrix(&prediction, &reference);

        let at_low = matcher(low, MatchingStrategy::Optimal).match_instances(&overlaps).unwrap();
        let at_high = matcher(high, MatchingStrategy::Optimal).match_instances(&overlaps).unwrap();
        prop_assert!(at_high.matched.len() <= at_low.matched.len(),
                     "Raising the threshold from {} to {} added matches", low, high);
    }

    #[test]
    fn prop_optimal_never_smaller_than_greedy(
        (prediction, reference) in label_arrays(),
        threshold in 0.0f64..=1.0
    ) {
        let overlaps = overlap_matrix(&prediction, &reference);
        let optimal = matcher(threshold, MatchingStrategy::Optimal).match_instances(&overlaps).unwrap();
        let greedy = matcher(threshold, MatchingStrategy::Greedy).match_instances(&overlaps).unwrap();
        prop_assert!(optimal.matched.len() >= greedy.matched.len());
    }

    #[test]
    fn prop_entry_order_does_not_matter(
        (prediction, reference) in label_arrays(),
        seed in any::<u64>()
    ) {
        let overlaps = overlap_matrix(&prediction, &reference);
        let mut shuffled = overlaps.entries().to_vec();
        // Deterministic rotation plus reversal as a permutation
        if !shuffled.is_empty() {
            let shift = (seed % shuffled.len() as u64) as usize;
            shuffled.rotate_left(shift);
            if seed % 2 == 1 {
                shuffled.reverse();
            }
        }
        let rebuilt = OverlapMatrix::from_entries(
            shuffled,
            LabelIndex::build(to_array(&prediction).view()).sizes(),
            LabelIndex::build(to_array(&reference).view()).sizes(),
        )
        .unwrap();

        for strategy in [MatchingStrategy::Optimal, MatchingStrategy::Greedy] {
            let m = matcher(0.3, strategy);
            prop_assert_eq!(m.match_instances(&overlaps).unwrap(), m.match_instances(&rebuilt).unwrap());
        }
    }
}
