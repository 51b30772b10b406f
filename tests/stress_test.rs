//! Stress tests with large volumes and many instances.

use ndarray::{s, Array2, Array3};
use panoptic_eval::evaluator::Evaluator;
use panoptic_eval::{EvaluatorConfig, InstancePair, MatchingStrategy};

const CELL: usize = 8;
const CELLS_PER_AXIS: usize = 8;

/// One 6³ cube per 8³ cell; the prediction cube is shifted by one voxel
/// along the first axis and carries an unrelated id.
fn shifted_cube_grid() -> InstancePair {
    let side = CELL * CELLS_PER_AXIS;
    let mut prediction = Array3::<u32>::zeros((side, side, side));
    let mut reference = Array3::<u32>::zeros((side, side, side));
    let total = (CELLS_PER_AXIS * CELLS_PER_AXIS * CELLS_PER_AXIS) as u32;

    let mut idx = 0u32;
    for cx in 0..CELLS_PER_AXIS {
        for cy in 0..CELLS_PER_AXIS {
            for cz in 0..CELLS_PER_AXIS {
                let (x, y, z) = (cx * CELL, cy * CELL, cz * CELL);
                reference
                    .slice_mut(s![x + 1..x + 7, y + 1..y + 7, z + 1..z + 7])
                    .fill(idx + 1);
                prediction
                    .slice_mut(s![x + 2..x + 8, y + 1..y + 7, z + 1..z + 7])
                    .fill(1000 + (total - 1 - idx));
                idx += 1;
            }
        }
    }

    InstancePair::unmatched(prediction.into_dyn(), reference.into_dyn()).unwrap()
}

#[test]
fn test_512_instances_in_volume() {
    let pair = shifted_cube_grid();
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();

    let (report, debug_data) = evaluator.evaluate(&pair, true).unwrap();
    let r = &report.ungrouped;

    assert_eq!(r.num_pred_instances, 512);
    assert_eq!(r.num_ref_instances, 512);
    assert_eq!(r.true_positives, 512, "Every shifted cube should match its reference");
    assert_eq!(r.false_positives, 0);
    assert_eq!(r.false_negatives, 0);

    // 5*6*6 shared voxels out of a 7*6*6 union
    let expected_iou = 180.0 / 252.0;
    assert!((r.sq - expected_iou).abs() < 1e-9, "SQ should be {expected_iou}, got {}", r.sq);
    assert!((r.pq - expected_iou).abs() < 1e-9);
    assert!(r.sq_std < 1e-9, "All pairs have the same IoU");

    let overlaps = debug_data.overlaps.unwrap();
    assert_eq!(overlaps.len(), 512, "Cubes never touch a neighbouring cell");

    for pair in &r.pairs {
        assert_eq!(pair.pred_id, 1000 + (512 - pair.ref_id), "Wrong correspondence");
    }
}

#[test]
fn test_greedy_and_optimal_agree_without_conflicts() {
    let pair = shifted_cube_grid();
    let optimal = Evaluator::new(EvaluatorConfig::default()).unwrap();
    let greedy = Evaluator::new(
        EvaluatorConfig::default().with_matching(MatchingStrategy::Greedy),
    )
    .unwrap();

    let (a, _) = optimal.evaluate(&pair, false).unwrap();
    let (b, _) = greedy.evaluate(&pair, false).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_threshold_sweep_on_volume() {
    let pair = shifted_cube_grid();
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();

    let sweep = evaluator
        .evaluate_at_thresholds(&pair, &[0.5, 0.7, 0.72, 0.9])
        .unwrap();
    let matched: Vec<usize> = sweep
        .iter()
        .map(|(_, report)| report.ungrouped.true_positives)
        .collect();
    assert_eq!(matched, vec![512, 512, 0, 0]);
}

#[test]
fn test_900_small_instances_half_missed() {
    let side = 120;
    let tile = 4;
    let per_axis = side / tile;
    let mut reference = Array2::<u32>::zeros((side, side));
    let mut prediction = Array2::<u32>::zeros((side, side));

    for i in 0..per_axis {
        for j in 0..per_axis {
            let id = (i * per_axis + j + 1) as u32;
            let (rows, cols) = (i * tile..(i + 1) * tile, j * tile..(j + 1) * tile);
            reference.slice_mut(s![rows.clone(), cols.clone()]).fill(id);
            if (i + j) % 2 == 0 {
                prediction.slice_mut(s![rows, cols]).fill(id);
            }
        }
    }

    let pair = InstancePair::unmatched(prediction.into_dyn(), reference.into_dyn()).unwrap();
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();
    let (report, _) = evaluator.evaluate(&pair, false).unwrap();
    let r = &report.ungrouped;

    assert_eq!(r.true_positives, 450);
    assert_eq!(r.false_positives, 0);
    assert_eq!(r.false_negatives, 450);
    assert_eq!(r.sq, 1.0);
    assert!((r.rq - 450.0 / 675.0).abs() < 1e-12);
    assert!((r.recall - 0.5).abs() < 1e-12);
}
