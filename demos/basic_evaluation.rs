//! Basic evaluation example demonstrating core functionality.

use ndarray::{s, Array3};
use panoptic_eval::{
    load_from_string, metrics::compute_metric, Evaluator, InstancePair, UNGROUPED,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Panoptic Quality Evaluation Example ===\n");

    // Example 1: Pair metrics
    println!("1. Pair Metrics");
    let dsc = compute_metric("dsc", 180, 216, 216)?;
    let iou = compute_metric("iou", 180, 216, 216)?;
    println!("   Two 216-voxel instances sharing 180 voxels: DSC={:.4}, IoU={:.4}", dsc, iou);
    println!();

    // Example 2: Configuration
    println!("2. Loading a Configuration");
    let config = load_from_string(
        r#"{
            "metrics": ["dsc", "iou"],
            "decision_metric": "dsc",
            "decision_threshold": 0.5,
            "expected_input": "matched",
            "groups": [
                { "name": "vertebra", "labels": [1, 2, 3] },
                { "name": "ivd", "labels": [101, 102] }
            ]
        }"#,
    )?;
    println!("   Metrics: {:?}", config.metrics);
    println!("   Decision: {} >= {}", config.decision_metric, config.decision_threshold);
    println!("   Groups: {}", config.groups.len());
    println!();

    // Example 3: A small spine-like volume
    println!("3. Evaluating a Matched Volume");
    let mut reference = Array3::<u32>::zeros((24, 8, 8));
    let mut prediction = Array3::<u32>::zeros((24, 8, 8));
    for (k, label) in [1u32, 2, 3].iter().enumerate() {
        let z = k * 8;
        reference.slice_mut(s![z..z + 6, 1..7, 1..7]).fill(*label);
        prediction.slice_mut(s![z + 1..z + 6, 1..7, 1..7]).fill(*label);
        if k < 2 {
            reference.slice_mut(s![z + 6..z + 8, 2..6, 2..6]).fill(101 + k as u32);
        }
    }
    prediction.slice_mut(s![6..8, 2..6, 2..6]).fill(101);

    let pair = InstancePair::matched(prediction.into_dyn(), reference.into_dyn())?;
    let evaluator = Evaluator::new(config)?;
    let (report, debug_data) = evaluator.evaluate(&pair, true)?;

    println!("   {:<10} {:>4} {:>4} {:>4} {:>8} {:>8} {:>8}", "group", "TP", "FP", "FN", "SQ", "RQ", "PQ");
    let rows = std::iter::once((UNGROUPED, &report.ungrouped))
        .chain(report.groups.iter().map(|(name, r)| (name.as_str(), r)));
    for (name, r) in rows {
        println!(
            "   {:<10} {:>4} {:>4} {:>4} {:>8.4} {:>8.4} {:>8.4}",
            name, r.true_positives, r.false_positives, r.false_negatives, r.sq, r.rq, r.pq
        );
    }
    println!();

    // Example 4: Debug data
    println!("4. Stage Timings");
    for timing in &debug_data.timings {
        println!("   {:<20} {:?}", timing.stage, timing.duration);
    }
    println!();

    println!("5. Report as JSON");
    println!("{}", serde_json::to_string_pretty(&report.ungrouped.metrics)?);

    Ok(())
}
