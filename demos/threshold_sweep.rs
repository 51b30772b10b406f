//! Example sweeping the decision threshold over one prediction.

use ndarray::{s, Array2};
use panoptic_eval::{
    generate_threshold_range, EvaluatorConfig, Evaluator, InstancePair, MatchingStrategy,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Decision Threshold Sweep Example ===\n");

    // Reference: a row of 10x10 squares; prediction: the same squares,
    // each shifted by an increasing offset.
    let mut reference = Array2::<u32>::zeros((16, 140));
    let mut prediction = Array2::<u32>::zeros((16, 140));
    for k in 0..10usize {
        let x = k * 14;
        let label = k as u32 + 1;
        reference.slice_mut(s![2..12, x..x + 10]).fill(label);
        prediction.slice_mut(s![2 + k.min(4)..12 + k.min(4), x..x + 10]).fill(label);
    }
    let pair = InstancePair::unmatched(prediction.into_dyn(), reference.into_dyn())?;

    let thresholds = generate_threshold_range(0.0, 1.0, 11)?;
    println!("1. Generated {} thresholds", thresholds.len());
    println!("   {:?}", thresholds);
    println!();

    for strategy in [MatchingStrategy::Optimal, MatchingStrategy::Greedy] {
        println!("2. Sweep with {:?} matching", strategy);
        let evaluator = Evaluator::new(
            EvaluatorConfig::new(&["dsc", "iou"], "iou", 0.5).with_matching(strategy),
        )?;
        let sweep = evaluator.evaluate_at_thresholds(&pair, &thresholds)?;

        println!("   Threshold |  TP |     SQ |     RQ |     PQ");
        println!("   ----------|-----|--------|--------|-------");
        let mut best = (0.0, f64::MIN);
        for (threshold, report) in &sweep {
            let r = &report.ungrouped;
            println!(
                "   {:>9.2} | {:>3} | {:>6.4} | {:>6.4} | {:>6.4}",
                threshold, r.true_positives, r.sq, r.rq, r.pq
            );
            if r.pq > best.1 {
                best = (*threshold, r.pq);
            }
        }
        println!("   Best PQ {:.4} at threshold {:.2}", best.1, best.0);
        println!();
    }

    Ok(())
}
