use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{s, Array3, ArrayD};
use panoptic_eval::evaluator::Evaluator;
use panoptic_eval::label_index::LabelIndex;
use panoptic_eval::matching::{Matcher, MatchingStrategy};
use panoptic_eval::metrics::{dice, iou, MetricRegistry};
use panoptic_eval::overlap::OverlapMatrix;
use panoptic_eval::{EvaluatorConfig, InstancePair};

/// Volume of `cells³` cubes; the prediction is shifted by one voxel.
fn cube_grid(cells: usize) -> (ArrayD<u32>, ArrayD<u32>) {
    let side = cells * 8;
    let mut prediction = Array3::<u32>::zeros((side, side, side));
    let mut reference = Array3::<u32>::zeros((side, side, side));

    let mut id = 1u32;
    for x in (0..side).step_by(8) {
        for y in (0..side).step_by(8) {
            for z in (0..side).step_by(8) {
                reference
                    .slice_mut(s![x + 1..x + 7, y + 1..y + 7, z + 1..z + 7])
                    .fill(id);
                prediction
                    .slice_mut(s![x + 2..x + 8, y + 1..y + 7, z + 1..z + 7])
                    .fill(id);
                id += 1;
            }
        }
    }

    (prediction.into_dyn(), reference.into_dyn())
}

fn bench_pair_metrics(c: &mut Criterion) {
    c.bench_function("dice_single", |b| {
        b.iter(|| dice(black_box(180), black_box(216), black_box(216)));
    });
    c.bench_function("iou_single", |b| {
        b.iter(|| iou(black_box(180), black_box(216), black_box(216)));
    });
}

fn bench_label_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_index");

    for cells in [2, 4, 8].iter() {
        let (prediction, _) = cube_grid(*cells);
        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| LabelIndex::build(black_box(prediction.view())));
        });
    }
    group.finish();
}

fn bench_overlap_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap_matrix");

    for cells in [2, 4, 8].iter() {
        let (prediction, reference) = cube_grid(*cells);
        let pred_index = LabelIndex::build(prediction.view());
        let ref_index = LabelIndex::build(reference.view());

        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| {
                OverlapMatrix::compute(
                    black_box(prediction.view()),
                    black_box(reference.view()),
                    &pred_index,
                    &ref_index,
                )
            });
        });
    }
    group.finish();
}

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    let registry = MetricRegistry::with_defaults();

    let (prediction, reference) = cube_grid(8);
    let pred_index = LabelIndex::build(prediction.view());
    let ref_index = LabelIndex::build(reference.view());
    let overlaps =
        OverlapMatrix::compute(prediction.view(), reference.view(), &pred_index, &ref_index)
            .unwrap();

    for strategy in [MatchingStrategy::Optimal, MatchingStrategy::Greedy] {
        let matcher = Matcher::new(&registry, "iou", 0.5, strategy).unwrap();
        group.bench_function(format!("{strategy:?}"), |b| {
            b.iter(|| matcher.match_instances(black_box(&overlaps)));
        });
    }
    group.finish();
}

fn bench_full_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();

    for cells in [2, 4, 8].iter() {
        let (prediction, reference) = cube_grid(*cells);
        let pair = InstancePair::unmatched(prediction, reference).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| evaluator.evaluate(black_box(&pair), false));
        });
    }
    group.finish();
}

fn bench_threshold_sweep(c: &mut Criterion) {
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();
    let (prediction, reference) = cube_grid(4);
    let pair = InstancePair::unmatched(prediction, reference).unwrap();
    let thresholds: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();

    c.bench_function("threshold_sweep_11", |b| {
        b.iter(|| evaluator.evaluate_at_thresholds(black_box(&pair), &thresholds));
    });
}

criterion_group!(
    benches,
    bench_pair_metrics,
    bench_label_index,
    bench_overlap_matrix,
    bench_matching,
    bench_full_evaluation,
    bench_threshold_sweep
);
criterion_main!(benches);
