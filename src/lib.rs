//! # panoptic-eval
//!
//! A Rust library for evaluating instance segmentations of n-dimensional
//! labeled arrays with panoptic-quality metrics.
//!
//! Each positive label value in an array is one instance; 0 is background.
//! A prediction is compared against a reference:
//! - **DSC** and **IoU** per matched instance pair
//! - **SQ** (segmentation quality), the mean decision-metric value of matched pairs
//! - **RQ** (recognition quality), `TP / (TP + 0.5 FP + 0.5 FN)`
//! - **PQ** (panoptic quality), `SQ * RQ`
//!
//! ## Features
//!
//! - Matched inputs, where equal ids already denote the same object
//! - Unmatched inputs, matched one-to-one by a decision metric and threshold
//! - Optimal (Kuhn–Munkres) or greedy matching
//! - Evaluation stratified by named label groups
//! - JSON configuration and threshold sweeps
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::arr1;
//! use panoptic_eval::{evaluate, InstancePair};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let prediction = arr1(&[1, 1, 1, 0, 0, 2, 2, 0, 0]).into_dyn();
//! let reference = arr1(&[1, 1, 1, 1, 0, 0, 0, 2, 2]).into_dyn();
//! let pair = InstancePair::unmatched(prediction, reference)?;
//!
//! let (report, _debug) = evaluate(&pair, &["dsc", "iou"], "iou", 0.5, false)?;
//!
//! println!("PQ: {:.4}", report.ungrouped.pq);
//! println!("SQ: {:.4}", report.ungrouped.sq);
//! println!("RQ: {:.4}", report.ungrouped.rq);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! An [`Evaluator`] is built from an [`EvaluatorConfig`], which can be loaded
//! from JSON:
//!
//! ```json
//! {
//!   "metrics": ["dsc", "iou"],
//!   "decision_metric": "dsc",
//!   "decision_threshold": 0.5,
//!   "matching": "optimal",
//!   "groups": [
//!     { "name": "vertebra", "labels": [1, 2, 3, 4, 5] },
//!     { "name": "ivd", "labels": [101, 102, 103, 104] }
//!   ]
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod groups;
pub mod label_index;
pub mod matching;
pub mod metrics;
pub mod overlap;
pub mod stats;
pub mod threshold;
pub mod types;

// Re-export commonly used types and functions
pub use aggregate::Aggregator;
pub use config::{load_from_file, load_from_string, load_profile, EvaluatorConfig};
pub use error::{PanopticEvalError, Result};
pub use evaluator::{evaluate, DebugData, Evaluator, StageTiming};
pub use groups::{LabelGroup, SegmentationGroups, UNGROUPED};
pub use label_index::{InstanceInfo, LabelIndex};
pub use matching::{MatchResult, MatchedPair, Matcher, MatchingStrategy};
pub use metrics::{MetricRegistry, DSC, IOU};
pub use overlap::{OverlapEntry, OverlapMatrix};
pub use threshold::generate_threshold_range;
pub use types::{
    BoundingBox, EvaluationReport, InputKind, InstancePair, LabelId, LabelPair, LabeledArray,
    MetricReport, MetricSummary, PairMetrics,
};
