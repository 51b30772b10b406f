//! One-to-one matching of prediction instances to reference instances.
//!
//! Candidates are overlapping pairs whose decision metric reaches the
//! decision threshold. Two strategies resolve them into a matching:
//!
//! - [`MatchingStrategy::Optimal`] maximizes the number of matched pairs and,
//!   among matchings of that size, the summed decision metric. The candidate
//!   graph is split into connected components and each component is solved
//!   with the Kuhn-Munkres algorithm. Scores are compared at a resolution of
//!   1e-6.
//! - [`MatchingStrategy::Greedy`] accepts candidates by descending score,
//!   then ascending prediction id, then ascending reference id.
//!
//! Both are deterministic and independent of the order of overlap entries.

use crate::error::{PanopticEvalError, Result};
use crate::metrics::{InstanceCounts, MetricRegistry, NamedMetric};
use crate::overlap::OverlapMatrix;
use crate::threshold::validate_threshold;
use crate::types::{InstancePair, LabelId};
use log::{debug, trace};
use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Integer resolution of decision-metric values inside the assignment solver.
const SCORE_SCALE: i64 = 1_000_000;

/// How candidate pairs are resolved into a one-to-one matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Maximum-cardinality matching with maximum total score.
    #[default]
    Optimal,
    /// Highest score first.
    Greedy,
}

/// A prediction instance paired with a reference instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub pred_id: LabelId,
    pub ref_id: LabelId,
    pub intersection: u64,
    pub pred_size: u64,
    pub ref_size: u64,
}

/// Outcome of matching: the correspondences plus the leftovers of each side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched pairs ordered by prediction id
    pub matched: Vec<MatchedPair>,
    /// Prediction ids without a match (false positives), ascending
    pub unmatched_predictions: Vec<LabelId>,
    /// Reference ids without a match (false negatives), ascending
    pub unmatched_references: Vec<LabelId>,
}

impl MatchResult {
    /// Build a result from accepted `(pred_id, ref_id)` pairs.
    ///
    /// Every id of `overlaps` that is not part of a pair ends up unmatched.
    fn from_pairs(overlaps: &OverlapMatrix, mut pairs: Vec<(LabelId, LabelId)>) -> Self {
        pairs.sort_unstable();

        let matched_preds: BTreeSet<LabelId> = pairs.iter().map(|&(p, _)| p).collect();
        let matched_refs: BTreeSet<LabelId> = pairs.iter().map(|&(_, r)| r).collect();
        debug_assert_eq!(matched_preds.len(), pairs.len(), "prediction matched twice");
        debug_assert_eq!(matched_refs.len(), pairs.len(), "reference matched twice");

        let matched = pairs
            .into_iter()
            .map(|(pred_id, ref_id)| MatchedPair {
                pred_id,
                ref_id,
                intersection: overlaps.intersection(pred_id, ref_id),
                pred_size: overlaps.prediction_size(pred_id).unwrap_or(0),
                ref_size: overlaps.reference_size(ref_id).unwrap_or(0),
            })
            .collect();

        Self {
            matched,
            unmatched_predictions: overlaps
                .prediction_ids()
                .into_iter()
                .filter(|id| !matched_preds.contains(id))
                .collect(),
            unmatched_references: overlaps
                .reference_ids()
                .into_iter()
                .filter(|id| !matched_refs.contains(id))
                .collect(),
        }
    }

    /// Echo an upstream correspondence: ids present on both sides are pairs.
    ///
    /// A shared id is matched even when the two instances do not overlap.
    pub fn from_shared_ids(overlaps: &OverlapMatrix) -> Self {
        let ref_ids: BTreeSet<LabelId> = overlaps.reference_ids().into_iter().collect();
        let pairs = overlaps
            .prediction_ids()
            .into_iter()
            .filter(|id| ref_ids.contains(id))
            .map(|id| (id, id))
            .collect();
        Self::from_pairs(overlaps, pairs)
    }

    pub fn counts(&self) -> InstanceCounts {
        InstanceCounts::new(
            self.matched.len(),
            self.unmatched_predictions.len(),
            self.unmatched_references.len(),
        )
    }

    /// The reference id matched to a prediction id, if any.
    pub fn reference_for(&self, pred_id: LabelId) -> Option<LabelId> {
        self.matched
            .binary_search_by_key(&pred_id, |pair| pair.pred_id)
            .ok()
            .map(|i| self.matched[i].ref_id)
    }
}

/// An overlapping pair that passed the decision threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    pred_id: LabelId,
    ref_id: LabelId,
    score: f64,
}

/// Threshold-based instance matcher.
///
/// Configuration is validated on construction, before any array is scanned.
#[derive(Debug, Clone)]
pub struct Matcher {
    decision_metric: NamedMetric,
    decision_threshold: f64,
    strategy: MatchingStrategy,
}

impl Matcher {
    /// Create a matcher.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the threshold is outside `[0, 1]` or
    /// the decision metric is not registered.
    ///
    /// # Example
    ///
    /// ```
    /// use panoptic_eval::matching::{Matcher, MatchingStrategy};
    /// use panoptic_eval::metrics::MetricRegistry;
    ///
    /// let registry = MetricRegistry::with_defaults();
    /// assert!(Matcher::new(&registry, "iou", 0.5, MatchingStrategy::Optimal).is_ok());
    /// assert!(Matcher::new(&registry, "iou", 1.5, MatchingStrategy::Optimal).is_err());
    /// assert!(Matcher::new(&registry, "nsd", 0.5, MatchingStrategy::Greedy).is_err());
    /// ```
    pub fn new(
        registry: &MetricRegistry,
        decision_metric: &str,
        decision_threshold: f64,
        strategy: MatchingStrategy,
    ) -> Result<Self> {
        validate_threshold(decision_threshold)?;
        let decision_metric = registry.resolve(decision_metric).map_err(|_| {
            PanopticEvalError::InvalidConfiguration(format!(
                "decision metric '{decision_metric}' is not registered"
            ))
        })?;

        Ok(Self {
            decision_metric,
            decision_threshold,
            strategy,
        })
    }

    /// Same metric and strategy with another threshold.
    pub fn with_threshold(&self, decision_threshold: f64) -> Result<Self> {
        validate_threshold(decision_threshold)?;
        Ok(Self {
            decision_threshold,
            ..self.clone()
        })
    }

    pub fn decision_metric(&self) -> &NamedMetric {
        &self.decision_metric
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    pub fn strategy(&self) -> MatchingStrategy {
        self.strategy
    }

    /// Match the instances of an overlap matrix.
    pub fn match_instances(&self, overlaps: &OverlapMatrix) -> Result<MatchResult> {
        let candidates = self.candidates(overlaps)?;

        let pairs = match self.strategy {
            MatchingStrategy::Optimal => optimal_assignment(&candidates),
            MatchingStrategy::Greedy => greedy_assignment(&candidates),
        };

        debug!(
            "Matched {} of {} candidate pairs ({:?}, {} >= {})",
            pairs.len(),
            candidates.len(),
            self.strategy,
            self.decision_metric.name(),
            self.decision_threshold
        );

        Ok(MatchResult::from_pairs(overlaps, pairs))
    }

    fn candidates(&self, overlaps: &OverlapMatrix) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        for entry in overlaps.entries() {
            let pred_size = overlaps.prediction_size(entry.pred_id).unwrap_or(0);
            let ref_size = overlaps.reference_size(entry.ref_id).unwrap_or(0);
            let score = self
                .decision_metric
                .compute(entry.intersection, pred_size, ref_size)?;
            if score >= self.decision_threshold {
                candidates.push(Candidate {
                    pred_id: entry.pred_id,
                    ref_id: entry.ref_id,
                    score,
                });
            }
        }
        Ok(candidates)
    }
}

impl InstancePair {
    /// Produce the matching for this pair.
    ///
    /// A `Matched` pair echoes its shared ids; an `Unmatched` pair runs the
    /// matcher.
    pub fn resolve_matches(&self, overlaps: &OverlapMatrix, matcher: &Matcher) -> Result<MatchResult> {
        match self {
            InstancePair::Matched(_) => Ok(MatchResult::from_shared_ids(overlaps)),
            InstancePair::Unmatched(_) => matcher.match_instances(overlaps),
        }
    }
}

fn greedy_assignment(candidates: &[Candidate]) -> Vec<(LabelId, LabelId)> {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.pred_id.cmp(&b.pred_id))
            .then(a.ref_id.cmp(&b.ref_id))
    });

    let mut used_preds: BTreeSet<LabelId> = BTreeSet::new();
    let mut used_refs: BTreeSet<LabelId> = BTreeSet::new();
    let mut pairs = Vec::new();

    for candidate in ordered {
        if used_preds.contains(&candidate.pred_id) || used_refs.contains(&candidate.ref_id) {
            continue;
        }
        used_preds.insert(candidate.pred_id);
        used_refs.insert(candidate.ref_id);
        pairs.push((candidate.pred_id, candidate.ref_id));
    }

    pairs
}

/// Connected component of the candidate graph.
struct Component {
    preds: Vec<LabelId>,
    refs: Vec<LabelId>,
    candidates: Vec<Candidate>,
}

fn connected_components(candidates: &[Candidate]) -> Vec<Component> {
    let mut by_pred: BTreeMap<LabelId, Vec<usize>> = BTreeMap::new();
    let mut by_ref: BTreeMap<LabelId, Vec<usize>> = BTreeMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        by_pred.entry(candidate.pred_id).or_default().push(i);
        by_ref.entry(candidate.ref_id).or_default().push(i);
    }

    let mut seen_preds: BTreeSet<LabelId> = BTreeSet::new();
    let mut seen_refs: BTreeSet<LabelId> = BTreeSet::new();
    let mut components = Vec::new();

    for &start in by_pred.keys() {
        if seen_preds.contains(&start) {
            continue;
        }
        seen_preds.insert(start);

        let mut preds = BTreeSet::new();
        let mut refs = BTreeSet::new();
        let mut members = BTreeSet::new();
        // (is_prediction, id)
        let mut queue = VecDeque::from([(true, start)]);

        while let Some((is_pred, id)) = queue.pop_front() {
            let edges = if is_pred { &by_pred[&id] } else { &by_ref[&id] };
            if is_pred {
                preds.insert(id);
            } else {
                refs.insert(id);
            }
            for &i in edges {
                members.insert(i);
                let candidate = &candidates[i];
                if is_pred {
                    if seen_refs.insert(candidate.ref_id) {
                        queue.push_back((false, candidate.ref_id));
                    }
                } else if seen_preds.insert(candidate.pred_id) {
                    queue.push_back((true, candidate.pred_id));
                }
            }
        }

        components.push(Component {
            preds: preds.into_iter().collect(),
            refs: refs.into_iter().collect(),
            candidates: members.into_iter().map(|i| candidates[i]).collect(),
        });
    }

    components
}

fn optimal_assignment(candidates: &[Candidate]) -> Vec<(LabelId, LabelId)> {
    let components = connected_components(candidates);
    trace!("Candidate graph has {} connected components", components.len());

    let mut pairs = Vec::new();
    for component in components {
        if let [single] = component.candidates.as_slice() {
            pairs.push((single.pred_id, single.ref_id));
            continue;
        }
        pairs.extend(solve_component(&component));
    }
    pairs
}

/// Exact maximum-weight assignment of one component.
///
/// Candidate weights are `base + round(score * SCORE_SCALE)` with
/// `base = (min(rows, cols) + 1) * SCORE_SCALE`; any matching with one more
/// pair outweighs every smaller matching, so cardinality wins first.
fn solve_component(component: &Component) -> Vec<(LabelId, LabelId)> {
    // kuhn_munkres needs rows <= columns
    let transpose = component.preds.len() > component.refs.len();
    let (rows, cols) = if transpose {
        (&component.refs, &component.preds)
    } else {
        (&component.preds, &component.refs)
    };

    let row_pos: BTreeMap<LabelId, usize> = rows.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let col_pos: BTreeMap<LabelId, usize> = cols.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let base = (rows.len() as i64 + 1) * SCORE_SCALE;
    let mut weights = Matrix::new(rows.len(), cols.len(), 0i64);
    for candidate in &component.candidates {
        let (row_id, col_id) = if transpose {
            (candidate.ref_id, candidate.pred_id)
        } else {
            (candidate.pred_id, candidate.ref_id)
        };
        let score = (candidate.score.clamp(0.0, 1.0) * SCORE_SCALE as f64).round() as i64;
        weights[(row_pos[&row_id], col_pos[&col_id])] = base + score;
    }

    let (_, assignment) = kuhn_munkres(&weights);

    assignment
        .into_iter()
        .enumerate()
        .filter(|&(row, col)| weights[(row, col)] > 0)
        .map(|(row, col)| {
            if transpose {
                (cols[col], rows[row])
            } else {
                (rows[row], cols[col])
            }
        })
        .collect()
}
