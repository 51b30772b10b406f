//! Sparse overlap matrix between prediction and reference instances.
//!
//! Only pairs that share at least one voxel are stored. Each candidate pair
//! is first checked through its bounding boxes; the voxel scan is limited to
//! the intersection of the two boxes.

use crate::error::{PanopticEvalError, Result};
use crate::label_index::{InstanceInfo, LabelIndex};
use crate::types::{BoundingBox, LabelId};
use log::debug;
use ndarray::{ArrayViewD, AxisDescription, Slice, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Intersection size of one prediction/reference instance pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverlapEntry {
    pub pred_id: LabelId,
    pub ref_id: LabelId,
    pub intersection: u64,
}

/// Sparse prediction × reference intersection table.
///
/// Entries are sorted by `(pred_id, ref_id)`. Instance sizes of both sides
/// are kept as well, so instances that overlap nothing are still known.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlapMatrix {
    entries: Vec<OverlapEntry>,
    pred_sizes: BTreeMap<LabelId, u64>,
    ref_sizes: BTreeMap<LabelId, u64>,
    #[serde(skip)]
    by_ref: BTreeMap<LabelId, Vec<usize>>,
}

impl OverlapMatrix {
    /// Compute all nonzero intersections between two labeled arrays.
    ///
    /// The scan is split across prediction instances with rayon; entries are
    /// sorted afterwards so the result does not depend on scheduling.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the arrays (or the indexes built from them)
    /// differ in shape.
    pub fn compute(
        prediction: ArrayViewD<'_, LabelId>,
        reference: ArrayViewD<'_, LabelId>,
        pred_index: &LabelIndex,
        ref_index: &LabelIndex,
    ) -> Result<Self> {
        if prediction.shape() != reference.shape()
            || pred_index.shape() != prediction.shape()
            || ref_index.shape() != reference.shape()
        {
            return Err(PanopticEvalError::ShapeMismatch {
                prediction: prediction.shape().to_vec(),
                reference: reference.shape().to_vec(),
            });
        }

        let pred_instances: Vec<&InstanceInfo> = pred_index.instances().collect();
        let ref_instances: Vec<&InstanceInfo> = ref_index.instances().collect();

        let mut entries: Vec<OverlapEntry> = pred_instances
            .par_iter()
            .flat_map_iter(|pred| {
                let prediction = &prediction;
                let reference = &reference;
                ref_instances.iter().filter_map(move |reference_instance| {
                    let window = pred.bbox.intersection(&reference_instance.bbox)?;
                    let intersection =
                        count_in_window(prediction, reference, &window, pred.id, reference_instance.id);
                    (intersection > 0).then_some(OverlapEntry {
                        pred_id: pred.id,
                        ref_id: reference_instance.id,
                        intersection,
                    })
                })
            })
            .collect();
        entries.sort_unstable();

        debug!(
            "Overlap matrix: {} prediction x {} reference instances, {} overlapping pairs",
            pred_instances.len(),
            ref_instances.len(),
            entries.len()
        );

        Ok(Self::from_sorted(entries, pred_index.sizes(), ref_index.sizes()))
    }

    /// Build a matrix from explicit entries and instance sizes.
    ///
    /// Entries may come in any order; zero-intersection entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if an entry names an id without a size, an
    /// intersection exceeds either instance size, or a pair appears twice.
    ///
    /// # Example
    ///
    /// ```
    /// use panoptic_eval::overlap::{OverlapEntry, OverlapMatrix};
    /// use std::collections::BTreeMap;
    ///
    /// let pred_sizes = BTreeMap::from([(1, 3), (2, 2)]);
    /// let ref_sizes = BTreeMap::from([(1, 4)]);
    /// let entries = vec![OverlapEntry { pred_id: 1, ref_id: 1, intersection: 3 }];
    ///
    /// let matrix = OverlapMatrix::from_entries(entries, pred_sizes, ref_sizes).unwrap();
    /// assert_eq!(matrix.intersection(1, 1), 3);
    /// assert_eq!(matrix.intersection(2, 1), 0);
    /// ```
    pub fn from_entries(
        entries: Vec<OverlapEntry>,
        pred_sizes: BTreeMap<LabelId, u64>,
        ref_sizes: BTreeMap<LabelId, u64>,
    ) -> Result<Self> {
        let mut entries: Vec<OverlapEntry> =
            entries.into_iter().filter(|e| e.intersection > 0).collect();
        entries.sort_unstable();

        for window in entries.windows(2) {
            if window[0].pred_id == window[1].pred_id && window[0].ref_id == window[1].ref_id {
                return Err(PanopticEvalError::DegenerateInput(format!(
                    "duplicate overlap entry for prediction {} and reference {}",
                    window[0].pred_id, window[0].ref_id
                )));
            }
        }

        for entry in &entries {
            let pred_size = pred_sizes.get(&entry.pred_id).copied().ok_or_else(|| {
                PanopticEvalError::DegenerateInput(format!(
                    "overlap entry references unknown prediction id {}",
                    entry.pred_id
                ))
            })?;
            let ref_size = ref_sizes.get(&entry.ref_id).copied().ok_or_else(|| {
                PanopticEvalError::DegenerateInput(format!(
                    "overlap entry references unknown reference id {}",
                    entry.ref_id
                ))
            })?;
            if entry.intersection > pred_size.min(ref_size) {
                return Err(PanopticEvalError::DegenerateInput(format!(
                    "intersection {} of prediction {} and reference {} exceeds instance sizes",
                    entry.intersection, entry.pred_id, entry.ref_id
                )));
            }
        }

        Ok(Self::from_sorted(entries, pred_sizes, ref_sizes))
    }

    fn from_sorted(
        entries: Vec<OverlapEntry>,
        pred_sizes: BTreeMap<LabelId, u64>,
        ref_sizes: BTreeMap<LabelId, u64>,
    ) -> Self {
        let mut by_ref: BTreeMap<LabelId, Vec<usize>> = BTreeMap::new();
        for (position, entry) in entries.iter().enumerate() {
            by_ref.entry(entry.ref_id).or_default().push(position);
        }
        Self {
            entries,
            pred_sizes,
            ref_sizes,
            by_ref,
        }
    }

    /// All entries, sorted by `(pred_id, ref_id)`.
    pub fn entries(&self) -> &[OverlapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prediction ids in ascending order, including ids without overlap.
    pub fn prediction_ids(&self) -> Vec<LabelId> {
        self.pred_sizes.keys().copied().collect()
    }

    /// Reference ids in ascending order, including ids without overlap.
    pub fn reference_ids(&self) -> Vec<LabelId> {
        self.ref_sizes.keys().copied().collect()
    }

    pub fn prediction_size(&self, pred_id: LabelId) -> Option<u64> {
        self.pred_sizes.get(&pred_id).copied()
    }

    pub fn reference_size(&self, ref_id: LabelId) -> Option<u64> {
        self.ref_sizes.get(&ref_id).copied()
    }

    pub fn num_predictions(&self) -> usize {
        self.pred_sizes.len()
    }

    pub fn num_references(&self) -> usize {
        self.ref_sizes.len()
    }

    /// Entries of one prediction instance, ordered by reference id.
    pub fn entries_for_prediction(&self, pred_id: LabelId) -> &[OverlapEntry] {
        let start = self.entries.partition_point(|e| e.pred_id < pred_id);
        let end = self.entries.partition_point(|e| e.pred_id <= pred_id);
        &self.entries[start..end]
    }

    /// Entries of one reference instance, ordered by prediction id.
    pub fn entries_for_reference(&self, ref_id: LabelId) -> Vec<&OverlapEntry> {
        self.by_ref
            .get(&ref_id)
            .map(|positions| positions.iter().map(|&p| &self.entries[p]).collect())
            .unwrap_or_default()
    }

    /// Intersection size of a pair, 0 when the pair does not overlap.
    pub fn intersection(&self, pred_id: LabelId, ref_id: LabelId) -> u64 {
        self.entries_for_prediction(pred_id)
            .binary_search_by_key(&ref_id, |e| e.ref_id)
            .map(|i| self.entries_for_prediction(pred_id)[i].intersection)
            .unwrap_or(0)
    }

    /// Sum of all stored intersections.
    pub fn total_intersection(&self) -> u64 {
        self.entries.iter().map(|e| e.intersection).sum()
    }

    /// Total voxel count over all prediction instances.
    pub fn total_prediction_voxels(&self) -> u64 {
        self.pred_sizes.values().sum()
    }

    /// Total voxel count over all reference instances.
    pub fn total_reference_voxels(&self) -> u64 {
        self.ref_sizes.values().sum()
    }

    /// Sub-matrix keeping only the selected prediction and reference ids.
    pub fn restrict<P, R>(&self, keep_prediction: P, keep_reference: R) -> Self
    where
        P: Fn(LabelId) -> bool,
        R: Fn(LabelId) -> bool,
    {
        let pred_sizes: BTreeMap<LabelId, u64> = self
            .pred_sizes
            .iter()
            .filter(|(&id, _)| keep_prediction(id))
            .map(|(&id, &size)| (id, size))
            .collect();
        let ref_sizes: BTreeMap<LabelId, u64> = self
            .ref_sizes
            .iter()
            .filter(|(&id, _)| keep_reference(id))
            .map(|(&id, &size)| (id, size))
            .collect();
        let entries = self
            .entries
            .iter()
            .filter(|e| pred_sizes.contains_key(&e.pred_id) && ref_sizes.contains_key(&e.ref_id))
            .copied()
            .collect();

        Self::from_sorted(entries, pred_sizes, ref_sizes)
    }
}

/// Count voxels inside `window` where the prediction equals `pred_id` and the
/// reference equals `ref_id`.
fn count_in_window(
    prediction: &ArrayViewD<'_, LabelId>,
    reference: &ArrayViewD<'_, LabelId>,
    window: &BoundingBox,
    pred_id: LabelId,
    ref_id: LabelId,
) -> u64 {
    let to_slice = |desc: AxisDescription| {
        let axis = desc.axis.index();
        Slice::from(window.min[axis]..window.max[axis] + 1)
    };
    let pred_window = prediction.slice_each_axis(to_slice);
    let ref_window = reference.slice_each_axis(to_slice);

    Zip::from(&pred_window)
        .and(&ref_window)
        .fold(0u64, |count, &p, &r| {
            if p == pred_id && r == ref_id {
                count + 1
            } else {
                count
            }
        })
}
