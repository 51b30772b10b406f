//! Per-instance index of a labeled array: voxel counts and bounding boxes.

use crate::types::{BoundingBox, LabelId};
use ndarray::{ArrayViewD, Dimension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size and extent of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub id: LabelId,
    pub voxel_count: u64,
    pub bbox: BoundingBox,
}

/// Distinct non-background ids of a labeled array, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelIndex {
    shape: Vec<usize>,
    instances: BTreeMap<LabelId, InstanceInfo>,
}

impl LabelIndex {
    /// Index every positive label of `labels` in a single pass.
    ///
    /// An all-background array produces an empty index.
    ///
    /// # Example
    ///
    /// ```
    /// use ndarray::{ArrayD, IxDyn};
    /// use panoptic_eval::label_index::LabelIndex;
    ///
    /// let labels = ArrayD::from_shape_vec(IxDyn(&[6]), vec![0, 1, 1, 0, 2, 0]).unwrap();
    /// let index = LabelIndex::build(labels.view());
    /// assert_eq!(index.ids(), vec![1, 2]);
    /// assert_eq!(index.voxel_count(1), Some(2));
    /// ```
    pub fn build(labels: ArrayViewD<'_, LabelId>) -> Self {
        let mut instances: BTreeMap<LabelId, InstanceInfo> = BTreeMap::new();

        for (idx, &label) in labels.indexed_iter() {
            if label == 0 {
                continue;
            }
            let coord = idx.slice();
            instances
                .entry(label)
                .and_modify(|info| {
                    info.voxel_count += 1;
                    info.bbox.extend(coord);
                })
                .or_insert_with(|| InstanceInfo {
                    id: label,
                    voxel_count: 1,
                    bbox: BoundingBox::from_point(coord),
                });
        }

        Self {
            shape: labels.shape().to_vec(),
            instances,
        }
    }

    /// Shape of the indexed array.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Instance ids in ascending order.
    pub fn ids(&self) -> Vec<LabelId> {
        self.instances.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, id: LabelId) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn get(&self, id: LabelId) -> Option<&InstanceInfo> {
        self.instances.get(&id)
    }

    pub fn voxel_count(&self, id: LabelId) -> Option<u64> {
        self.instances.get(&id).map(|info| info.voxel_count)
    }

    /// Iterate instances in ascending id order.
    pub fn instances(&self) -> impl Iterator<Item = &InstanceInfo> {
        self.instances.values()
    }

    /// Total number of foreground voxels.
    pub fn foreground_voxels(&self) -> u64 {
        self.instances.values().map(|info| info.voxel_count).sum()
    }

    /// Map of id to voxel count.
    pub fn sizes(&self) -> BTreeMap<LabelId, u64> {
        self.instances
            .iter()
            .map(|(&id, info)| (id, info.voxel_count))
            .collect()
    }
}
