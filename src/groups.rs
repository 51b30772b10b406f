//! Named label groups used to stratify an evaluation.
//!
//! A group is a set of label values. When evaluating a group, both the
//! prediction and the reference are restricted to instances whose label is in
//! the set, and matching runs on that subset alone.

use crate::error::{PanopticEvalError, Result};
use crate::types::LabelId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Report key of the evaluation over all instances.
pub const UNGROUPED: &str = "ungrouped";

/// A named set of label values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelGroup {
    pub name: String,
    pub labels: BTreeSet<LabelId>,
}

impl LabelGroup {
    pub fn new<I>(name: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = LabelId>,
    {
        Self {
            name: name.to_string(),
            labels: labels.into_iter().collect(),
        }
    }

    /// Group over a contiguous range of labels.
    ///
    /// ```
    /// use panoptic_eval::groups::LabelGroup;
    ///
    /// let vertebrae = LabelGroup::from_range("vertebra", 1..=26);
    /// assert!(vertebrae.contains(26));
    /// assert!(!vertebrae.contains(27));
    /// ```
    pub fn from_range(name: &str, labels: RangeInclusive<LabelId>) -> Self {
        Self::new(name, labels)
    }

    pub fn contains(&self, label: LabelId) -> bool {
        self.labels.contains(&label)
    }
}

/// Ordered collection of disjoint label groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentationGroups {
    groups: Vec<LabelGroup>,
}

impl SegmentationGroups {
    /// Create a validated group collection.
    ///
    /// # Errors
    ///
    /// See [`SegmentationGroups::validate`].
    pub fn new(groups: Vec<LabelGroup>) -> Result<Self> {
        let groups = Self { groups };
        groups.validate()?;
        Ok(groups)
    }

    /// Check names and label sets.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a name is empty, duplicated or
    /// equal to [`UNGROUPED`], when a group has no labels or contains the
    /// background label 0, or when two groups share a label.
    pub fn validate(&self) -> Result<()> {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        let mut owner: BTreeMap<LabelId, &str> = BTreeMap::new();

        for group in &self.groups {
            let name = group.name.as_str();
            if name.trim().is_empty() {
                return Err(invalid("group name must not be empty".to_string()));
            }
            if name == UNGROUPED {
                return Err(invalid(format!("group name '{UNGROUPED}' is reserved")));
            }
            if !names.insert(name) {
                return Err(invalid(format!("duplicate group name '{name}'")));
            }
            if group.labels.is_empty() {
                return Err(invalid(format!("group '{name}' has no labels")));
            }
            if group.contains(0) {
                return Err(invalid(format!(
                    "group '{name}' contains the background label 0"
                )));
            }
            for &label in &group.labels {
                if let Some(previous) = owner.insert(label, name) {
                    return Err(invalid(format!(
                        "label {label} belongs to both '{previous}' and '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LabelGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// The group a label belongs to, if any.
    pub fn group_of(&self, label: LabelId) -> Option<&LabelGroup> {
        self.groups.iter().find(|group| group.contains(label))
    }
}

fn invalid(message: String) -> PanopticEvalError {
    PanopticEvalError::InvalidConfiguration(message)
}
