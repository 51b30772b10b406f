//! Intersection over Union (IoU) of voxel sets.

use crate::error::Result;
use crate::metrics::check_pair_counts;

/// Calculate the Intersection over Union between two instances.
///
/// IoU is defined as the voxel count of the intersection divided by the voxel
/// count of the union, `|A ∩ B| / (|A| + |B| - |A ∩ B|)`.
///
/// # Arguments
///
/// * `intersection` - Number of voxels shared by both instances
/// * `size_a` - Voxel count of the first instance
/// * `size_b` - Voxel count of the second instance
///
/// # Returns
///
/// Returns a value between 0.0 (no overlap) and 1.0 (identical regions).
///
/// # Example
///
/// ```
/// use panoptic_eval::metrics::iou;
///
/// let value = iou(3, 3, 4).unwrap();
/// assert_eq!(value, 0.75);
/// ```
pub fn iou(intersection: u64, size_a: u64, size_b: u64) -> Result<f64> {
    check_pair_counts("iou", intersection, size_a, size_b)?;

    // Non-zero: the union is at least max(size_a, size_b) once counts are valid
    let union = size_a + size_b - intersection;

    #[allow(clippy::cast_precision_loss)]
    let value = intersection as f64 / union as f64;
    Ok(value)
}

/// IoU expressed through Dice, `IoU = DSC / (2 - DSC)`.
pub fn iou_from_dice(dsc: f64) -> f64 {
    if dsc >= 2.0 {
        return 1.0;
    }
    dsc / (2.0 - dsc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::dice;

    #[test]
    fn test_identical_instances() {
        let value = iou(10, 10, 10).unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_overlap() {
        assert_eq!(iou(0, 10, 20).unwrap(), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // Intersection: 25, union: 100 + 100 - 25 = 175
        let value = iou(25, 100, 100).unwrap();
        assert!((value - 0.142857).abs() < 1e-5);
    }

    #[test]
    fn test_relation_to_dice() {
        let d = dice(7, 12, 9).unwrap();
        let j = iou(7, 12, 9).unwrap();
        assert!((iou_from_dice(d) - j).abs() < 1e-12);
    }

    #[test]
    fn test_empty_pair_is_degenerate() {
        assert!(iou(0, 0, 0).is_err());
    }
}
