//! Dice similarity coefficient (DSC).

use crate::error::Result;
use crate::metrics::check_pair_counts;

/// Dice similarity coefficient of two instances.
///
/// DSC = 2 × |A ∩ B| / (|A| + |B|)
///
/// # Errors
///
/// Returns `DegenerateInput` when both instances are empty or the
/// intersection is larger than either instance.
///
/// # Example
///
/// ```
/// use panoptic_eval::metrics::dice;
///
/// assert_eq!(dice(3, 3, 3).unwrap(), 1.0);
/// assert_eq!(dice(0, 2, 2).unwrap(), 0.0);
/// ```
pub fn dice(intersection: u64, size_a: u64, size_b: u64) -> Result<f64> {
    check_pair_counts("dsc", intersection, size_a, size_b)?;

    #[allow(clippy::cast_precision_loss)]
    let value = 2.0 * intersection as f64 / (size_a + size_b) as f64;

    debug_assert!(
        (0.0..=1.0).contains(&value),
        "DSC must be between 0 and 1, got {value}"
    );
    Ok(value)
}
