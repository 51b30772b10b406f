//! Decision threshold utilities.

use crate::error::{PanopticEvalError, Result};

/// Check that a decision threshold lies in `[0.0, 1.0]`.
///
/// # Errors
///
/// Returns `InvalidConfiguration` for values outside the range and for NaN.
///
/// # Example
///
/// ```
/// use panoptic_eval::threshold::validate_threshold;
///
/// assert!(validate_threshold(0.5).is_ok());
/// assert!(validate_threshold(1.5).is_err());
/// assert!(validate_threshold(f64::NAN).is_err());
/// ```
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PanopticEvalError::InvalidConfiguration(format!(
            "decision threshold must be between 0.0 and 1.0, got {threshold}"
        )));
    }
    Ok(())
}

/// Generate a range of threshold values for a sweep.
///
/// # Arguments
///
/// * `start` - Starting threshold value (inclusive)
/// * `end` - Ending threshold value (inclusive)
/// * `steps` - Number of threshold values to generate
///
/// # Returns
///
/// Returns a vector of evenly-spaced threshold values.
///
/// # Example
///
/// ```
/// use panoptic_eval::threshold::generate_threshold_range;
///
/// let thresholds = generate_threshold_range(0.5, 0.95, 10).unwrap();
/// assert_eq!(thresholds.len(), 10);
/// assert_eq!(thresholds[0], 0.5);
/// assert_eq!(thresholds[9], 0.95);
/// ```
pub fn generate_threshold_range(start: f64, end: f64, steps: usize) -> Result<Vec<f64>> {
    validate_threshold(start)?;
    validate_threshold(end)?;

    if start > end {
        return Err(PanopticEvalError::InvalidConfiguration(format!(
            "start threshold ({start}) must not exceed end threshold ({end})"
        )));
    }

    match steps {
        0 => Err(PanopticEvalError::InvalidConfiguration(
            "number of threshold steps must be at least 1".to_string(),
        )),
        1 => Ok(vec![start]),
        _ => {
            let step = (end - start) / (steps - 1) as f64;
            Ok((0..steps)
                .map(|i| {
                    if i == steps - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect())
        }
    }
}
