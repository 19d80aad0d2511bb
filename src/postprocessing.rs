// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Post-processing for keypoint classifier outputs.
//!
//! Turns raw class scores into a probability distribution and picks the
//! winning [`GestureClass`], abstaining when the scores carry no usable
//! information or the configured confidence floor is not met.

use ndarray::Array1;

use crate::results::{GestureClass, Probs};

/// Numerically stable softmax, in place.
///
/// Leaves the values untouched if the exponent sum is not a positive finite
/// number.
pub fn softmax_inplace(values: &mut Array1<f32>) {
    if values.is_empty() {
        return;
    }
    let max_val = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max_val.is_finite() {
        return;
    }
    let exp_vals = values.mapv(|v| (v - max_val).exp());
    let exp_sum = exp_vals.sum();
    if exp_sum > 0.0 && exp_sum.is_finite() {
        *values = exp_vals / exp_sum;
    }
}

/// Convert raw model output into class probabilities.
///
/// NaN scores count as zero and infinities are clamped to the finite range.
/// If the scores already form a distribution (non-negative, summing to 1
/// within 0.1) they are kept, otherwise softmax is applied.
///
/// # Returns
///
/// * `None` if the output is empty or holds no finite value at all, which the
///   classifier treats as an abstention.
#[must_use]
pub fn scores_to_probs(output: &[f32]) -> Option<Probs> {
    if !output.iter().any(|v| v.is_finite()) {
        return None;
    }

    let mut probs = Array1::from_iter(output.iter().map(|&v| {
        if v.is_nan() {
            0.0
        } else {
            v.clamp(f32::MIN, f32::MAX)
        }
    }));

    let sum: f32 = probs.sum();
    let is_distribution = (sum - 1.0).abs() <= 0.1 && probs.iter().all(|&v| v >= 0.0);
    if !is_distribution {
        softmax_inplace(&mut probs);
    }

    Some(Probs::new(probs))
}

/// Pick the winning class.
///
/// # Arguments
///
/// * `probs` - Class probabilities, `None` when the model produced nothing usable.
/// * `min_confidence` - Optional floor on the top-1 probability.
#[must_use]
pub fn decide_class(probs: Option<&Probs>, min_confidence: Option<f32>) -> GestureClass {
    let Some(probs) = probs else {
        return GestureClass::ABSTAIN;
    };
    if probs.is_empty() {
        return GestureClass::ABSTAIN;
    }
    let top1 = probs.top1();
    match min_confidence {
        Some(floor) if probs.top1conf() < floor => GestureClass::ABSTAIN,
        _ => GestureClass::from_index(top1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let mut v = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        softmax_inplace(&mut v);
        assert!((v.sum() - 1.0).abs() < 1e-6);
        assert!(v[2] > v[1] && v[1] > v[0]);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let mut v = Array1::from_vec(vec![1000.0, 999.0]);
        softmax_inplace(&mut v);
        assert!(v.iter().all(|p| p.is_finite()));
        assert!((v.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_existing_distribution_kept() {
        let probs = scores_to_probs(&[0.1, 0.7, 0.2]).unwrap();
        assert!((probs.data[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_logits_get_softmax() {
        let probs = scores_to_probs(&[-2.0, -1.0, -3.0]).unwrap();
        assert!((probs.data.sum() - 1.0).abs() < 1e-5);
        assert_eq!(probs.top1(), 1);
    }

    #[test]
    fn test_nan_scores_handled() {
        let probs = scores_to_probs(&[f32::NAN, 0.9, 0.1]).unwrap();
        assert_eq!(probs.top1(), 1);
    }

    #[test]
    fn test_no_usable_output_abstains() {
        assert!(scores_to_probs(&[]).is_none());
        assert!(scores_to_probs(&[f32::NAN, f32::NAN]).is_none());
        assert_eq!(decide_class(None, None), GestureClass::ABSTAIN);
    }

    #[test]
    fn test_threshold() {
        let probs = scores_to_probs(&[0.4, 0.35, 0.25]).unwrap();
        assert_eq!(decide_class(Some(&probs), None), GestureClass::from_index(0));
        assert_eq!(decide_class(Some(&probs), Some(0.5)), GestureClass::ABSTAIN);
        assert_eq!(
            decide_class(Some(&probs), Some(0.4)),
            GestureClass::from_index(0)
        );
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let probs = scores_to_probs(&[0.25, 0.25, 0.25, 0.25]).unwrap();
        assert_eq!(decide_class(Some(&probs), None), GestureClass::from_index(0));
    }
}
