// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Landmark preprocessing for gesture classification.
//!
//! Raw keypoints depend on where the hand sits in the frame and how far it is
//! from the camera. [`normalize`] removes both: every keypoint is expressed
//! relative to the wrist and the flattened vector is divided by its largest
//! absolute component, leaving 42 values in `[-1, 1]`.

use std::ops::Index;

use ndarray::{Array1, ArrayView1};

use crate::error::{RecognitionError, Result};
use crate::landmarks::{Keypoint, LandmarkList, NUM_LANDMARKS};

/// Length of a feature vector (x and y for every landmark).
pub const FEATURE_LEN: usize = NUM_LANDMARKS * 2;

/// Translation and scale normalized landmark features.
///
/// Layout is `[x0, y0, x1, y1, ..., x20, y20]` with `(x0, y0) == (0, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    data: Array1<f32>,
}

impl FeatureVector {
    /// Normalize a landmark list. Cannot fail since the length is fixed.
    #[must_use]
    pub fn from_landmarks(landmarks: &LandmarkList) -> Self {
        Self {
            data: normalize_points(landmarks.points()),
        }
    }

    /// The all-zero vector produced when every keypoint coincides with the wrist.
    #[must_use]
    pub fn zeros() -> Self {
        Self {
            data: Array1::zeros(FEATURE_LEN),
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> &Array1<f32> {
        &self.data
    }

    #[must_use]
    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.data.view()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        // Built from a Vec or `zeros`, so always contiguous.
        self.data.as_slice().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether every component is zero (the degenerate single-point hand).
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }

    #[must_use]
    pub fn into_inner(self) -> Array1<f32> {
        self.data
    }
}

impl Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = RecognitionError;

    /// Wrap precomputed features, checking only the length.
    fn try_from(values: Vec<f32>) -> Result<Self> {
        check_feature_len(values.len())?;
        Ok(Self {
            data: Array1::from_vec(values),
        })
    }
}

/// Convert raw keypoints into a [`FeatureVector`].
///
/// # Arguments
///
/// * `landmarks` - Exactly 21 keypoints in anatomical order, pixel space.
///
/// # Errors
///
/// Returns [`RecognitionError::InvalidInput`] if `landmarks.len() != 21`.
pub fn normalize(landmarks: &[Keypoint]) -> Result<FeatureVector> {
    if landmarks.len() != NUM_LANDMARKS {
        return Err(RecognitionError::InvalidInput(format!(
            "expected {NUM_LANDMARKS} landmarks, got {}",
            landmarks.len()
        )));
    }
    Ok(FeatureVector {
        data: normalize_points(landmarks),
    })
}

/// Fail unless `len` is a valid feature vector length.
pub(crate) fn check_feature_len(len: usize) -> Result<()> {
    if len == FEATURE_LEN {
        Ok(())
    } else {
        Err(RecognitionError::InvalidInput(format!(
            "expected {FEATURE_LEN} features, got {len}"
        )))
    }
}

fn normalize_points(points: &[Keypoint]) -> Array1<f32> {
    let base = points.first().copied().unwrap_or_default();

    let mut flat = Vec::with_capacity(points.len() * 2);
    for p in points {
        flat.push(p.x - base.x);
        flat.push(p.y - base.y);
    }

    let scale = flat.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
    if scale > 0.0 {
        for v in &mut flat {
            *v /= scale;
        }
    }

    Array1::from_vec(flat)
}
