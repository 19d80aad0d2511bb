// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hand landmark types.
//!
//! A detected hand is described by 21 keypoints in a fixed anatomical order
//! (wrist first, then four joints per finger from thumb to pinky). The order
//! is part of the classifier's contract and never changes.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::error::{RecognitionError, Result};
use crate::preprocessing::FeatureVector;

/// Number of keypoints per hand.
pub const NUM_LANDMARKS: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// A 2D keypoint in pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    /// Create a keypoint from pixel coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert detector-normalized coordinates (`0.0..=1.0`) into pixels.
    ///
    /// Each axis is truncated to an integer pixel and clamped into the frame,
    /// so a landmark on the far edge lands on the last pixel column/row.
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - Normalized coordinates.
    /// * `width`, `height` - Frame size in pixels.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn from_normalized(x: f32, y: f32, width: u32, height: u32) -> Self {
        let to_pixel = |v: f32, extent: u32| -> f32 {
            let last = extent.saturating_sub(1) as f32;
            (v * extent as f32).trunc().clamp(0.0, last)
        };
        Self {
            x: to_pixel(x, width),
            y: to_pixel(y, height),
        }
    }

    /// Translate by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(f32, f32)> for Keypoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f32; 2]> for Keypoint {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

/// The 21 keypoints of one detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkList {
    points: [Keypoint; NUM_LANDMARKS],
}

impl LandmarkList {
    /// Build a landmark list from exactly 21 keypoints.
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::InvalidInput`] for any other length.
    pub fn from_slice(points: &[Keypoint]) -> Result<Self> {
        let points: [Keypoint; NUM_LANDMARKS] = points.try_into().map_err(|_| {
            RecognitionError::InvalidInput(format!(
                "expected {NUM_LANDMARKS} landmarks, got {}",
                points.len()
            ))
        })?;
        Ok(Self { points })
    }

    /// All keypoints placed on the same pixel.
    #[must_use]
    pub const fn uniform(point: Keypoint) -> Self {
        Self {
            points: [point; NUM_LANDMARKS],
        }
    }

    #[must_use]
    pub const fn points(&self) -> &[Keypoint; NUM_LANDMARKS] {
        &self.points
    }

    #[must_use]
    pub const fn wrist(&self) -> Keypoint {
        self.points[WRIST]
    }

    /// Normalized feature vector for this hand.
    #[must_use]
    pub fn features(&self) -> FeatureVector {
        FeatureVector::from_landmarks(self)
    }

    /// Same hand shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            points: self.points.map(|p| p.offset(dx, dy)),
        }
    }

    /// Same hand scaled by `factor` about the origin.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            points: self.points.map(|p| Keypoint::new(p.x * factor, p.y * factor)),
        }
    }
}

impl Index<usize> for LandmarkList {
    type Output = Keypoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl TryFrom<Vec<Keypoint>> for LandmarkList {
    type Error = RecognitionError;

    fn try_from(points: Vec<Keypoint>) -> Result<Self> {
        Self::from_slice(&points)
    }
}

/// Which hand the detector believes it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Handedness {
    type Err = RecognitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            _ => Err(RecognitionError::InvalidInput(format!(
                "invalid handedness '{s}', expected one of: left, right"
            ))),
        }
    }
}

/// One hand reported by the detector for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub landmarks: LandmarkList,
    pub handedness: Handedness,
    /// Detector confidence, when the detector reports one.
    pub score: Option<f32>,
}

impl Detection {
    #[must_use]
    pub const fn new(landmarks: LandmarkList, handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
            score: None,
        }
    }

    #[must_use]
    pub const fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand() -> Vec<Keypoint> {
        (0..NUM_LANDMARKS)
            .map(|i| Keypoint::new(100.0 + i as f32 * 3.0, 200.0 - i as f32 * 2.0))
            .collect()
    }

    #[test]
    fn test_from_slice_length() {
        assert!(LandmarkList::from_slice(&hand()).is_ok());

        let points = hand();
        let err = LandmarkList::from_slice(&points[..20]).unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidInput(_)));

        let mut long = hand();
        long.push(Keypoint::default());
        assert!(LandmarkList::try_from(long).is_err());
    }

    #[test]
    fn test_from_normalized_clamps_to_frame() {
        let p = Keypoint::from_normalized(0.5, 0.25, 960, 540);
        assert_eq!(p, Keypoint::new(480.0, 135.0));

        let edge = Keypoint::from_normalized(1.0, 1.2, 960, 540);
        assert_eq!(edge, Keypoint::new(959.0, 539.0));

        let negative = Keypoint::from_normalized(-0.1, 0.0, 960, 540);
        assert_eq!(negative.x, 0.0);
    }

    #[test]
    fn test_truncates_like_integer_pixels() {
        let p = Keypoint::from_normalized(0.123_4, 0.999, 100, 100);
        assert_eq!(p, Keypoint::new(12.0, 99.0));
    }

    #[test]
    fn test_handedness_parse() {
        assert_eq!("Left".parse::<Handedness>().unwrap(), Handedness::Left);
        assert_eq!("RIGHT".parse::<Handedness>().unwrap(), Handedness::Right);
        assert!("both".parse::<Handedness>().is_err());
        assert_eq!(Handedness::Right.to_string(), "Right");
    }

    #[test]
    fn test_index_and_wrist() {
        let list = LandmarkList::from_slice(&hand()).unwrap();
        assert_eq!(list.wrist(), Keypoint::new(100.0, 200.0));
        assert_eq!(list[INDEX_TIP], Keypoint::new(124.0, 184.0));
    }
}
