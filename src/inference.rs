// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Recognition configuration.
//!
//! [`RecognizerConfig`] controls the classifier and the word policy of a
//! recognition session. [`DetectorConfig`] holds the hand limits shared by
//! the detector collaborator and the session.

/// How a session turns recognized gestures into the displayed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordPolicy {
    /// The word is the most recently recognized label.
    #[default]
    Replace,
    /// Labels are appended once the same class has been recognized for
    /// `hold_frames` consecutive frames. The same label is never appended
    /// twice in a row until something else is seen in between.
    Spell {
        /// Consecutive frames a gesture must be held before it is appended.
        hold_frames: u32,
    },
}

impl WordPolicy {
    /// Spell policy with the given hold duration (at least one frame).
    #[must_use]
    pub const fn spell(hold_frames: u32) -> Self {
        Self::Spell {
            hold_frames: if hold_frames == 0 { 1 } else { hold_frames },
        }
    }
}

/// Configuration for a recognition session.
///
/// # Example
///
/// ```rust
/// use handsign_inference::{RecognizerConfig, WordPolicy};
///
/// let config = RecognizerConfig::new()
///     .with_min_confidence(0.6)
///     .with_word_policy(WordPolicy::spell(15));
/// ```
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Optional floor on the top-1 probability. Below it the classifier
    /// abstains. `None` always returns the best class.
    pub min_confidence: Option<f32>,
    /// Word accumulation policy.
    pub word_policy: WordPolicy,
    /// Number of intra-op threads for the ONNX backend.
    /// Setting this to `0` lets ONNX Runtime decide.
    pub num_threads: usize,
    /// Hand limits applied to every frame before classification.
    pub detector: DetectorConfig,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            min_confidence: None,
            word_policy: WordPolicy::Replace,
            num_threads: 0,
            detector: DetectorConfig::default(),
        }
    }
}

impl RecognizerConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum top-1 probability for a classification to count.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Minimum probability (0.0 to 1.0).
    #[must_use]
    pub const fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence = Some(threshold);
        self
    }

    /// Set the word accumulation policy.
    #[must_use]
    pub const fn with_word_policy(mut self, policy: WordPolicy) -> Self {
        self.word_policy = policy;
        self
    }

    /// Set the number of threads for ONNX inference.
    ///
    /// # Arguments
    ///
    /// * `threads` - The number of intra-op threads. Set to `0` for auto-configuration.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the hand limits applied by the session.
    #[must_use]
    pub const fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }
}

/// Settings for the hand detector collaborator.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Maximum number of hands reported per frame.
    pub max_num_hands: usize,
    /// Detections scoring below this are dropped.
    pub min_detection_confidence: f32,
    /// Frame size (width, height) used to convert normalized landmarks when
    /// a frame does not state its own size.
    pub frame_size: (u32, u32),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_num_hands: 1,
            min_detection_confidence: 0.7,
            frame_size: (960, 540),
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_max_num_hands(mut self, max: usize) -> Self {
        self.max_num_hands = max;
        self
    }

    #[must_use]
    pub const fn with_min_detection_confidence(mut self, threshold: f32) -> Self {
        self.min_detection_confidence = threshold;
        self
    }

    #[must_use]
    pub const fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }
}
