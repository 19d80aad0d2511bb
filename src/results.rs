// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Result types for gesture recognition output.
//!
//! [`GestureClass`] and [`Probs`] describe a single classification,
//! [`HandResult`] one hand in a frame, and [`FrameResult`] everything the
//! presentation layer needs to render a frame.

use std::fmt;

use ndarray::Array1;

use crate::landmarks::Handedness;

/// Timing information for one frame (in milliseconds).
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent normalizing landmarks.
    pub preprocess: Option<f64>,
    /// Time spent in the classifier.
    pub inference: Option<f64>,
    /// Time spent resolving labels and updating the word.
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    ///
    /// # Arguments
    ///
    /// * `preprocess` - Time in milliseconds.
    /// * `inference` - Time in milliseconds.
    /// * `postprocess` - Time in milliseconds.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            postprocess: Some(postprocess),
        }
    }

    /// Sum of all recorded stages in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess.unwrap_or(0.0)
            + self.inference.unwrap_or(0.0)
            + self.postprocess.unwrap_or(0.0)
    }
}

/// Index into the label table, or `-1` when the classifier abstained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GestureClass(i32);

impl GestureClass {
    /// No recognized class.
    pub const ABSTAIN: Self = Self(-1);

    /// Wrap a class index. Indices beyond `i32::MAX` cannot be represented and
    /// become an abstention.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        i32::try_from(index).map_or(Self::ABSTAIN, Self)
    }

    /// Wrap a raw class id as reported by external tooling (`-1` = abstain).
    /// Any negative value is treated as an abstention.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        if raw < 0 { Self::ABSTAIN } else { Self(raw) }
    }

    /// The class index, or `None` for an abstention.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    #[must_use]
    pub const fn is_abstain(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for GestureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification probabilities.
///
/// Stores class probabilities with convenience methods for top predictions.
#[derive(Debug, Clone)]
pub struct Probs {
    /// Probability data with shape (`num_classes`,).
    pub data: Array1<f32>,
}

impl Probs {
    #[must_use]
    pub const fn new(data: Array1<f32>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Index of the most probable class; the lowest index wins a tie.
    /// Returns 0 for an empty distribution.
    #[must_use]
    pub fn top1(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.data.iter().enumerate() {
            if p > self.data[best] {
                best = i;
            }
        }
        best
    }

    /// Probability of the top-1 class, 0 when empty.
    #[must_use]
    pub fn top1conf(&self) -> f32 {
        self.data.get(self.top1()).copied().unwrap_or(0.0)
    }

    /// Get the indices of the top-5 classes.
    #[must_use]
    pub fn top5(&self) -> Vec<usize> {
        self.top_k(5)
    }

    /// Get the indices of the top-k classes, sorted by probability.
    ///
    /// # Arguments
    ///
    /// * `k` - The number of classes to return.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.data.len()).collect();
        indices.sort_by(|&a, &b| {
            self.data[b]
                .partial_cmp(&self.data[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        indices.truncate(k);
        indices
    }
}

/// Outcome for one detected hand in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandResult {
    pub handedness: Handedness,
    pub class: GestureClass,
    /// Resolved label, empty when the classifier abstained.
    pub label: String,
    /// Top-1 probability when the classifier produced one.
    pub confidence: Option<f32>,
}

impl HandResult {
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !self.class.is_abstain()
    }

    /// Overlay caption for this hand: the predicted label, or just the
    /// handedness when nothing was recognized.
    #[must_use]
    pub fn info_text(&self) -> String {
        if self.label.is_empty() {
            self.handedness.to_string()
        } else {
            format!("Predicted Text: {}", self.label)
        }
    }
}

/// Everything produced for one processed frame.
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    /// Sequence number of the frame within the session, starting at 0.
    pub frame: u64,
    /// Per-hand outcomes in detection order.
    pub hands: Vec<HandResult>,
    /// The recognized word after this frame, `None` while the session is idle.
    pub word: Option<String>,
    /// Whether this frame changed the word.
    pub word_changed: bool,
    pub speed: Speed,
}

impl FrameResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    /// The current word, or an empty string while idle.
    #[must_use]
    pub fn word_str(&self) -> &str {
        self.word.as_deref().unwrap_or_default()
    }

    /// Caption for the accumulated word.
    #[must_use]
    pub fn word_text(&self) -> String {
        format!("Recognized Word: {}", self.word_str())
    }

    /// Label of the first recognized hand, if any.
    #[must_use]
    pub fn first_label(&self) -> Option<&str> {
        self.hands
            .iter()
            .find(|h| h.is_recognized())
            .map(|h| h.label.as_str())
    }
}
