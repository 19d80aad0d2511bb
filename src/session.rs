// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame recognition orchestration.
//!
//! A [`RecognitionSession`] owns the classifier, the label table and the
//! current [`RecognitionState`]. Each call to
//! [`RecognitionSession::process_frame`] classifies every detected hand first
//! and then applies a single state transition for the frame, so hands seen in
//! the same frame never interleave partial updates.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use crate::error::{RecognitionError, Result};
use crate::inference::{DetectorConfig, RecognizerConfig, WordPolicy};
use crate::labels::LabelTable;
use crate::landmarks::Detection;
use crate::model::KeyPointClassifier;
use crate::postprocessing::decide_class;
use crate::results::{FrameResult, GestureClass, HandResult, Speed};
use crate::source::filter_detections;
use crate::{verbose, warn};

/// The recognized word carried from frame to frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecognitionState {
    /// Nothing recognized yet.
    #[default]
    Idle,
    /// At least one gesture recognized; holds the current word.
    Active(String),
}

impl RecognitionState {
    #[must_use]
    pub fn word(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Active(word) => Some(word),
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Replace transition: a recognized label becomes the word, an abstention
    /// (`None`) leaves the state as it is.
    #[must_use]
    pub fn transition(self, label: Option<&str>) -> Self {
        match label {
            Some(label) => Self::Active(label.to_string()),
            None => self,
        }
    }

    /// Spell transition: append `label` to the current word.
    #[must_use]
    pub fn append(self, label: &str) -> Self {
        match self {
            Self::Idle => Self::Active(label.to_string()),
            Self::Active(mut word) => {
                word.push_str(label);
                Self::Active(word)
            }
        }
    }
}

/// Lifecycle of a session, mirroring start/stop controls of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Running,
    Stopped,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status: {}", self.as_str())
    }
}

/// Hold counter for [`WordPolicy::Spell`].
///
/// A class is appended exactly once per uninterrupted run, on the frame its
/// hold count reaches `hold_frames`.
#[derive(Debug, Clone, Default)]
struct SpellTracker {
    candidate: Option<GestureClass>,
    held: u32,
}

impl SpellTracker {
    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Record this frame's class and report whether it should be appended now.
    fn observe(&mut self, class: GestureClass, hold_frames: u32) -> bool {
        if self.candidate == Some(class) {
            self.held = self.held.saturating_add(1);
        } else {
            self.candidate = Some(class);
            self.held = 1;
        }
        self.held == hold_frames.max(1)
    }
}

/// Frame-synchronous gesture recognition session.
pub struct RecognitionSession {
    classifier: KeyPointClassifier,
    labels: LabelTable,
    policy: WordPolicy,
    detector: DetectorConfig,
    state: RecognitionState,
    spell: SpellTracker,
    status: SessionStatus,
    frames: u64,
}

impl RecognitionSession {
    /// Create a session from a loaded classifier and label table.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the label table has
    /// fewer labels than the classifier has classes.
    pub fn new(
        classifier: KeyPointClassifier,
        labels: LabelTable,
        config: &RecognizerConfig,
    ) -> Result<Self> {
        let classes = classifier.num_classes();
        if labels.len() < classes {
            return Err(RecognitionError::ConfigError(format!(
                "model has {classes} classes but only {} labels were loaded",
                labels.len()
            )));
        }
        if labels.len() > classes {
            warn!(
                "{} labels loaded for a {classes}-class model; extra labels are never produced",
                labels.len()
            );
        }
        Ok(Self {
            classifier,
            labels,
            policy: config.word_policy,
            detector: config.detector.clone(),
            state: RecognitionState::Idle,
            spell: SpellTracker::default(),
            status: SessionStatus::Ready,
            frames: 0,
        })
    }

    /// Load the classifier and label table from disk.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if either file is missing
    /// or malformed, or they disagree on the number of classes.
    pub fn load<M: AsRef<Path>, L: AsRef<Path>>(
        model_path: M,
        labels_path: L,
        config: &RecognizerConfig,
    ) -> Result<Self> {
        let classifier = KeyPointClassifier::load_with_config(model_path, config)?;
        let labels = LabelTable::load(labels_path)?;
        verbose!("Loaded {} gesture labels", labels.len());
        Self::new(classifier, labels, config)
    }

    /// Begin accepting frames. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.status == SessionStatus::Running {
            return false;
        }
        self.status = SessionStatus::Running;
        true
    }

    /// Stop accepting frames. The word is kept. Returns `false` if not running.
    pub fn stop(&mut self) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }
        self.status = SessionStatus::Stopped;
        true
    }

    /// Forget the recognized word and return to [`RecognitionState::Idle`].
    pub fn reset(&mut self) {
        self.state = RecognitionState::Idle;
        self.spell.clear();
    }

    /// Process one frame of detector output.
    ///
    /// Hands scoring below `min_detection_confidence` are dropped and at most
    /// `max_num_hands` are kept. With no hands left the word is returned
    /// unchanged. Otherwise every hand is normalized and classified, then the
    /// last recognized hand in detection order drives one state transition.
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::InvalidInput`] if the session is not running,
    /// or any backend error raised by the classifier.
    pub fn process_frame(&mut self, detections: &[Detection]) -> Result<FrameResult> {
        if self.status != SessionStatus::Running {
            return Err(RecognitionError::InvalidInput(format!(
                "session is not running ({})",
                self.status.as_str()
            )));
        }

        let frame = self.frames;
        self.frames += 1;
        let previous = self.state.word().map(str::to_string);
        let detections = filter_detections(detections.to_vec(), &self.detector);

        let mut speed = Speed::new(0.0, 0.0, 0.0);
        let mut hands = Vec::with_capacity(detections.len());
        for detection in &detections {
            hands.push(self.classify_hand(detection, &mut speed)?);
        }

        let start_update = Instant::now();
        let recognized = hands
            .iter()
            .rev()
            .find(|h| h.is_recognized())
            .map(|h| (h.class, h.label.clone()));
        self.apply(recognized);
        speed.postprocess = Some(start_update.elapsed().as_secs_f64() * 1000.0);

        let word = self.state.word().map(str::to_string);
        Ok(FrameResult {
            frame,
            word_changed: word != previous,
            hands,
            word,
            speed,
        })
    }

    fn classify_hand(&mut self, detection: &Detection, speed: &mut Speed) -> Result<HandResult> {
        let start_preprocess = Instant::now();
        let features = detection.landmarks.features();
        add_ms(&mut speed.preprocess, start_preprocess);

        let start_inference = Instant::now();
        let probs = self.classifier.predict(&features)?;
        let class = decide_class(probs.as_ref(), self.classifier.min_confidence());
        add_ms(&mut speed.inference, start_inference);

        let label = if class.is_abstain() {
            String::new()
        } else {
            self.labels.label_of(class)?.to_string()
        };

        Ok(HandResult {
            handedness: detection.handedness,
            class,
            label,
            confidence: probs.map(|p| p.top1conf()),
        })
    }

    fn apply(&mut self, recognized: Option<(GestureClass, String)>) {
        let state = std::mem::take(&mut self.state);
        self.state = match self.policy {
            WordPolicy::Replace => state.transition(recognized.as_ref().map(|(_, l)| l.as_str())),
            WordPolicy::Spell { hold_frames } => match recognized {
                Some((class, label)) => {
                    if self.spell.observe(class, hold_frames) {
                        state.append(&label)
                    } else {
                        state
                    }
                }
                None => {
                    self.spell.clear();
                    state
                }
            },
        };
    }

    #[must_use]
    pub const fn state(&self) -> &RecognitionState {
        &self.state
    }

    /// Current word, `None` while idle.
    #[must_use]
    pub fn word(&self) -> Option<&str> {
        self.state.word()
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.status, SessionStatus::Running)
    }

    /// Number of frames processed so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub const fn labels(&self) -> &LabelTable {
        &self.labels
    }

    #[must_use]
    pub const fn classifier(&self) -> &KeyPointClassifier {
        &self.classifier
    }

    #[must_use]
    pub const fn policy(&self) -> WordPolicy {
        self.policy
    }

    #[must_use]
    pub const fn detector(&self) -> &DetectorConfig {
        &self.detector
    }
}

impl fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("classifier", &self.classifier)
            .field("labels", &self.labels.len())
            .field("policy", &self.policy)
            .field("detector", &self.detector)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("frames", &self.frames)
            .finish()
    }
}

fn add_ms(slot: &mut Option<f64>, start: Instant) {
    *slot = Some(slot.unwrap_or(0.0) + start.elapsed().as_secs_f64() * 1000.0);
}
