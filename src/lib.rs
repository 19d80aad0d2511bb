// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Hand-Sign Gesture Recognition Library
//!
//! Recognizes static hand-sign gestures from the 21 hand landmarks reported by
//! a hand detector, and keeps a running "recognized word" across frames.
//!
//! ## Features
//!
//! - **Landmark normalization** - Translation and scale invariant 42-value features
//! - **Native classifier** - Small dense network evaluated with `ndarray`, no runtime needed
//! - **ONNX Runtime** - Optional backend for exported `.onnx` classifiers (`onnx` feature)
//! - **Word policies** - Replace the word on every gesture, or spell by holding gestures
//! - **Replay sources** - Drive the recognizer from JSON Lines landmark captures
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use handsign_inference::{KeyPointClassifier, LabelTable, RecognitionSession, RecognizerConfig};
//! use handsign_inference::source::ReplaySource;
//! use handsign_inference::DetectorConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RecognizerConfig::new().with_min_confidence(0.5);
//!     let classifier = KeyPointClassifier::load_with_config("keypoint_classifier.kpcw", &config)?;
//!     let labels = LabelTable::load("keypoint_classifier_label.csv")?;
//!     let mut session = RecognitionSession::new(classifier, labels, &config)?;
//!     session.start();
//!
//!     for frame in ReplaySource::open("session.jsonl", DetectorConfig::default())? {
//!         let result = session.process_frame(&frame?.detections)?;
//!         for hand in &result.hands {
//!             println!("{}", hand.info_text());
//!         }
//!         println!("{}", result.word_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Recognize gestures in a landmark replay with the default model and labels
//! handsign-inference recognize --source session.jsonl
//!
//! # Abstain on low-confidence predictions and spell words from held gestures
//! handsign-inference recognize -s session.jsonl --min-confidence 0.6 --spell 15
//!
//! # Describe a classifier and its labels
//! handsign-inference inspect --model keypoint_classifier.kpcw
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`landmarks`] | [`Keypoint`], [`LandmarkList`] and detector [`Detection`]s |
//! | [`preprocessing`] | [`normalize`] landmarks into a [`FeatureVector`] |
//! | [`weights`] | Native `KPCW` weight format and dense layers |
//! | [`model`] | [`KeyPointClassifier`] and the [`ScoreModel`] backend trait |
//! | [`postprocessing`] | Softmax and abstention rules |
//! | [`labels`] | [`LabelTable`] loaded from CSV |
//! | [`session`] | [`RecognitionSession`] and the word state machine |
//! | [`source`] | [`HandDetector`] trait and JSON Lines replay |
//! | [`presenter`] | [`Presenter`] trait and console output |
//! | [`runner`] | Pull-based frame loop |
//! | [`inference`] | [`RecognizerConfig`] and [`DetectorConfig`] |
//! | [`error`] | Error types ([`RecognitionError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `onnx` | Load `.onnx` classifiers with ONNX Runtime |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod cli;
pub mod error;
pub mod inference;
pub mod labels;
pub mod landmarks;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod presenter;
pub mod results;
pub mod runner;
pub mod session;
pub mod source;
pub mod weights;

// Re-export main types for convenience
pub use error::{RecognitionError, Result};
pub use inference::{DetectorConfig, RecognizerConfig, WordPolicy};
pub use labels::LabelTable;
pub use landmarks::{Detection, Handedness, Keypoint, LandmarkList, NUM_LANDMARKS};
pub use model::{KeyPointClassifier, ScoreModel};
pub use preprocessing::{FEATURE_LEN, FeatureVector, normalize};
pub use presenter::{ConsolePresenter, Presenter};
pub use results::{FrameResult, GestureClass, HandResult, Probs, Speed};
pub use session::{RecognitionSession, RecognitionState, SessionStatus};
pub use source::{Frame, HandDetector, ReplaySource};
pub use weights::WeightFile;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
