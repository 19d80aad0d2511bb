// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint classifier loading and inference.
//!
//! [`KeyPointClassifier`] wraps a fixed-weight scoring model and turns a
//! [`FeatureVector`] into a [`GestureClass`]. The model is loaded once at
//! startup; any problem with it is a [`RecognitionError::ConfigError`].
//!
//! Two backends are available: the native weight file format (see
//! [`crate::weights`]) evaluated with `ndarray`, and ONNX models through ONNX
//! Runtime when the `onnx` feature is enabled.

use std::path::Path;

use crate::error::{RecognitionError, Result};
use crate::inference::RecognizerConfig;
use crate::postprocessing::{decide_class, scores_to_probs};
use crate::preprocessing::{FeatureVector, check_feature_len};
use crate::results::{GestureClass, Probs};
use crate::verbose;
use crate::weights::WeightFile;

/// A numeric model producing one score per gesture class.
pub trait ScoreModel {
    /// Raw class scores for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to evaluate the input.
    fn scores(&mut self, features: &FeatureVector) -> Result<Vec<f32>>;

    /// Number of classes the model scores.
    fn num_classes(&self) -> usize;

    /// Short backend name for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl ScoreModel for WeightFile {
    fn scores(&mut self, features: &FeatureVector) -> Result<Vec<f32>> {
        Ok(self.forward(features.as_array()).to_vec())
    }

    fn num_classes(&self) -> usize {
        Self::num_classes(self)
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// Gesture classifier over normalized hand landmarks.
///
/// # Example
///
/// ```no_run
/// use handsign_inference::{KeyPointClassifier, LandmarkList, Keypoint};
///
/// let mut classifier = KeyPointClassifier::load("keypoint_classifier.kpcw")?;
/// let hand = LandmarkList::uniform(Keypoint::new(320.0, 240.0));
/// let class = classifier.classify(&hand.features())?;
/// println!("class {class}");
/// # Ok::<(), handsign_inference::RecognitionError>(())
/// ```
pub struct KeyPointClassifier {
    model: Box<dyn ScoreModel>,
    min_confidence: Option<f32>,
}

impl KeyPointClassifier {
    /// Load a classifier with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the model cannot be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, &RecognizerConfig::default())
    }

    /// Load a classifier with a custom configuration.
    ///
    /// Files ending in `.onnx` use the ONNX backend; anything else is read as a
    /// native weight file.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the file is missing or
    /// malformed, or an ONNX model is given without the `onnx` feature.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: &RecognizerConfig) -> Result<Self> {
        let path = path.as_ref();
        let is_onnx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));

        let model: Box<dyn ScoreModel> = if is_onnx {
            load_onnx(path, config)?
        } else {
            Box::new(WeightFile::load(path)?)
        };

        let classifier = Self::new(model, config)?;
        verbose!(
            "Loaded {} keypoint classifier from {} ({} classes)",
            classifier.backend(),
            path.display(),
            classifier.num_classes()
        );
        Ok(classifier)
    }

    /// Build a classifier from an in-memory native network.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the network has no classes.
    pub fn from_weights(weights: WeightFile, config: &RecognizerConfig) -> Result<Self> {
        Self::new(Box::new(weights), config)
    }

    /// Wrap any scoring model.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the model reports no classes.
    pub fn new(model: Box<dyn ScoreModel>, config: &RecognizerConfig) -> Result<Self> {
        if model.num_classes() == 0 {
            return Err(RecognitionError::ConfigError(
                "model has no output classes".to_string(),
            ));
        }
        Ok(Self {
            model,
            min_confidence: config.min_confidence,
        })
    }

    /// Class probabilities for a feature vector.
    ///
    /// # Returns
    ///
    /// * `None` when the model produced no usable scores.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails, or a
    /// [`RecognitionError::InferenceError`] if it returns a score count other
    /// than its class count.
    pub fn predict(&mut self, features: &FeatureVector) -> Result<Option<Probs>> {
        check_feature_len(features.len())?;
        let scores = self.model.scores(features)?;
        let classes = self.model.num_classes();
        if !scores.is_empty() && scores.len() != classes {
            return Err(RecognitionError::InferenceError(format!(
                "{} backend returned {} scores for {classes} classes",
                self.model.name(),
                scores.len()
            )));
        }
        Ok(scores_to_probs(&scores))
    }

    /// Classify a feature vector.
    ///
    /// Returns [`GestureClass::ABSTAIN`] when the model gives no usable result
    /// or the top-1 probability is under the configured floor.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn classify(&mut self, features: &FeatureVector) -> Result<GestureClass> {
        let probs = self.predict(features)?;
        Ok(decide_class(probs.as_ref(), self.min_confidence))
    }

    /// Classify raw feature values.
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::InvalidInput`] unless exactly 42 values are given.
    pub fn classify_slice(&mut self, features: &[f32]) -> Result<GestureClass> {
        let features = FeatureVector::try_from(features.to_vec())?;
        self.classify(&features)
    }

    /// Number of gesture classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// Backend name ("native", "onnx", ...).
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.model.name()
    }

    #[must_use]
    pub const fn min_confidence(&self) -> Option<f32> {
        self.min_confidence
    }
}

impl std::fmt::Debug for KeyPointClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPointClassifier")
            .field("backend", &self.model.name())
            .field("num_classes", &self.model.num_classes())
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, config: &RecognizerConfig) -> Result<Box<dyn ScoreModel>> {
    Ok(Box::new(onnx::OnnxModel::load(path, config.num_threads)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path, _config: &RecognizerConfig) -> Result<Box<dyn ScoreModel>> {
    Err(RecognitionError::ConfigError(format!(
        "{} is an ONNX model; rebuild with `--features onnx` to load it",
        path.display()
    )))
}

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use ndarray::Array2;
    use ort::session::Session;
    use ort::value::TensorRef;

    use super::ScoreModel;
    use crate::error::{RecognitionError, Result};
    use crate::preprocessing::{FEATURE_LEN, FeatureVector};

    /// ONNX Runtime session taking a `[1, 42]` float input.
    pub struct OnnxModel {
        session: Session,
        input_name: String,
        output_name: String,
        num_classes: usize,
    }

    impl OnnxModel {
        pub fn load(path: &Path, num_threads: usize) -> Result<Self> {
            if !path.exists() {
                return Err(RecognitionError::ConfigError(format!(
                    "Model file not found: {}",
                    path.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e| {
                    RecognitionError::ConfigError(format!("Failed to create session builder: {e}"))
                })?
                .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
                .map_err(|e| {
                    RecognitionError::ConfigError(format!("Failed to set optimization level: {e}"))
                })?
                .with_intra_threads(num_threads)
                .map_err(|e| {
                    RecognitionError::ConfigError(format!("Failed to set intra-thread count: {e}"))
                })?
                .commit_from_file(path)
                .map_err(|e| RecognitionError::ConfigError(format!("Failed to load model: {e}")))?;

            let input_name = session
                .inputs
                .first()
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "input_1".to_string());
            let output_name = session
                .outputs
                .first()
                .map(|o| o.name.clone())
                .ok_or_else(|| RecognitionError::ConfigError("model has no outputs".to_string()))?;

            let mut model = Self {
                session,
                input_name,
                output_name,
                num_classes: 0,
            };

            // Warm up with the degenerate hand; the output length is the class count.
            let probe = model
                .run(&FeatureVector::zeros())
                .map_err(|e| RecognitionError::ConfigError(format!("Warmup failed: {e}")))?;
            model.num_classes = probe.len();
            Ok(model)
        }

        fn run(&mut self, features: &FeatureVector) -> Result<Vec<f32>> {
            let input = Array2::from_shape_vec((1, FEATURE_LEN), features.as_slice().to_vec())
                .map_err(|e| RecognitionError::InvalidInput(e.to_string()))?;
            let input_contiguous = input.as_standard_layout();

            let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
                RecognitionError::InferenceError(format!("Failed to create input tensor: {e}"))
            })?;

            let inputs = ort::inputs![&self.input_name => input_tensor];
            let outputs = self
                .session
                .run(inputs)
                .map_err(|e| RecognitionError::InferenceError(format!("Inference failed: {e}")))?;

            let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
                RecognitionError::InferenceError(format!("Output '{}' not found", self.output_name))
            })?;

            let (_shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                RecognitionError::InferenceError(format!("Failed to extract output: {e}"))
            })?;

            Ok(data.to_vec())
        }
    }

    impl ScoreModel for OnnxModel {
        fn scores(&mut self, features: &FeatureVector) -> Result<Vec<f32>> {
            self.run(features)
        }

        fn num_classes(&self) -> usize {
            self.num_classes
        }

        fn name(&self) -> &'static str {
            "onnx"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::FEATURE_LEN;
    use crate::weights::{Activation, DenseLayer};
    use ndarray::{Array1, Array2};

    /// Three classes keyed on the sign of feature 2 (x of the thumb CMC).
    fn sign_net() -> WeightFile {
        let mut weights = Array2::zeros((3, FEATURE_LEN));
        weights[[0, 2]] = 5.0;
        weights[[1, 2]] = -5.0;
        let bias = Array1::from_vec(vec![0.0, 0.0, 1.0]);
        let layer = DenseLayer::new(weights, bias, Activation::Softmax).unwrap();
        WeightFile::new(vec![layer]).unwrap()
    }

    fn features_with_x(x: f32) -> FeatureVector {
        let mut values = vec![0.0; FEATURE_LEN];
        values[2] = x;
        FeatureVector::try_from(values).unwrap()
    }

    #[test]
    fn test_model_not_found() {
        let result = KeyPointClassifier::load("nonexistent.kpcw");
        assert!(matches!(
            result.unwrap_err(),
            RecognitionError::ConfigError(_)
        ));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_requires_feature() {
        let err = KeyPointClassifier::load("model.onnx").unwrap_err();
        assert!(err.to_string().contains("--features onnx"));
    }

    #[test]
    fn test_classify_by_sign() {
        let mut classifier =
            KeyPointClassifier::from_weights(sign_net(), &RecognizerConfig::default()).unwrap();
        assert_eq!(classifier.num_classes(), 3);
        assert_eq!(classifier.backend(), "native");
        assert_eq!(
            classifier.classify(&features_with_x(1.0)).unwrap(),
            GestureClass::from_index(0)
        );
        assert_eq!(
            classifier.classify(&features_with_x(-1.0)).unwrap(),
            GestureClass::from_index(1)
        );
    }

    #[test]
    fn test_degenerate_input_does_not_fail() {
        let mut classifier =
            KeyPointClassifier::from_weights(sign_net(), &RecognizerConfig::default()).unwrap();
        let class = classifier.classify(&FeatureVector::zeros()).unwrap();
        // Only the bias speaks for the zero vector.
        assert_eq!(class, GestureClass::from_index(2));
    }

    #[test]
    fn test_deterministic() {
        let mut classifier =
            KeyPointClassifier::from_weights(sign_net(), &RecognizerConfig::default()).unwrap();
        let features = features_with_x(0.3);
        let first = classifier.classify(&features).unwrap();
        for _ in 0..50 {
            assert_eq!(classifier.classify(&features).unwrap(), first);
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut classifier =
            KeyPointClassifier::from_weights(sign_net(), &RecognizerConfig::default()).unwrap();
        assert!(matches!(
            classifier.classify_slice(&[0.0; 41]),
            Err(RecognitionError::InvalidInput(_))
        ));
        assert!(classifier.classify_slice(&[0.0; FEATURE_LEN]).is_ok());
    }

    #[test]
    fn test_confidence_floor_abstains() {
        let config = RecognizerConfig::new().with_min_confidence(0.99);
        let mut classifier = KeyPointClassifier::from_weights(sign_net(), &config).unwrap();
        assert_eq!(
            classifier.classify(&features_with_x(0.1)).unwrap(),
            GestureClass::ABSTAIN
        );
    }

    struct Silent;

    impl ScoreModel for Silent {
        fn scores(&mut self, _features: &FeatureVector) -> Result<Vec<f32>> {
            Ok(vec![f32::NAN; 4])
        }

        fn num_classes(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_unusable_scores_abstain() {
        let mut classifier =
            KeyPointClassifier::new(Box::new(Silent), &RecognizerConfig::default()).unwrap();
        assert_eq!(
            classifier.classify(&FeatureVector::zeros()).unwrap(),
            GestureClass::ABSTAIN
        );
        assert_eq!(classifier.backend(), "custom");
    }

    /// Reports three classes but scores five.
    struct Oversized;

    impl ScoreModel for Oversized {
        fn scores(&mut self, _features: &FeatureVector) -> Result<Vec<f32>> {
            Ok(vec![0.0, 0.0, 0.0, 0.0, 1.0])
        }

        fn num_classes(&self) -> usize {
            3
        }
    }

    #[test]
    fn test_score_count_must_match_classes() {
        let mut classifier =
            KeyPointClassifier::new(Box::new(Oversized), &RecognizerConfig::default()).unwrap();
        let err = classifier.classify(&FeatureVector::zeros()).unwrap_err();
        assert!(matches!(err, RecognitionError::InferenceError(_)));
        assert!(err.to_string().contains("5 scores for 3 classes"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.kpcw");
        sign_net().save(&path).unwrap();
        let classifier = KeyPointClassifier::load(&path).unwrap();
        assert_eq!(classifier.num_classes(), 3);
    }
}
