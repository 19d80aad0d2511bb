// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint classifier weight files.
//!
//! The native weight format is a small little-endian container:
//!
//! ```text
//! magic        4 bytes   b"KPCW"
//! version      u32       1
//! layer_count  u32       >= 1
//! per layer:
//!   in_dim     u32
//!   out_dim    u32
//!   activation u32       0 linear, 1 relu, 2 tanh, 3 softmax
//!   weights    f32 * out_dim * in_dim   (row-major, [out][in])
//!   bias       f32 * out_dim
//! ```
//!
//! The file must end exactly after the last bias. Any deviation is reported as
//! [`RecognitionError::ConfigError`] since a broken model must stop startup.

use std::fmt;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{RecognitionError, Result};
use crate::preprocessing::FEATURE_LEN;

/// Magic bytes at the start of every weight file.
pub const MAGIC: &[u8; 4] = b"KPCW";

/// Supported format version.
pub const VERSION: u32 = 1;

/// Activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Softmax,
}

impl Activation {
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::Linear => 0,
            Self::Relu => 1,
            Self::Tanh => 2,
            Self::Softmax => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Linear),
            1 => Some(Self::Relu),
            2 => Some(Self::Tanh),
            3 => Some(Self::Softmax),
            _ => None,
        }
    }

    /// Apply the activation in place.
    pub fn apply(&self, values: &mut Array1<f32>) {
        match self {
            Self::Linear => {}
            Self::Relu => values.mapv_inplace(|v| v.max(0.0)),
            Self::Tanh => values.mapv_inplace(f32::tanh),
            Self::Softmax => crate::postprocessing::softmax_inplace(values),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linear => "linear",
            Self::Relu => "relu",
            Self::Tanh => "tanh",
            Self::Softmax => "softmax",
        };
        write!(f, "{name}")
    }
}

/// One fully connected layer: `activation(weights . x + bias)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// Shape `(out_dim, in_dim)`.
    pub weights: Array2<f32>,
    /// Shape `(out_dim,)`.
    pub bias: Array1<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Build a layer, checking that weights and bias agree.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if `bias.len()` differs from
    /// the weight matrix's row count.
    pub fn new(weights: Array2<f32>, bias: Array1<f32>, activation: Activation) -> Result<Self> {
        if weights.nrows() != bias.len() {
            return Err(RecognitionError::ConfigError(format!(
                "layer has {} output rows but {} biases",
                weights.nrows(),
                bias.len()
            )));
        }
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Forward pass for a single input vector.
    #[must_use]
    pub fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        let mut out = self.weights.dot(input) + &self.bias;
        self.activation.apply(&mut out);
        out
    }
}

/// The parameters of a feed-forward keypoint classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightFile {
    layers: Vec<DenseLayer>,
}

impl WeightFile {
    /// Assemble a network from layers, validating the shape chain.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if there are no layers, the first layer
    /// does not take 42 inputs, consecutive layers disagree on size, the last
    /// layer has no outputs, or any parameter is not finite.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let first = layers
            .first()
            .ok_or_else(|| RecognitionError::ConfigError("model has no layers".to_string()))?;
        if first.in_dim() != FEATURE_LEN {
            return Err(RecognitionError::ConfigError(format!(
                "first layer expects {} inputs, keypoint features have {FEATURE_LEN}",
                first.in_dim()
            )));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(RecognitionError::ConfigError(format!(
                    "layer {i} outputs {} values but layer {} expects {}",
                    pair[0].out_dim(),
                    i + 1,
                    pair[1].in_dim()
                )));
            }
        }
        for (i, layer) in layers.iter().enumerate() {
            let finite = layer.weights.iter().chain(layer.bias.iter()).all(|v| v.is_finite());
            if !finite {
                return Err(RecognitionError::ConfigError(format!(
                    "layer {i} contains non-finite parameters"
                )));
            }
        }
        if layers.last().is_some_and(|l| l.out_dim() == 0) {
            return Err(RecognitionError::ConfigError(
                "last layer has no outputs".to_string(),
            ));
        }
        Ok(Self { layers })
    }

    /// Load a weight file from disk.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the file is missing, unreadable, or
    /// malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RecognitionError::ConfigError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let bytes = fs::read(path).map_err(|e| {
            RecognitionError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes).map_err(|e| match e {
            RecognitionError::ConfigError(msg) => {
                RecognitionError::ConfigError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse the binary weight format.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] on any format violation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);

        if reader.take(4)? != MAGIC {
            return Err(RecognitionError::ConfigError(
                "not a keypoint classifier weight file (bad magic)".to_string(),
            ));
        }
        let version = reader.u32()?;
        if version != VERSION {
            return Err(RecognitionError::ConfigError(format!(
                "unsupported weight file version {version}, expected {VERSION}"
            )));
        }

        let layer_count = reader.u32()? as usize;
        let mut layers = Vec::with_capacity(layer_count.min(64));
        for index in 0..layer_count {
            let in_dim = reader.u32()? as usize;
            let out_dim = reader.u32()? as usize;
            let code = reader.u32()?;
            let activation = Activation::from_code(code).ok_or_else(|| {
                RecognitionError::ConfigError(format!(
                    "layer {index} has unknown activation code {code}"
                ))
            })?;

            let count = in_dim.checked_mul(out_dim).ok_or_else(|| {
                RecognitionError::ConfigError(format!("layer {index} is too large"))
            })?;
            let weights = Array2::from_shape_vec((out_dim, in_dim), reader.f32s(count)?)
                .map_err(|e| RecognitionError::ConfigError(format!("layer {index}: {e}")))?;
            let bias = Array1::from_vec(reader.f32s(out_dim)?);

            layers.push(DenseLayer::new(weights, bias, activation)?);
        }

        if reader.remaining() != 0 {
            return Err(RecognitionError::ConfigError(format!(
                "{} unexpected trailing bytes",
                reader.remaining()
            )));
        }

        Self::new(layers)
    }

    /// Serialize to the binary weight format.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.layers.len() as u32).to_le_bytes());
        for layer in &self.layers {
            out.extend_from_slice(&(layer.in_dim() as u32).to_le_bytes());
            out.extend_from_slice(&(layer.out_dim() as u32).to_le_bytes());
            out.extend_from_slice(&layer.activation.code().to_le_bytes());
            for v in layer.weights.iter().chain(layer.bias.iter()) {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    /// Write the weight file to disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    #[must_use]
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Number of output classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::out_dim)
    }

    /// Total number of weights and biases.
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    /// Run the full network on one input vector.
    #[must_use]
    pub fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        self.layers
            .iter()
            .fold(input.clone(), |x, layer| layer.forward(&x))
    }
}

/// Cursor over a byte slice that reports truncation as a configuration error.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(RecognitionError::ConfigError(format!(
                "weight file truncated at byte {} (needed {n} more, {} left)",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        let len = count.checked_mul(4).ok_or_else(|| {
            RecognitionError::ConfigError("weight block size overflows".to_string())
        })?;
        let raw = self.take(len)?;
        Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_net() -> WeightFile {
        let hidden = DenseLayer::new(
            Array2::from_shape_fn((4, FEATURE_LEN), |(r, c)| ((r * 7 + c) % 5) as f32 * 0.1 - 0.2),
            Array1::from_vec(vec![0.0, 0.1, -0.1, 0.05]),
            Activation::Relu,
        )
        .unwrap();
        let output = DenseLayer::new(
            Array2::from_shape_fn((3, 4), |(r, c)| if r == c { 1.0 } else { -0.5 }),
            Array1::zeros(3),
            Activation::Softmax,
        )
        .unwrap();
        WeightFile::new(vec![hidden, output]).unwrap()
    }

    #[test]
    fn test_bytes_reload_identical() {
        let net = tiny_net();
        let parsed = WeightFile::from_bytes(&net.to_bytes()).unwrap();
        assert_eq!(parsed, net);
        assert_eq!(parsed.num_classes(), 3);
        assert_eq!(parsed.num_parameters(), 4 * FEATURE_LEN + 4 + 3 * 4 + 3);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = tiny_net().to_bytes();
        bytes[0] = b'X';
        let err = WeightFile::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = tiny_net().to_bytes();
        bytes[4] = 9;
        assert!(matches!(
            WeightFile::from_bytes(&bytes),
            Err(RecognitionError::ConfigError(_))
        ));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let bytes = tiny_net().to_bytes();
        let err = WeightFile::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(err.to_string().contains("truncated"));

        let mut padded = bytes;
        padded.push(0);
        let err = WeightFile::from_bytes(&padded).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_shape_chain_checked() {
        let a = DenseLayer::new(Array2::zeros((8, FEATURE_LEN)), Array1::zeros(8), Activation::Relu)
            .unwrap();
        let b = DenseLayer::new(Array2::zeros((3, 5)), Array1::zeros(3), Activation::Linear)
            .unwrap();
        assert!(WeightFile::new(vec![a, b]).is_err());

        let wrong_input =
            DenseLayer::new(Array2::zeros((3, 10)), Array1::zeros(3), Activation::Linear).unwrap();
        assert!(WeightFile::new(vec![wrong_input]).is_err());
        assert!(WeightFile::new(Vec::new()).is_err());
    }

    #[test]
    fn test_bias_mismatch() {
        assert!(
            DenseLayer::new(Array2::zeros((3, FEATURE_LEN)), Array1::zeros(2), Activation::Relu)
                .is_err()
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut weights = Array2::zeros((2, FEATURE_LEN));
        weights[[1, 3]] = f32::NAN;
        let layer = DenseLayer::new(weights, Array1::zeros(2), Activation::Linear).unwrap();
        assert!(WeightFile::new(vec![layer]).is_err());
    }

    #[test]
    fn test_forward_relu_then_softmax() {
        let net = tiny_net();
        let out = net.forward(&Array1::zeros(FEATURE_LEN));
        assert_eq!(out.len(), 3);
        assert!((out.sum() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = WeightFile::load("does/not/exist.kpcw").unwrap_err();
        assert!(err.is_config());
    }
}
