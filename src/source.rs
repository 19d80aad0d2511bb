// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hand detection sources.
//!
//! Hand detection itself is a collaborator: anything implementing
//! [`HandDetector`] can turn an input frame into landmark [`Detection`]s.
//! [`DetectedFrames`] drives a detector over a stream of images, and
//! [`ReplaySource`] reads previously captured detections from a JSON Lines
//! file so the recognizer can run without a camera.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecognitionError, Result};
use crate::inference::DetectorConfig;
use crate::landmarks::{Detection, Handedness, Keypoint, LandmarkList};

/// Produces hand landmarks for one input frame.
pub trait HandDetector<I> {
    /// Detect hands in `image`, in detector order.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector fails on this frame.
    fn detect(&mut self, image: &I) -> Result<Vec<Detection>>;
}

/// One frame of detector output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Zero-based frame index within the source.
    pub index: u64,
    /// Frame size in pixels, when known.
    pub size: Option<(u32, u32)>,
    pub detections: Vec<Detection>,
}

impl Frame {
    #[must_use]
    pub const fn new(index: u64, detections: Vec<Detection>) -> Self {
        Self {
            index,
            size: None,
            detections,
        }
    }

    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }
}

/// Apply the detector limits: drop low-scoring hands, then keep at most
/// `max_num_hands` in detector order.
#[must_use]
pub fn filter_detections(mut detections: Vec<Detection>, config: &DetectorConfig) -> Vec<Detection> {
    detections.retain(|d| d.score.is_none_or(|s| s >= config.min_detection_confidence));
    detections.truncate(config.max_num_hands);
    detections
}

/// Runs a [`HandDetector`] over an image iterator, yielding filtered frames.
pub struct DetectedFrames<D, S> {
    detector: D,
    images: S,
    config: DetectorConfig,
    index: u64,
}

impl<D, S> DetectedFrames<D, S> {
    pub const fn new(detector: D, images: S, config: DetectorConfig) -> Self {
        Self {
            detector,
            images,
            config,
            index: 0,
        }
    }
}

impl<I, D, S> Iterator for DetectedFrames<D, S>
where
    D: HandDetector<I>,
    S: Iterator<Item = I>,
{
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let image = self.images.next()?;
        let index = self.index;
        self.index += 1;
        Some(
            self.detector
                .detect(&image)
                .map(|found| Frame::new(index, filter_detections(found, &self.config))),
        )
    }
}

/// A replayed frame as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub hands: Vec<HandRecord>,
}

/// A replayed hand: handedness, optional detector score and 21 `[x, y]` points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandRecord {
    pub handedness: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub landmarks: Vec<[f32; 2]>,
    /// Coordinates are fractions of the frame size rather than pixels.
    #[serde(default)]
    pub normalized: bool,
}

impl HandRecord {
    /// Record a detection in pixel coordinates.
    #[must_use]
    pub fn from_detection(detection: &Detection) -> Self {
        Self {
            handedness: detection.handedness.to_string(),
            score: detection.score,
            landmarks: detection.landmarks.points().iter().map(|p| [p.x, p.y]).collect(),
            normalized: false,
        }
    }
}

/// Converts [`FrameRecord`]s into detections.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    config: DetectorConfig,
}

impl ReplayDetector {
    #[must_use]
    pub const fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn hand(&self, record: &FrameRecord, hand: &HandRecord) -> Result<Detection> {
        let handedness: Handedness = hand.handedness.parse()?;
        let (width, height) = match (record.width, record.height) {
            (Some(w), Some(h)) => (w, h),
            _ => self.config.frame_size,
        };
        let points: Vec<Keypoint> = hand
            .landmarks
            .iter()
            .map(|&[x, y]| {
                if hand.normalized {
                    Keypoint::from_normalized(x, y, width, height)
                } else {
                    Keypoint::new(x, y)
                }
            })
            .collect();
        let mut detection = Detection::new(LandmarkList::from_slice(&points)?, handedness);
        detection.score = hand.score;
        Ok(detection)
    }
}

impl HandDetector<FrameRecord> for ReplayDetector {
    fn detect(&mut self, record: &FrameRecord) -> Result<Vec<Detection>> {
        let detections = record
            .hands
            .iter()
            .map(|hand| self.hand(record, hand))
            .collect::<Result<Vec<_>>>()?;
        Ok(filter_detections(detections, &self.config))
    }
}

/// Reads frames from a JSON Lines replay, one [`FrameRecord`] per line.
///
/// Blank lines are skipped. A line that fails to parse yields a
/// [`RecognitionError::SourceError`] naming the line.
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_no: usize,
    index: u64,
    detector: ReplayDetector,
}

impl ReplaySource<BufReader<File>> {
    /// Open a replay file.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, config: DetectorConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RecognitionError::ConfigError(format!("Failed to open replay {}: {e}", path.display()))
        })?;
        Ok(Self::from_reader(BufReader::new(file), config))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R, config: DetectorConfig) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            index: 0,
            detector: ReplayDetector::new(config),
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<Frame> {
        let record: FrameRecord = serde_json::from_str(line)?;
        let detections = self.detector.detect(&record)?;
        let mut frame = Frame::new(self.index, detections);
        if let (Some(w), Some(h)) = (record.width, record.height) {
            frame = frame.with_size(w, h);
        }
        Ok(frame)
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = self.line_no;
            let frame = self.parse_line(&line).map_err(|e| {
                RecognitionError::SourceError(format!("line {line_no}: {}", detail(e)))
            });
            if frame.is_ok() {
                self.index += 1;
            }
            return Some(frame);
        }
    }
}

fn detail(err: RecognitionError) -> String {
    match err {
        RecognitionError::SourceError(msg) | RecognitionError::InvalidInput(msg) => msg,
        other => other.to_string(),
    }
}
