// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pull-based frame loop.

use crate::error::Result;
use crate::presenter::Presenter;
use crate::results::Speed;
use crate::session::RecognitionSession;
use crate::source::Frame;

/// Totals for one run of [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Frames processed.
    pub frames: u64,
    /// Hands classified across all frames.
    pub hands: usize,
    /// Hands that produced a label.
    pub recognized: usize,
    /// Word when the run ended.
    pub word: Option<String>,
    /// Mean per-frame timings in milliseconds.
    pub speed: Speed,
}

/// Feed frames through `session` and hand each result to `presenter`.
///
/// The session is started if needed and stopped when the loop ends.
/// `presenter.stop()` is called even when a frame fails.
///
/// # Arguments
///
/// * `max_frames` - Stop after this many frames. `None` runs until the source is exhausted.
///
/// # Errors
///
/// Returns the first error raised by the source, the session or the
/// presenter.
#[allow(clippy::cast_precision_loss)]
pub fn run<S, P>(
    session: &mut RecognitionSession,
    frames: S,
    presenter: &mut P,
    max_frames: Option<u64>,
) -> Result<RunSummary>
where
    S: IntoIterator<Item = Result<Frame>>,
    P: Presenter + ?Sized,
{
    session.start();
    presenter.start()?;

    let limit = max_frames.map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(usize::MAX));
    let mut summary = RunSummary::default();
    let mut totals = (0.0, 0.0, 0.0);
    let outcome = (|| -> Result<()> {
        for frame in frames.into_iter().take(limit) {
            let frame = frame?;
            let result = session.process_frame(&frame.detections)?;

            summary.frames += 1;
            summary.hands += result.len();
            summary.recognized += result.hands.iter().filter(|h| h.is_recognized()).count();
            totals.0 += result.speed.preprocess.unwrap_or(0.0);
            totals.1 += result.speed.inference.unwrap_or(0.0);
            totals.2 += result.speed.postprocess.unwrap_or(0.0);

            presenter.present(&result)?;
        }
        Ok(())
    })();

    let stopped = presenter.stop();
    session.stop();
    outcome?;
    stopped?;

    let n = summary.frames.max(1) as f64;
    summary.speed = Speed::new(totals.0 / n, totals.1 / n, totals.2 / n);
    summary.word = session.word().map(str::to_string);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use crate::inference::RecognizerConfig;
    use crate::labels::LabelTable;
    use crate::landmarks::{Detection, Handedness, Keypoint, LandmarkList};
    use crate::model::KeyPointClassifier;
    use crate::presenter::MemoryPresenter;
    use crate::session::SessionStatus;
    use crate::weights::{Activation, DenseLayer, WeightFile};
    use ndarray::{Array1, Array2};
    use std::cell::Cell;

    /// Class 0 when the middle fingertip is right of the wrist, class 1 when left.
    fn session() -> RecognitionSession {
        let mut weights = Array2::zeros((2, 42));
        weights[[0, 24]] = 4.0;
        weights[[1, 24]] = -4.0;
        let layer = DenseLayer::new(weights, Array1::zeros(2), Activation::Linear).unwrap();
        let model = WeightFile::new(vec![layer]).unwrap();
        let config = RecognizerConfig::default();
        let classifier = KeyPointClassifier::from_weights(model, &config).unwrap();
        let labels = LabelTable::from_labels(["Right", "Left"]).unwrap();
        RecognitionSession::new(classifier, labels, &config).unwrap()
    }

    fn pointing(dx: f32) -> Detection {
        let mut points = [Keypoint::new(100.0, 100.0); 21];
        points[12] = Keypoint::new(100.0 + dx, 60.0);
        Detection::new(LandmarkList::from_slice(&points).unwrap(), Handedness::Right)
    }

    fn frames(dxs: &[Option<f32>]) -> Vec<Result<Frame>> {
        dxs.iter()
            .enumerate()
            .map(|(i, dx)| Ok(Frame::new(i as u64, dx.map(pointing).into_iter().collect())))
            .collect()
    }

    #[test]
    fn test_run_to_end() {
        let mut session = session();
        let mut presenter = MemoryPresenter::new();
        let summary = run(
            &mut session,
            frames(&[Some(30.0), None, Some(-30.0)]),
            &mut presenter,
            None,
        )
        .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.hands, 2);
        assert_eq!(summary.recognized, 2);
        assert_eq!(summary.word.as_deref(), Some("Left"));
        assert_eq!(presenter.words(), ["Right", "Left"]);
        assert!(presenter.started && presenter.stopped);
        assert_eq!(session.status(), SessionStatus::Stopped);
    }

    #[test]
    fn test_frame_limit() {
        let mut session = session();
        let mut presenter = MemoryPresenter::new();
        let summary = run(
            &mut session,
            frames(&[Some(30.0), Some(-30.0), Some(-30.0)]),
            &mut presenter,
            Some(1),
        )
        .unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.word.as_deref(), Some("Right"));
    }

    #[test]
    fn test_frame_limit_stops_pulling() {
        let mut session = session();
        let mut presenter = MemoryPresenter::new();
        let pulled = Cell::new(0);
        let source = frames(&[Some(30.0), Some(-30.0), Some(-30.0)])
            .into_iter()
            .inspect(|_| pulled.set(pulled.get() + 1));
        let summary = run(&mut session, source, &mut presenter, Some(2)).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(pulled.get(), 2);

        let summary = run(&mut session, frames(&[Some(30.0)]), &mut presenter, Some(0)).unwrap();
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.word.as_deref(), Some("Left"));
    }

    #[test]
    fn test_source_error_still_stops_presenter() {
        let mut session = session();
        let mut presenter = MemoryPresenter::new();
        let mut input = frames(&[Some(30.0)]);
        input.push(Err(RecognitionError::SourceError("line 2: bad".to_string())));
        input.extend(frames(&[Some(-30.0)]));

        let err = run(&mut session, input, &mut presenter, None).unwrap_err();
        assert!(matches!(err, RecognitionError::SourceError(_)));
        assert!(presenter.stopped);
        assert_eq!(presenter.results.len(), 1);
        assert_eq!(session.word(), Some("Right"));
    }
}
