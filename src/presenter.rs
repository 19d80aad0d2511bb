// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Presentation collaborators.

use crate::error::Result;
use crate::results::FrameResult;
use crate::session::SessionStatus;
use crate::{info, section, success, verbose};

/// Receives one [`FrameResult`] per processed frame.
pub trait Presenter {
    /// Called once before the first frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the presenter cannot be initialized.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Render one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn present(&mut self, result: &FrameResult) -> Result<()>;

    /// Called once after the last frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the presenter fails to shut down cleanly.
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Terminal presenter.
///
/// Prints the recognized word whenever it changes. With verbose output on,
/// every frame is printed along with its per-hand predictions and timing.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    frames: u64,
    changes: u64,
}

impl ConsolePresenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: 0,
            changes: 0,
        }
    }

    /// Number of frames presented so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }
}

impl Presenter for ConsolePresenter {
    fn start(&mut self) -> Result<()> {
        section!("{}", SessionStatus::Running);
        Ok(())
    }

    fn present(&mut self, result: &FrameResult) -> Result<()> {
        self.frames += 1;
        verbose!(
            "frame {}: {}, {:.2}ms",
            result.frame,
            frame_summary(result),
            result.speed.total()
        );
        if result.word_changed {
            self.changes += 1;
            success!("{}", result.word_text());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        section!("{}", SessionStatus::Stopped);
        info!(
            "{} frames, {} word {}",
            self.frames,
            self.changes,
            if self.changes == 1 { "change" } else { "changes" }
        );
        Ok(())
    }
}

/// Keeps every presented frame in memory.
#[derive(Debug, Default)]
pub struct MemoryPresenter {
    pub results: Vec<FrameResult>,
    pub started: bool,
    pub stopped: bool,
}

impl MemoryPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Words in presentation order, collapsing consecutive repeats.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for word in self.results.iter().filter_map(|r| r.word.as_ref()) {
            if words.last() != Some(word) {
                words.push(word.clone());
            }
        }
        words
    }
}

impl Presenter for MemoryPresenter {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn present(&mut self, result: &FrameResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped = true;
        Ok(())
    }
}

/// One-line description of a frame, e.g. `"Right: Predicted Text: Hello 0.97"`.
fn frame_summary(result: &FrameResult) -> String {
    if result.is_empty() {
        return "(no hands)".to_string();
    }
    result
        .hands
        .iter()
        .map(|hand| match hand.confidence {
            Some(conf) if hand.is_recognized() => {
                format!("{}: {} {conf:.2}", hand.handedness, hand.info_text())
            }
            _ => format!("{}: {}", hand.handedness, hand.info_text()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
