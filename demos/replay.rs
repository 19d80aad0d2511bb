// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Example script replaying captured hand landmarks through the recognizer.
//!
//! Usage:
//!     cargo run --example replay -- session.jsonl [model.kpcw] [labels.csv]

use std::env;

use handsign_inference::cli::args::{DEFAULT_LABELS, DEFAULT_MODEL};
use handsign_inference::runner;
use handsign_inference::{
    ConsolePresenter, DetectorConfig, RecognitionSession, RecognizerConfig, ReplaySource, Result,
    WordPolicy,
};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(replay) = args.next() else {
        eprintln!("usage: replay <session.jsonl> [model.kpcw] [labels.csv]");
        std::process::exit(2);
    };
    let model = args.next().unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let labels = args.next().unwrap_or_else(|| DEFAULT_LABELS.to_string());

    // Spell words by holding each gesture for half a second at 30 fps.
    let config = RecognizerConfig::new()
        .with_min_confidence(0.5)
        .with_word_policy(WordPolicy::spell(15));
    let mut session = RecognitionSession::load(&model, &labels, &config)?;

    let source = ReplaySource::open(&replay, DetectorConfig::default().with_max_num_hands(2))?;
    let mut presenter = ConsolePresenter::new();
    let summary = runner::run(&mut session, source, &mut presenter, None)?;

    println!(
        "{} frames, final word: {}",
        summary.frames,
        summary.word.unwrap_or_default()
    );
    Ok(())
}
