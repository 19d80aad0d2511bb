// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use crate::cli::args::{InspectArgs, RecognizeArgs};
use crate::cli::logging::set_verbose;
use crate::presenter::ConsolePresenter;
use crate::runner::{self, RunSummary};
use crate::source::ReplaySource;
use crate::weights::WeightFile;
use crate::{
    DetectorConfig, KeyPointClassifier, LabelTable, RecognitionSession, RecognizerConfig, Result,
    VERSION, WordPolicy,
};
use crate::{error, info, section, verbose};

/// Run gesture recognition over a landmark replay.
pub fn run_recognition(args: &RecognizeArgs) {
    set_verbose(args.verbose);
    match recognize(args) {
        Ok(summary) => {
            verbose!(
                "Speed: {:.2}ms preprocess, {:.2}ms inference, {:.2}ms postprocess per frame",
                summary.speed.preprocess.unwrap_or(0.0),
                summary.speed.inference.unwrap_or(0.0),
                summary.speed.postprocess.unwrap_or(0.0)
            );
            info!(
                "Recognized Word: {}",
                summary.word.as_deref().unwrap_or_default()
            );
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

fn recognize(args: &RecognizeArgs) -> Result<RunSummary> {
    let config = recognizer_config(args);
    let mut session = RecognitionSession::load(&args.model, &args.labels, &config)?;

    println!(
        "Handsign {VERSION} 🚀 {} backend, {} gestures",
        session.classifier().backend(),
        session.labels().len()
    );
    verbose!("Word policy: {}", policy_name(config.word_policy));

    let source = ReplaySource::open(&args.source, config.detector.clone())?;

    let mut presenter = ConsolePresenter::new();
    let summary = runner::run(&mut session, source, &mut presenter, args.max_frames)?;
    verbose!(
        "{} frames, {} hands, {} recognized",
        summary.frames,
        summary.hands,
        summary.recognized
    );
    Ok(summary)
}

fn recognizer_config(args: &RecognizeArgs) -> RecognizerConfig {
    let detector = DetectorConfig::new()
        .with_max_num_hands(args.max_num_hands)
        .with_min_detection_confidence(args.min_detection_confidence);
    let mut config = RecognizerConfig::new()
        .with_threads(args.threads)
        .with_detector(detector);
    if let Some(conf) = args.min_confidence {
        config = config.with_min_confidence(conf);
    }
    if let Some(frames) = args.spell {
        config = config.with_word_policy(WordPolicy::spell(frames));
    }
    config
}

fn policy_name(policy: WordPolicy) -> String {
    match policy {
        WordPolicy::Replace => "replace".to_string(),
        WordPolicy::Spell { hold_frames } => format!("spell (hold {hold_frames} frames)"),
    }
}

/// Print the classifier layout and label table.
pub fn run_inspect(args: &InspectArgs) {
    if let Err(e) = inspect(args) {
        error!("{e}");
        process::exit(1);
    }
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let labels = LabelTable::load(&args.labels)?;

    section!("Model: {}", args.model);
    if args.model.ends_with(".onnx") {
        let classifier = KeyPointClassifier::load(&args.model)?;
        info!("backend: {}", classifier.backend());
        info!("classes: {}", classifier.num_classes());
    } else {
        let weights = WeightFile::load(&args.model)?;
        for (i, layer) in weights.layers().iter().enumerate() {
            info!(
                "layer {i}: {} -> {} {}",
                layer.in_dim(),
                layer.out_dim(),
                layer.activation
            );
        }
        info!(
            "classes: {}, parameters: {}",
            weights.num_classes(),
            weights.num_parameters()
        );
    }

    section!("Labels: {}", args.labels);
    for (i, label) in labels.iter().enumerate() {
        info!("{i:>3}  {label}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Commands};
    use clap::Parser;

    fn parse(argv: &[&str]) -> RecognizeArgs {
        match Cli::parse_from(argv).command {
            Commands::Recognize(args) => args,
            Commands::Inspect(_) => panic!("expected recognize"),
        }
    }

    #[test]
    fn test_recognizer_config_from_args() {
        let config = recognizer_config(&parse(&["app", "recognize", "-s", "r.jsonl"]));
        assert!(config.min_confidence.is_none());
        assert_eq!(config.word_policy, WordPolicy::Replace);

        let args = parse(&[
            "app",
            "recognize",
            "-s",
            "r.jsonl",
            "--min-confidence",
            "0.5",
            "--spell",
            "0",
            "--max-num-hands",
            "2",
        ]);
        let config = recognizer_config(&args);
        assert_eq!(config.min_confidence, Some(0.5));
        assert_eq!(config.word_policy, WordPolicy::Spell { hold_frames: 1 });
        assert_eq!(config.detector.max_num_hands, 2);
    }

    #[test]
    fn test_policy_name() {
        assert_eq!(policy_name(WordPolicy::Replace), "replace");
        assert_eq!(policy_name(WordPolicy::spell(3)), "spell (hold 3 frames)");
    }

    #[test]
    fn test_recognize_missing_model_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("missing.kpcw");
        let labels = dir.path().join("labels.csv");
        std::fs::write(&labels, "Hello\n").unwrap();
        let args = parse(&[
            "app",
            "recognize",
            "-m",
            model.to_str().unwrap(),
            "-l",
            labels.to_str().unwrap(),
            "-s",
            "r.jsonl",
        ]);
        assert!(recognize(&args).unwrap_err().is_config());
    }
}
