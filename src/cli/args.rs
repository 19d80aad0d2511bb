// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// Default classifier weights.
pub const DEFAULT_MODEL: &str = "model/keypoint_classifier/keypoint_classifier.kpcw";

/// Default label table.
pub const DEFAULT_LABELS: &str = "model/keypoint_classifier/keypoint_classifier_label.csv";

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Recognize Options:
    --model, -m <MODEL>        Classifier weights (.kpcw, or .onnx with --features onnx)
    --labels, -l <LABELS>      Label CSV, one gesture per row
    --source, -s <SOURCE>      JSON Lines replay of hand landmarks
    --min-confidence <CONF>    Abstain below this top-1 probability
    --max-num-hands <N>        Hands considered per frame [default: 1]
    --spell <FRAMES>           Append held gestures instead of replacing the word
    --verbose                  Show verbose output

Examples:
    handsign-inference recognize --source session.jsonl
    handsign-inference recognize -s session.jsonl --min-confidence 0.6
    handsign-inference recognize -s session.jsonl --spell 15 --max-num-hands 2
    handsign-inference inspect --model keypoint_classifier.kpcw"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize gestures from a landmark replay
    Recognize(RecognizeArgs),
    /// Print a summary of the classifier and its labels
    Inspect(InspectArgs),
}

/// Arguments for the recognize command.
#[derive(Args, Debug)]
pub struct RecognizeArgs {
    /// Path to classifier weights
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Path to the label CSV
    #[arg(short, long, default_value = DEFAULT_LABELS)]
    pub labels: String,

    /// JSON Lines replay of detector output
    #[arg(short, long)]
    pub source: String,

    /// Minimum top-1 probability; lower scoring hands are not recognized
    #[arg(long)]
    pub min_confidence: Option<f32>,

    /// Maximum number of hands per frame
    #[arg(long, default_value_t = 1)]
    pub max_num_hands: usize,

    /// Minimum detector score for a hand to be classified
    #[arg(long, default_value_t = 0.7)]
    pub min_detection_confidence: f32,

    /// Spell mode: append a gesture after it is held for this many frames
    #[arg(long, value_name = "FRAMES")]
    pub spell: Option<u32>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Intra-op threads for the ONNX backend (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the inspect command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to classifier weights
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Path to the label CSV
    #[arg(short, long, default_value = DEFAULT_LABELS)]
    pub labels: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_recognize_args_defaults() {
        let args = Cli::parse_from(["app", "recognize", "--source", "replay.jsonl"]);
        match args.command {
            Commands::Recognize(recognize_args) => {
                assert_eq!(recognize_args.model, DEFAULT_MODEL);
                assert_eq!(recognize_args.labels, DEFAULT_LABELS);
                assert_eq!(recognize_args.source, "replay.jsonl");
                assert!(recognize_args.min_confidence.is_none());
                assert_eq!(recognize_args.max_num_hands, 1);
                assert!((recognize_args.min_detection_confidence - 0.7).abs() < f32::EPSILON);
                assert!(recognize_args.spell.is_none());
                assert!(recognize_args.max_frames.is_none());
                assert!(recognize_args.verbose);
            }
            Commands::Inspect(_) => panic!("expected recognize"),
        }
    }

    #[test]
    fn test_recognize_args_custom() {
        let args = Cli::parse_from([
            "app",
            "recognize",
            "-m",
            "custom.kpcw",
            "-l",
            "labels.csv",
            "-s",
            "replay.jsonl",
            "--min-confidence",
            "0.6",
            "--spell",
            "12",
            "--max-num-hands",
            "2",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Recognize(recognize_args) => {
                assert_eq!(recognize_args.model, "custom.kpcw");
                assert_eq!(recognize_args.labels, "labels.csv");
                assert_eq!(recognize_args.min_confidence, Some(0.6));
                assert_eq!(recognize_args.spell, Some(12));
                assert_eq!(recognize_args.max_num_hands, 2);
                assert!(!recognize_args.verbose);
            }
            Commands::Inspect(_) => panic!("expected recognize"),
        }
    }

    #[test]
    fn test_recognize_requires_source() {
        assert!(Cli::try_parse_from(["app", "recognize"]).is_err());
    }

    #[test]
    fn test_inspect_args_defaults() {
        let args = Cli::parse_from(["app", "inspect"]);
        match args.command {
            Commands::Inspect(inspect_args) => {
                assert_eq!(inspect_args.model, DEFAULT_MODEL);
                assert_eq!(inspect_args.labels, DEFAULT_LABELS);
            }
            Commands::Recognize(_) => panic!("expected inspect"),
        }
    }
}
