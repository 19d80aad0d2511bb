// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::Parser;

use handsign_inference::cli::args::{Cli, Commands};
use handsign_inference::cli::recognize::{run_inspect, run_recognition};

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Recognize(args) => run_recognition(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}
