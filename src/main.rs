//! Tono CLI - Audio Emotion Prediction
//!
//! Prints the predicted emotion of one audio file, or a fixed error line.

use clap::Parser;
use env_logger::Env;
use log::debug;

use tono::cli::{commands, Cli};
use tono::AnalysisConfig;

fn main() {
    // Diagnostics go to stderr; stdout carries only the result line
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    debug!("Tono v{}", env!("CARGO_PKG_VERSION"));

    let outcome = commands::predict(&cli.audio_path, &cli.model_dir, &AnalysisConfig::default());
    println!("{}", outcome);
}
