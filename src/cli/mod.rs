//! CLI Module
//!
//! Command-line interface for Tono emotion prediction.

pub mod commands;

use clap::Parser;
use std::path::PathBuf;

/// Tono - predict the emotion of an audio clip
#[derive(Parser, Debug)]
#[command(name = "tono")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Audio file to classify
    pub audio_path: PathBuf,

    /// Directory holding model.json, scaler.json, pca.json and label_encoder.json
    #[arg(long = "model_dir", default_value = "model")]
    pub model_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dir_defaults() {
        let cli = Cli::try_parse_from(["tono", "clip.wav"]).unwrap();
        assert_eq!(cli.audio_path, PathBuf::from("clip.wav"));
        assert_eq!(cli.model_dir, PathBuf::from("model"));
    }

    #[test]
    fn test_model_dir_flag() {
        let cli = Cli::try_parse_from(["tono", "clip.wav", "--model_dir", "/opt/models"]).unwrap();
        assert_eq!(cli.model_dir, PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_audio_path_is_required() {
        assert!(Cli::try_parse_from(["tono"]).is_err());
    }
}
