//! CLI Command Implementations
//!
//! Maps a prediction attempt onto the single line the binary prints.

use std::fmt;
use std::path::Path;

use log::info;

use crate::config::AnalysisConfig;
use crate::predict::predict_emotion;

/// What the binary reports on stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Predicted label
    Label(String),
    FileNotFound,
    PredictionFailed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Label(label) => f.write_str(label),
            Outcome::FileNotFound => f.write_str("ERROR: File not found"),
            Outcome::PredictionFailed => f.write_str("ERROR: Prediction failed"),
        }
    }
}

/// Classify one audio file.
///
/// Never fails: the cause of a failed prediction is logged by
/// [`predict_emotion`] and collapsed into [`Outcome::PredictionFailed`].
pub fn predict(audio: &Path, model_dir: &Path, config: &AnalysisConfig) -> Outcome {
    if !audio.is_file() {
        info!("Input not found: {}", audio.display());
        return Outcome::FileNotFound;
    }

    match predict_emotion(audio, model_dir, config) {
        Ok(prediction) => Outcome::Label(prediction.label),
        Err(_) => Outcome::PredictionFailed,
    }
}
