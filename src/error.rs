//! Error handling for Tono
//!
//! Every error carries a stable code and recovery suggestions so the CLI
//! can keep its user-facing output fixed while the log explains the cause.

use thiserror::Error;

/// Result type alias for Tono operations
pub type Result<T> = std::result::Result<T, TonoError>;

/// Main error type for Tono operations
#[derive(Error, Debug)]
pub enum TonoError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Resampling failed: {reason}")]
    Resample { reason: String },

    // Feature Errors
    #[error("Feature extraction error: {reason}")]
    ProcessingError { reason: String },

    // Model Errors
    #[error("Model not trained: missing {}", missing.join(", "))]
    ModelNotTrained { missing: Vec<String> },

    #[error("Corrupt model artifact {artifact}: {reason}")]
    CorruptArtifact { artifact: String, reason: String },

    #[error("Shape mismatch in {stage}: expected {expected} features, got {actual}")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Non-finite values produced by {stage}")]
    NonFinite { stage: &'static str },

    #[error("Unknown class code {code} (label encoder knows {known} classes)")]
    UnknownClassCode { code: i64, known: usize },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TonoError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TonoError::FileNotFound { .. } => "FILE_NOT_FOUND",
            TonoError::InvalidAudio { .. } => "INVALID_AUDIO",
            TonoError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            TonoError::EmptyAudio => "EMPTY_AUDIO",
            TonoError::Resample { .. } => "RESAMPLE_ERROR",
            TonoError::ProcessingError { .. } => "PROCESSING_ERROR",
            TonoError::ModelNotTrained { .. } => "MODEL_NOT_TRAINED",
            TonoError::CorruptArtifact { .. } => "CORRUPT_ARTIFACT",
            TonoError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            TonoError::NonFinite { .. } => "NON_FINITE",
            TonoError::UnknownClassCode { .. } => "UNKNOWN_CLASS_CODE",
            TonoError::Io(_) => "IO_ERROR",
            TonoError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the failure came from the audio side rather than the model side
    pub fn is_audio_error(&self) -> bool {
        matches!(
            self,
            TonoError::FileNotFound { .. }
                | TonoError::InvalidAudio { .. }
                | TonoError::UnsupportedFormat { .. }
                | TonoError::EmptyAudio
                | TonoError::Resample { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TonoError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            TonoError::InvalidAudio { .. } | TonoError::EmptyAudio => vec![
                "Try converting the file to WAV format first",
                "Check if the file plays in another application",
            ],
            TonoError::UnsupportedFormat { .. } => vec![
                "Convert to WAV, FLAC or MP3",
                "Integer WAV files must be 8, 16, 24 or 32-bit",
            ],
            TonoError::ModelNotTrained { .. } => vec![
                "Train the model first and export its artifacts",
                "Pass the artifact directory with --model_dir",
            ],
            TonoError::CorruptArtifact { .. } | TonoError::Serialization(_) => vec![
                "Re-export the model artifacts from the training run",
            ],
            TonoError::NonFinite { .. } => vec![
                "Check the input features for NaN or infinite values",
                "Re-export the model artifacts if the input is finite",
            ],
            TonoError::ShapeMismatch { .. } | TonoError::UnknownClassCode { .. } => vec![
                "The artifacts were not exported from the same training run",
                "Re-export all four artifacts together",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = TonoError::FileNotFound {
            path: "test.wav".to_string(),
            source: None,
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert!(err.is_audio_error());
    }

    #[test]
    fn test_model_not_trained_lists_files() {
        let err = TonoError::ModelNotTrained {
            missing: vec!["pca.json".to_string(), "model.json".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Model not trained: missing pca.json, model.json"
        );
        assert!(!err.is_audio_error());
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = TonoError::ShapeMismatch {
            stage: "scaler",
            expected: 94,
            actual: 54,
        };
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
        assert!(err.to_string().contains("expected 94 features, got 54"));
    }

    #[test]
    fn test_non_finite_is_a_model_side_error() {
        let err = TonoError::NonFinite {
            stage: "classifier",
        };
        assert_eq!(err.error_code(), "NON_FINITE");
        assert_eq!(err.to_string(), "Non-finite values produced by classifier");
        assert!(!err.is_audio_error());
        assert!(!err.recovery_suggestions().is_empty());
    }
}
