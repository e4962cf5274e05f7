//! Tono - Audio Emotion Prediction
//!
//! Tono classifies the emotion of a music clip with a model trained
//! elsewhere:
//! 1. Feature extraction - 94 summary statistics of the first few seconds
//! 2. Prediction - scaler, PCA, classifier and label encoder loaded from
//!    JSON artifacts
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tono::{predict_emotion, AnalysisConfig};
//!
//! let prediction = predict_emotion(
//!     Path::new("clip.wav"),
//!     Path::new("model"),
//!     &AnalysisConfig::default(),
//! )?;
//! println!("{} ({:.2})", prediction.label, prediction.confidence());
//! # Ok::<(), tono::TonoError>(())
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod mood;
pub mod predict;

pub use audio::Signal;
pub use config::AnalysisConfig;
pub use error::{Result, TonoError};
pub use features::{extract_features, try_extract_features, FeatureVector, FEATURE_COUNT};
pub use model::ModelBundle;
pub use mood::Mood;
pub use predict::{predict_emotion, Prediction, Predictor};
