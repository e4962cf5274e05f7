//! Emotion prediction
//!
//! Runs a feature vector through a loaded [`ModelBundle`] and names the
//! winning class.

use std::path::Path;

use log::{debug, error, info};

use crate::config::AnalysisConfig;
use crate::error::{Result, TonoError};
use crate::features::{extract_features, FeatureVector};
use crate::model::{Classifier, ModelBundle};
use crate::mood::Mood;

/// Outcome of one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class name
    pub label: String,

    /// Probability of every class, in label encoder order
    pub probabilities: Vec<(String, f64)>,
}

impl Prediction {
    /// Probability assigned to `label`, if it is a known class
    pub fn probability(&self, label: &str) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|(name, _)| name == label)
            .map(|&(_, p)| p)
    }

    /// Probability of the predicted label
    pub fn confidence(&self) -> f64 {
        self.probability(&self.label).unwrap_or(0.0)
    }

    /// Library mood for the predicted label
    pub fn mood(&self) -> Mood {
        Mood::from_label(&self.label)
    }
}

/// A loaded bundle paired with the analysis settings it was trained with
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: ModelBundle,
    config: AnalysisConfig,
}

impl Predictor {
    pub fn new(bundle: ModelBundle, config: AnalysisConfig) -> Self {
        Self { bundle, config }
    }

    /// Load the bundle in `dir`
    ///
    /// # Errors
    /// Any error from [`ModelBundle::load`]
    pub fn from_dir(dir: &Path, config: AnalysisConfig) -> Result<Self> {
        Ok(Self::new(ModelBundle::load(dir)?, config))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predict the emotion of an audio file
    ///
    /// Unreadable audio degrades to an all-zero feature vector, which is
    /// still classified.
    pub fn predict(&self, audio: &Path) -> Result<Prediction> {
        let features = extract_features(audio, &self.config);
        self.predict_features(&features)
    }

    /// Predict the emotion of an already extracted feature vector
    ///
    /// # Errors
    /// * `ShapeMismatch` - If a stage's width disagrees with its input
    /// * `NonFinite` - If the classifier yields NaN or infinite probabilities
    /// * `UnknownClassCode` - If the winning code has no class name
    pub fn predict_features(&self, features: &FeatureVector) -> Result<Prediction> {
        let bundle = &self.bundle;

        let scaled = bundle.scaler.transform(&features.to_row())?;
        let reduced = bundle.pca.transform(&scaled)?;
        debug!("Reduced {} features to {}", scaled.ncols(), reduced.ncols());

        let proba = bundle.classifier.predict_proba(&reduced)?;
        let row = proba.row(0);
        if row.iter().any(|p| !p.is_finite()) {
            return Err(TonoError::NonFinite {
                stage: "classifier",
            });
        }
        let codes = bundle.classifier.classes();

        let mut best = 0;
        for (i, &p) in row.iter().enumerate() {
            if p > row[best] {
                best = i;
            }
        }
        let label = bundle.encoder.inverse_transform(codes[best])?.to_string();

        let probabilities = bundle
            .encoder
            .classes()
            .iter()
            .enumerate()
            .map(|(code, name)| {
                let p = codes
                    .iter()
                    .position(|&c| c == code as i64)
                    .map_or(0.0, |col| row[col]);
                (name.clone(), p)
            })
            .collect();

        Ok(Prediction {
            label,
            probabilities,
        })
    }
}

/// Load a fresh bundle from `model_dir` and predict the emotion of `audio`
///
/// Failures are logged before being returned.
///
/// # Arguments
/// * `audio` - Audio file to classify
/// * `model_dir` - Directory holding the four model artifacts
/// * `config` - Analysis configuration used for feature extraction
pub fn predict_emotion(
    audio: &Path,
    model_dir: &Path,
    config: &AnalysisConfig,
) -> Result<Prediction> {
    let result = Predictor::from_dir(model_dir, config.clone())
        .and_then(|predictor| {
            let prediction = predictor.predict(audio)?;
            info!(
                "{} -> {} ({:.3}, bundle {})",
                audio.display(),
                prediction.label,
                prediction.confidence(),
                predictor.bundle().fingerprint()
            );
            Ok(prediction)
        });

    if let Err(e) = &result {
        error!("Error during prediction: {} [{}]", e, e.error_code());
        for suggestion in e.recovery_suggestions() {
            debug!("  - {}", suggestion);
        }
    }

    result
}
