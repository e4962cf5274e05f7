//! Trained model artifacts
//!
//! A model directory holds four JSON artifacts exported from one training
//! run. They are loaded together into a [`ModelBundle`] and applied in the
//! order scaler, PCA, classifier, label encoder.

pub mod classifier;
pub mod encoder;
pub mod pca;
pub mod scaler;

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::{Result, TonoError};
pub use classifier::{Classifier, ClassifierModel};
pub use encoder::LabelEncoder;
pub use pca::Pca;
pub use scaler::StandardScaler;

// ============================================================================
// Artifact files
// ============================================================================

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const PCA_FILE: &str = "pca.json";
pub const ENCODER_FILE: &str = "label_encoder.json";

/// Every artifact a bundle needs, in load order
pub const ARTIFACT_FILES: [&str; 4] = [MODEL_FILE, SCALER_FILE, PCA_FILE, ENCODER_FILE];

/// A deserializable model artifact with its own consistency checks
pub trait Artifact: DeserializeOwned {
    /// File name inside the model directory
    const FILE_NAME: &'static str;

    /// Reject artifacts whose fields disagree with each other
    fn validate(&self) -> Result<()>;
}

pub(crate) fn corrupt(artifact: &str, reason: impl Into<String>) -> TonoError {
    TonoError::CorruptArtifact {
        artifact: artifact.to_string(),
        reason: reason.into(),
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// The four artifacts of one trained pipeline
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub classifier: ClassifierModel,
    pub scaler: StandardScaler,
    pub pca: Pca,
    pub encoder: LabelEncoder,
    fingerprint: String,
}

impl ModelBundle {
    /// Artifact files absent from `dir`
    pub fn missing_artifacts(dir: &Path) -> Vec<&'static str> {
        ARTIFACT_FILES
            .iter()
            .copied()
            .filter(|name| !dir.join(name).is_file())
            .collect()
    }

    /// Load and validate all four artifacts from `dir`
    ///
    /// # Errors
    /// * `ModelNotTrained` - If any artifact file is missing
    /// * `CorruptArtifact` - If an artifact cannot be parsed or is inconsistent
    /// * `UnknownClassCode` - If the classifier predicts codes the encoder cannot name
    pub fn load(dir: &Path) -> Result<Self> {
        let missing = Self::missing_artifacts(dir);
        if !missing.is_empty() {
            return Err(TonoError::ModelNotTrained {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        let mut hasher = Sha256::new();
        let classifier: ClassifierModel = read_artifact(dir, &mut hasher)?;
        let scaler: StandardScaler = read_artifact(dir, &mut hasher)?;
        let pca: Pca = read_artifact(dir, &mut hasher)?;
        let encoder: LabelEncoder = read_artifact(dir, &mut hasher)?;

        let bundle = Self::assemble(classifier, scaler, pca, encoder, hasher)?;

        info!(
            "Loaded {} model bundle from {} ({} classes, {} -> {} features, sha256 {})",
            bundle.classifier.kind(),
            dir.display(),
            bundle.encoder.classes().len(),
            bundle.scaler.n_features(),
            bundle.pca.n_components(),
            bundle.fingerprint
        );

        Ok(bundle)
    }

    /// Build a bundle from in-memory artifacts
    ///
    /// Each artifact is validated as if it had been loaded; the fingerprint
    /// covers their JSON serialization.
    pub fn from_parts(
        classifier: ClassifierModel,
        scaler: StandardScaler,
        pca: Pca,
        encoder: LabelEncoder,
    ) -> Result<Self> {
        classifier.validate()?;
        scaler.validate()?;
        pca.validate()?;
        encoder.validate()?;

        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&classifier)?);
        hasher.update(serde_json::to_vec(&scaler)?);
        hasher.update(serde_json::to_vec(&pca)?);
        hasher.update(serde_json::to_vec(&encoder)?);

        Self::assemble(classifier, scaler, pca, encoder, hasher)
    }

    fn assemble(
        classifier: ClassifierModel,
        scaler: StandardScaler,
        pca: Pca,
        encoder: LabelEncoder,
        hasher: Sha256,
    ) -> Result<Self> {
        for &code in classifier.classes() {
            encoder.inverse_transform(code)?;
        }

        Ok(Self {
            classifier,
            scaler,
            pca,
            encoder,
            fingerprint: format!("{:x}", hasher.finalize()),
        })
    }

    /// SHA-256 over the artifacts in load order, as lowercase hex
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn read_artifact<A: Artifact>(dir: &Path, hasher: &mut Sha256) -> Result<A> {
    let path = dir.join(A::FILE_NAME);
    let bytes = fs::read(&path)?;
    hasher.update(&bytes);

    let artifact: A =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(A::FILE_NAME, e.to_string()))?;
    artifact.validate()?;

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_bundle(dir: &Path) {
        fs::write(
            dir.join(MODEL_FILE),
            r#"{"kind": "logistic_regression", "classes": [0, 1],
                "coef": [[1.0]], "intercept": [0.0]}"#,
        )
        .unwrap();
        fs::write(dir.join(SCALER_FILE), r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#).unwrap();
        fs::write(
            dir.join(PCA_FILE),
            r#"{"mean": [0.0, 0.0], "components": [[1.0, 0.0]]}"#,
        )
        .unwrap();
        fs::write(dir.join(ENCODER_FILE), r#"{"classes": ["calm", "loud"]}"#).unwrap();
    }

    #[test]
    fn test_load_complete_bundle() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path());

        let bundle = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(bundle.encoder.classes(), &["calm".to_string(), "loud".to_string()]);
        assert_eq!(bundle.fingerprint().len(), 64);
    }

    #[test]
    fn test_missing_artifacts_are_listed() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path());
        fs::remove_file(dir.path().join(PCA_FILE)).unwrap();
        fs::remove_file(dir.path().join(ENCODER_FILE)).unwrap();

        assert_eq!(
            ModelBundle::missing_artifacts(dir.path()),
            vec![PCA_FILE, ENCODER_FILE]
        );

        let err = ModelBundle::load(dir.path()).unwrap_err();
        assert_eq!(err.error_code(), "MODEL_NOT_TRAINED");
        assert!(err.to_string().contains("pca.json, label_encoder.json"));
    }

    #[test]
    fn test_fingerprint_follows_contents() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path());
        let first = ModelBundle::load(dir.path()).unwrap();
        let again = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(first.fingerprint(), again.fingerprint());

        fs::write(dir.path().join(ENCODER_FILE), r#"{"classes": ["quiet", "loud"]}"#).unwrap();
        let changed = ModelBundle::load(dir.path()).unwrap();
        assert_ne!(first.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_unparseable_artifact_is_corrupt() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path());
        fs::write(dir.path().join(SCALER_FILE), "not json").unwrap();

        match ModelBundle::load(dir.path()) {
            Err(TonoError::CorruptArtifact { artifact, .. }) => assert_eq!(artifact, SCALER_FILE),
            other => panic!("expected corrupt artifact, got {:?}", other),
        }
    }

    #[test]
    fn test_classes_beyond_encoder_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_bundle(dir.path());
        fs::write(dir.path().join(ENCODER_FILE), r#"{"classes": ["only"]}"#).unwrap();

        let err = ModelBundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, TonoError::UnknownClassCode { code: 1, known: 1 }));
    }
}
