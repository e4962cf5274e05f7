//! Per-feature standardisation

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{corrupt, Artifact, SCALER_FILE};
use crate::error::{Result, TonoError};

fn default_true() -> bool {
    true
}

/// Standardises each feature by a fitted mean and scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean
    pub mean: Vec<f64>,

    /// Per-feature standard deviation (zero-variance features stored as 1.0)
    #[serde(default)]
    pub scale: Vec<f64>,

    #[serde(default = "default_true")]
    pub with_mean: bool,

    #[serde(default = "default_true")]
    pub with_std: bool,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        }
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardise every row of `x`
    ///
    /// # Errors
    /// * `ShapeMismatch` - If `x` does not have [`Self::n_features`] columns
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(TonoError::ShapeMismatch {
                stage: "scaler",
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }

        let mut out = x.to_owned();
        if self.with_mean {
            out -= &ArrayView1::from(&self.mean[..]);
        }
        if self.with_std {
            out /= &ArrayView1::from(&self.scale[..]);
        }
        Ok(out)
    }
}

impl Artifact for StandardScaler {
    const FILE_NAME: &'static str = SCALER_FILE;

    fn validate(&self) -> Result<()> {
        if self.mean.is_empty() {
            return Err(corrupt(SCALER_FILE, "mean is empty"));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(corrupt(SCALER_FILE, "mean contains non-finite values"));
        }
        if self.with_std {
            if self.scale.len() != self.mean.len() {
                return Err(corrupt(
                    SCALER_FILE,
                    format!(
                        "scale has {} entries but mean has {}",
                        self.scale.len(),
                        self.mean.len()
                    ),
                ));
            }
            if self.scale.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
                return Err(corrupt(SCALER_FILE, "scale must be finite and positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_transform_standardises() {
        let scaler = StandardScaler::new(vec![1.0, -2.0], vec![2.0, 0.5]);
        let out = scaler.transform(&array![[3.0, -2.0], [1.0, -1.0]]).unwrap();

        assert_abs_diff_eq!(out[[0, 0]], 1.0);
        assert_abs_diff_eq!(out[[0, 1]], 0.0);
        assert_abs_diff_eq!(out[[1, 0]], 0.0);
        assert_abs_diff_eq!(out[[1, 1]], 2.0);
    }

    #[test]
    fn test_flags_disable_steps() {
        let mut scaler = StandardScaler::new(vec![1.0], vec![2.0]);
        scaler.with_mean = false;
        assert_abs_diff_eq!(scaler.transform(&array![[4.0]]).unwrap()[[0, 0]], 2.0);

        scaler.with_mean = true;
        scaler.with_std = false;
        assert_abs_diff_eq!(scaler.transform(&array![[4.0]]).unwrap()[[0, 0]], 3.0);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]);
        let err = scaler.transform(&Array2::zeros((1, 94))).unwrap_err();
        assert!(matches!(
            err,
            TonoError::ShapeMismatch {
                stage: "scaler",
                expected: 3,
                actual: 94
            }
        ));
    }

    #[test]
    fn test_flags_default_to_true() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean": [0.0], "scale": [1.0]}"#).unwrap();
        assert!(scaler.with_mean && scaler.with_std);
    }

    #[test]
    fn test_validate_rejects_bad_scale() {
        assert!(StandardScaler::new(vec![0.0, 0.0], vec![1.0]).validate().is_err());
        assert!(StandardScaler::new(vec![0.0], vec![0.0]).validate().is_err());
        assert!(StandardScaler::new(vec![], vec![]).validate().is_err());
        assert!(StandardScaler::new(vec![0.0], vec![1.0]).validate().is_ok());
    }
}
