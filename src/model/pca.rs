//! Linear dimensionality reduction

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{corrupt, Artifact, PCA_FILE};
use crate::error::{Result, TonoError};

/// Principal component projection fitted during training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Per-feature mean removed before projecting
    pub mean: Vec<f64>,

    /// Principal axes, one row per component
    pub components: Vec<Vec<f64>>,

    /// Variance explained by each component; required when whitening
    #[serde(default)]
    pub explained_variance: Option<Vec<f64>>,

    #[serde(default)]
    pub whiten: bool,
}

impl Pca {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Project every row of `x` onto the principal axes
    ///
    /// # Returns
    /// A matrix of shape (rows, [`Self::n_components`])
    ///
    /// # Errors
    /// * `ShapeMismatch` - If `x` does not have [`Self::n_features`] columns
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(TonoError::ShapeMismatch {
                stage: "pca",
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }

        let components = Array2::from_shape_fn((self.n_components(), self.n_features()), |(i, j)| {
            self.components[i][j]
        });
        let centred = x - &ArrayView1::from(&self.mean[..]);
        let mut projected = centred.dot(&components.t());

        if self.whiten {
            if let Some(variance) = &self.explained_variance {
                let std = ArrayView1::from(&variance[..]).mapv(f64::sqrt);
                projected /= &std;
            }
        }

        Ok(projected)
    }
}

impl Artifact for Pca {
    const FILE_NAME: &'static str = PCA_FILE;

    fn validate(&self) -> Result<()> {
        if self.mean.is_empty() || self.components.is_empty() {
            return Err(corrupt(PCA_FILE, "mean and components must not be empty"));
        }
        if let Some(row) = self
            .components
            .iter()
            .position(|row| row.len() != self.mean.len())
        {
            return Err(corrupt(
                PCA_FILE,
                format!(
                    "component {} has {} entries, expected {}",
                    row,
                    self.components[row].len(),
                    self.mean.len()
                ),
            ));
        }

        match (&self.explained_variance, self.whiten) {
            (Some(variance), _) if variance.len() != self.components.len() => Err(corrupt(
                PCA_FILE,
                format!(
                    "explained_variance has {} entries for {} components",
                    variance.len(),
                    self.components.len()
                ),
            )),
            (Some(variance), true) if variance.iter().any(|&v| !(v > 0.0)) => Err(corrupt(
                PCA_FILE,
                "explained_variance must be positive when whitening",
            )),
            (None, true) => Err(corrupt(PCA_FILE, "whitening requires explained_variance")),
            _ => Ok(()),
        }
    }
}
