//! Feature Extraction
//!
//! Turns an audio file into the fixed-width vector the model artifacts were
//! trained on. The order of the statistics is part of that contract:
//!
//! | Values | Source |
//! |---|---|
//! | 0-1 | zero-crossing rate (mean, std) |
//! | 2-3 | RMS energy (mean, std) |
//! | 4-5 | spectral centroid (mean, std) |
//! | 6-7 | spectral bandwidth (mean, std) |
//! | 8-9 | spectral contrast (mean, std of frame means) |
//! | 10-11 | spectral rolloff (mean, std) |
//! | 12-51 | MFCC 0..19 (mean, std each) |
//! | 52-53 | chroma (mean, std of frame means) |
//! | 54-93 | zero padding |

pub mod chroma;
pub mod frames;
pub mod mel;
pub mod spectral;
pub mod temporal;

use std::path::Path;

use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};

use crate::audio::{load_signal, Signal};
use crate::config::AnalysisConfig;
use crate::error::{Result, TonoError};
use frames::{fft_frequencies, Spectrogram};

/// Width of every feature vector
pub const FEATURE_COUNT: usize = 94;

/// Exactly [`FEATURE_COUNT`] summary statistics of one clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// All-zero vector, used when a clip cannot be analysed
    pub fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    /// Fit any number of values into the fixed width
    ///
    /// Values past [`FEATURE_COUNT`] are dropped; missing ones are zero.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value;
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// True if every value is zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Single-sample matrix (1 x [`FEATURE_COUNT`]) for the model pipeline
    pub fn to_row(&self) -> Array2<f64> {
        Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| self.0[j])
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

/// Extract features from an audio file, never failing
///
/// Any decoding or analysis error is logged and yields [`FeatureVector::zeros`].
///
/// # Arguments
/// * `path` - Audio file to analyse
/// * `config` - Analysis configuration
pub fn extract_features(path: &Path, config: &AnalysisConfig) -> FeatureVector {
    match try_extract_features(path, config) {
        Ok(features) => features,
        Err(e) => {
            warn!("Error extracting features from {}: {}", path.display(), e);
            FeatureVector::zeros()
        }
    }
}

/// Extract features from an audio file, reporting why extraction failed
pub fn try_extract_features(path: &Path, config: &AnalysisConfig) -> Result<FeatureVector> {
    let signal = load_signal(path, config)?;
    extract_from_signal(&signal, config)
}

/// Extract features from an already decoded signal
///
/// # Errors
/// * `EmptyAudio` - If the signal has no samples
/// * `InvalidAudio` - If any sample is NaN or infinite
/// * `ProcessingError` - If the configuration cannot be applied to the signal
pub fn extract_from_signal(signal: &Signal, config: &AnalysisConfig) -> Result<FeatureVector> {
    if signal.is_empty() {
        return Err(TonoError::EmptyAudio);
    }
    if let Some(pos) = signal.samples().iter().position(|s| !s.is_finite()) {
        return Err(TonoError::InvalidAudio {
            reason: format!("non-finite sample at index {}", pos),
            source: None,
        });
    }

    let sr = signal.sample_rate();
    let samples = signal.samples();
    let (n_fft, hop) = (config.n_fft, config.hop_length);

    let mut values = Vec::with_capacity(FEATURE_COUNT);

    // Temporal
    push_mean_std(&mut values, &temporal::zero_crossing_rate(samples, n_fft, hop))?;
    push_mean_std(&mut values, &temporal::rms(samples, n_fft, hop))?;

    // Spectral
    let spec = Spectrogram::compute(samples, n_fft, hop)?;
    let freqs = fft_frequencies(sr, n_fft);
    let magnitude = spec.magnitude();

    let centroid = spectral::spectral_centroid(magnitude, &freqs);
    push_mean_std(&mut values, &centroid)?;
    push_mean_std(
        &mut values,
        &spectral::spectral_bandwidth(magnitude, &freqs, &centroid),
    )?;

    let contrast = spectral::spectral_contrast(
        magnitude,
        &freqs,
        sr,
        config.contrast_bands,
        config.contrast_fmin,
        config.contrast_quantile,
        config.top_db,
    )?;
    push_matrix_stats(&mut values, &contrast)?;

    push_mean_std(
        &mut values,
        &spectral::spectral_rolloff(magnitude, &freqs, config.rolloff_percent),
    )?;

    // MFCCs
    let power = spec.power();
    let mfcc = mel::mfcc(&power, sr, config.n_mfcc, config.n_mels, config.top_db);
    for row in mfcc.rows() {
        push_mean_std(&mut values, &row.to_owned())?;
    }

    let chroma = chroma::chroma_stft(&power, sr, config.n_chroma);
    push_matrix_stats(&mut values, &chroma)?;

    debug!(
        "Computed {} feature values over {} frames ({:.2}s)",
        values.len(),
        spec.n_frames(),
        signal.duration_secs()
    );

    Ok(FeatureVector::from_values(values))
}

// ============================================================================
// Statistics
// ============================================================================

fn no_frames() -> TonoError {
    TonoError::ProcessingError {
        reason: "feature has no frames".to_string(),
    }
}

/// Append the mean and population standard deviation of a per-frame series
fn push_mean_std(values: &mut Vec<f64>, series: &Array1<f64>) -> Result<()> {
    let mean = series.mean().ok_or_else(no_frames)?;
    values.push(mean);
    values.push(series.std(0.0));
    Ok(())
}

/// Append the overall mean of a (rows, frames) matrix and the standard
/// deviation of its per-frame means
fn push_matrix_stats(values: &mut Vec<f64>, matrix: &Array2<f64>) -> Result<()> {
    let mean = matrix.mean().ok_or_else(no_frames)?;
    let frame_means = matrix.mean_axis(Axis(0)).ok_or_else(no_frames)?;
    values.push(mean);
    values.push(frame_means.std(0.0));
    Ok(())
}
