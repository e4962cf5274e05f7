//! Analysis configuration
//!
//! Frame, FFT and band parameters shared by decoding and feature extraction.
//! The defaults match the configuration the shipped model artifacts were
//! trained against; changing them produces vectors the models were never fit on.

use serde::{Deserialize, Serialize};

/// Sample rate every signal is resampled to before analysis
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Seconds of audio analysed per file
pub const DEFAULT_MAX_DURATION_SECS: f64 = 5.0;

/// Parameters for signal loading and feature extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis sample rate in Hz (default: 22050)
    pub sample_rate: u32,
    /// Maximum seconds read from the start of the file (default: 5.0)
    pub max_duration_secs: f64,
    /// FFT size and frame length (default: 2048)
    pub n_fft: usize,
    /// Hop between frames (default: 512)
    pub hop_length: usize,
    /// Number of cepstral coefficients (default: 20)
    pub n_mfcc: usize,
    /// Number of mel bands feeding the cepstrum (default: 128)
    pub n_mels: usize,
    /// Chroma bins per octave (default: 12)
    pub n_chroma: usize,
    /// Octave bands for spectral contrast (default: 6)
    pub contrast_bands: usize,
    /// Lower edge of the first contrast octave in Hz (default: 200)
    pub contrast_fmin: f64,
    /// Fraction of a band used for peak/valley estimation (default: 0.02)
    pub contrast_quantile: f64,
    /// Energy fraction below the rolloff frequency (default: 0.85)
    pub rolloff_percent: f64,
    /// Dynamic range floor for dB conversion (default: 80)
    pub top_db: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            n_fft: 2048,
            hop_length: 512,
            n_mfcc: 20,
            n_mels: 128,
            n_chroma: 12,
            contrast_bands: 6,
            contrast_fmin: 200.0,
            contrast_quantile: 0.02,
            rolloff_percent: 0.85,
            top_db: 80.0,
        }
    }
}

impl AnalysisConfig {
    /// Override the duration cap
    pub fn with_max_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Override the analysis sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Number of frequency bins in a one-sided spectrum
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Maximum number of samples read at the given native rate
    pub fn max_samples_at(&self, native_rate: u32) -> usize {
        (self.max_duration_secs * native_rate as f64) as usize
    }
}
