//! Mel filterbank and cepstral coefficients
//!
//! Slaney-style mel scale (linear below 1 kHz, logarithmic above) with
//! area-normalised triangular filters, a dB conversion, and an orthonormal
//! DCT-II over the mel axis.

use ndarray::Array2;

use super::frames::fft_frequencies;
use super::spectral::power_to_db;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

#[inline]
fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
#[inline]
pub fn hz_to_mel(freq: f64) -> f64 {
    if freq >= MIN_LOG_HZ {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / log_step()
    } else {
        freq / F_SP
    }
}

/// Convert Slaney mels to Hz
#[inline]
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters spanning `fmin..fmax`
///
/// # Returns
/// Weights of shape (`n_mels`, `n_fft / 2 + 1`)
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f64,
    fmax: f64,
) -> Array2<f64> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);

    let min_mel = hz_to_mel(fmin);
    let max_mel = hz_to_mel(fmax);
    let mel_freqs: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::zeros((n_mels, fft_freqs.len()));
    for m in 0..n_mels {
        let (left, centre, right) = (mel_freqs[m], mel_freqs[m + 1], mel_freqs[m + 2]);
        let enorm = 2.0 / (right - left);

        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (centre - left);
            let upper = (right - f) / (right - centre);
            weights[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }

    weights
}

/// Orthonormal DCT-II basis, truncated to the first `n_out` coefficients
///
/// # Returns
/// Basis of shape (`n_out`, `n_in`)
pub fn dct_basis(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}

/// Mel-frequency cepstral coefficients of a power spectrogram
///
/// # Arguments
/// * `power` - |X|² of shape (bins, frames)
/// * `sample_rate` - Rate the spectrogram was computed at
/// * `n_mfcc` - Coefficients to keep
/// * `n_mels` - Mel bands between 0 Hz and Nyquist
/// * `top_db` - Dynamic range kept by the dB conversion
///
/// # Returns
/// Coefficients of shape (`n_mfcc`, frames)
pub fn mfcc(
    power: &Array2<f64>,
    sample_rate: u32,
    n_mfcc: usize,
    n_mels: usize,
    top_db: f64,
) -> Array2<f64> {
    let n_fft = 2 * (power.nrows() - 1);
    let filters = mel_filterbank(sample_rate, n_fft, n_mels, 0.0, sample_rate as f64 / 2.0);

    let mel = filters.dot(power);
    let log_mel = power_to_db(&mel, Some(top_db));

    dct_basis(n_mfcc, n_mels).dot(&log_mel)
}
