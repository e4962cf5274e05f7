//! Framing and short-time Fourier transform
//!
//! All frames are centred: the signal is padded by half a frame on both sides,
//! giving `1 + len / hop` frames for a signal of `len` samples.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Result, TonoError};

/// Pad with `pad` zeros on both sides
pub fn pad_constant(samples: &[f32], pad: usize) -> Vec<f32> {
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.resize(pad, 0.0);
    padded.extend_from_slice(samples);
    padded.resize(samples.len() + 2 * pad, 0.0);
    padded
}

/// Pad by repeating the first and last sample `pad` times
pub fn pad_edge(samples: &[f32], pad: usize) -> Vec<f32> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Vec::new(),
    };

    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.resize(pad, first);
    padded.extend_from_slice(samples);
    padded.resize(samples.len() + 2 * pad, last);
    padded
}

/// Split a padded signal into overlapping frames
///
/// Yields nothing when the signal is shorter than one frame.
pub fn frames(
    padded: &[f32],
    frame_length: usize,
    hop: usize,
) -> impl Iterator<Item = &[f32]> + '_ {
    let n_frames = if frame_length == 0 || hop == 0 || padded.len() < frame_length {
        0
    } else {
        1 + (padded.len() - frame_length) / hop
    };

    (0..n_frames).map(move |t| &padded[t * hop..t * hop + frame_length])
}

/// Periodic Hann window
pub fn hann_window(length: usize) -> Vec<f64> {
    (0..length)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / length as f64).cos())
        .collect()
}

/// Centre frequency of every one-sided FFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    (0..=n_fft / 2)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect()
}

/// Magnitude spectrogram, laid out as (frequency bins, frames)
#[derive(Debug, Clone)]
pub struct Spectrogram {
    magnitude: Array2<f64>,
}

impl Spectrogram {
    /// Compute the centred, Hann-windowed STFT magnitude of a signal
    ///
    /// # Arguments
    /// * `samples` - Mono signal
    /// * `n_fft` - FFT size and frame length
    /// * `hop` - Samples between successive frames
    pub fn compute(samples: &[f32], n_fft: usize, hop: usize) -> Result<Self> {
        if n_fft < 2 || hop == 0 {
            return Err(TonoError::ProcessingError {
                reason: format!("invalid STFT parameters: n_fft={} hop={}", n_fft, hop),
            });
        }

        let padded = pad_constant(samples, n_fft / 2);
        let window = hann_window(n_fft);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(n_fft);

        let n_bins = n_fft / 2 + 1;
        let columns: Vec<&[f32]> = frames(&padded, n_fft, hop).collect();
        if columns.is_empty() {
            return Err(TonoError::ProcessingError {
                reason: format!("signal of {} samples yields no frames", samples.len()),
            });
        }

        let mut magnitude = Array2::zeros((n_bins, columns.len()));
        let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];

        for (t, frame) in columns.iter().enumerate() {
            for ((slot, &sample), &w) in buffer.iter_mut().zip(frame.iter()).zip(&window) {
                *slot = Complex::new(sample as f64 * w, 0.0);
            }
            fft.process(&mut buffer);

            for (k, bin) in buffer.iter().take(n_bins).enumerate() {
                magnitude[[k, t]] = bin.norm();
            }
        }

        Ok(Self { magnitude })
    }

    /// |X| per bin and frame
    pub fn magnitude(&self) -> &Array2<f64> {
        &self.magnitude
    }

    /// |X|² per bin and frame
    pub fn power(&self) -> Array2<f64> {
        self.magnitude.mapv(|m| m * m)
    }

    pub fn n_bins(&self) -> usize {
        self.magnitude.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.magnitude.ncols()
    }
}
