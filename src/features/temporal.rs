//! Time-domain frame features: zero-crossing rate and RMS energy

use ndarray::Array1;

use super::frames::{frames, pad_constant, pad_edge};

/// Samples with a magnitude at or below this count as exact zeros
const ZERO_THRESHOLD: f32 = 1e-10;

/// Fraction of sign changes per frame
///
/// The signal is edge-padded so the first and last frames see no artificial
/// crossing. Near-zero samples are clipped to zero, and zero counts as
/// positive.
pub fn zero_crossing_rate(samples: &[f32], frame_length: usize, hop: usize) -> Array1<f64> {
    let padded = pad_edge(samples, frame_length / 2);

    frames(&padded, frame_length, hop)
        .map(|frame| {
            let crossings = frame
                .windows(2)
                .filter(|pair| is_negative(pair[0]) != is_negative(pair[1]))
                .count();
            crossings as f64 / frame_length as f64
        })
        .collect()
}

/// Root-mean-square energy per zero-padded frame
pub fn rms(samples: &[f32], frame_length: usize, hop: usize) -> Array1<f64> {
    let padded = pad_constant(samples, frame_length / 2);

    frames(&padded, frame_length, hop)
        .map(|frame| {
            let sum_sq: f64 = frame.iter().map(|&s| (s as f64).powi(2)).sum();
            (sum_sq / frame_length as f64).sqrt()
        })
        .collect()
}

#[inline]
fn is_negative(sample: f32) -> bool {
    sample < 0.0 && sample.abs() > ZERO_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Signal;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zcr_of_sine() {
        // 441 Hz at 22050 Hz crosses zero twice per 50-sample cycle
        let signal = Signal::sine(441.0, 1.0, 22_050);
        let zcr = zero_crossing_rate(signal.samples(), 2048, 512);

        assert_eq!(zcr.len(), 1 + 22_050 / 512);
        let mid = zcr[zcr.len() / 2];
        assert_abs_diff_eq!(mid, 2.0 / 50.0, epsilon = 2e-3);
    }

    #[test]
    fn test_zcr_of_silence_is_zero() {
        let zcr = zero_crossing_rate(&[0.0; 4096], 2048, 512);
        assert!(zcr.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_zcr_ignores_denormal_noise() {
        let samples: Vec<f32> = (0..4096)
            .map(|i| if i % 2 == 0 { 1e-12 } else { -1e-12 })
            .collect();
        let zcr = zero_crossing_rate(&samples, 2048, 512);
        assert!(zcr.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_rms_of_constant() {
        let rms = rms(&[0.5; 8192], 2048, 512);

        // Interior frames see only the constant
        assert_abs_diff_eq!(rms[8], 0.5, epsilon = 1e-9);
        // The first frame is half zero padding
        assert_abs_diff_eq!(rms[0], (0.125f64).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_rms_of_sine() {
        let signal = Signal::sine(440.0, 1.0, 22_050);
        let rms = rms(signal.samples(), 2048, 512);
        assert_abs_diff_eq!(rms[20], 0.5 / 2f64.sqrt(), epsilon = 5e-3);
    }
}
