//! Spectral shape features computed from a magnitude spectrogram
//!
//! Every function takes the spectrogram as (bins, frames) and returns one
//! value per frame, except contrast which returns one row per sub-band.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{Result, TonoError};

/// Floor applied before taking logarithms in dB conversion
pub const AMIN: f64 = 1e-10;

/// Per-frame spectral centroid in Hz
pub fn spectral_centroid(magnitude: &Array2<f64>, freqs: &[f64]) -> Array1<f64> {
    magnitude
        .axis_iter(Axis(1))
        .map(|column| {
            let norm = unit_sum(column);
            column.iter().zip(freqs).map(|(&s, &f)| f * s / norm).sum()
        })
        .collect()
}

/// Per-frame second-order spectral bandwidth around the centroid
pub fn spectral_bandwidth(
    magnitude: &Array2<f64>,
    freqs: &[f64],
    centroid: &Array1<f64>,
) -> Array1<f64> {
    magnitude
        .axis_iter(Axis(1))
        .zip(centroid.iter())
        .map(|(column, &c)| {
            let norm = unit_sum(column);
            let spread: f64 = column
                .iter()
                .zip(freqs)
                .map(|(&s, &f)| (s / norm) * (f - c).powi(2))
                .sum();
            spread.sqrt()
        })
        .collect()
}

/// Per-frame frequency below which `percent` of the magnitude lies
pub fn spectral_rolloff(magnitude: &Array2<f64>, freqs: &[f64], percent: f64) -> Array1<f64> {
    magnitude
        .axis_iter(Axis(1))
        .map(|column| {
            let threshold = percent * column.sum();
            let mut cumulative = 0.0;
            for (&s, &f) in column.iter().zip(freqs) {
                cumulative += s;
                if cumulative >= threshold {
                    return f;
                }
            }
            freqs.last().copied().unwrap_or(0.0)
        })
        .collect()
}

/// Octave-band spectral contrast in dB
///
/// Bands are `[0, fmin]`, then `n_bands` octaves starting at `fmin`; the last
/// band also takes every bin above its upper edge. Peak and valley are the
/// means of the top and bottom `quantile` of each band's magnitudes.
///
/// # Returns
/// An array of shape (`n_bands + 1`, frames)
pub fn spectral_contrast(
    magnitude: &Array2<f64>,
    freqs: &[f64],
    sample_rate: u32,
    n_bands: usize,
    fmin: f64,
    quantile: f64,
    top_db: f64,
) -> Result<Array2<f64>> {
    if fmin <= 0.0 || n_bands < 1 || !(0.0 < quantile && quantile < 1.0) {
        return Err(TonoError::ProcessingError {
            reason: format!(
                "invalid contrast parameters: fmin={} n_bands={} quantile={}",
                fmin, n_bands, quantile
            ),
        });
    }

    let mut edges = vec![0.0];
    edges.extend((0..=n_bands).map(|k| fmin * 2f64.powi(k as i32)));

    let nyquist = 0.5 * sample_rate as f64;
    if edges[..edges.len() - 1].iter().any(|&f| f >= nyquist) {
        return Err(TonoError::ProcessingError {
            reason: format!(
                "contrast band starting at {} Hz exceeds Nyquist ({} Hz)",
                edges[edges.len() - 2],
                nyquist
            ),
        });
    }

    let n_frames = magnitude.ncols();
    let mut peak = Array2::zeros((n_bands + 1, n_frames));
    let mut valley = Array2::zeros((n_bands + 1, n_frames));

    for (k, pair) in edges.windows(2).enumerate() {
        let rows = band_rows(freqs, pair[0], pair[1], k, n_bands)?;
        let alpha = ((quantile * rows.len() as f64).round_ties_even() as usize).max(1);

        // Every band but the last drops its top bin, which the next band owns
        let rows = if k < n_bands {
            &rows[..rows.len() - 1]
        } else {
            &rows[..]
        };
        if rows.is_empty() {
            return Err(TonoError::ProcessingError {
                reason: format!("contrast band {} has no frequency bins", k),
            });
        }
        let alpha = alpha.min(rows.len());

        let mut sorted = Vec::with_capacity(rows.len());
        for t in 0..n_frames {
            sorted.clear();
            sorted.extend(rows.iter().map(|&r| magnitude[[r, t]]));
            sorted.sort_by(|a, b| a.total_cmp(b));

            valley[[k, t]] = sorted[..alpha].iter().sum::<f64>() / alpha as f64;
            peak[[k, t]] = sorted[sorted.len() - alpha..].iter().sum::<f64>() / alpha as f64;
        }
    }

    Ok(power_to_db(&peak, Some(top_db)) - power_to_db(&valley, Some(top_db)))
}

/// Convert a power array to decibels relative to 1.0
///
/// Values are floored at [`AMIN`]; with `top_db`, everything more than
/// `top_db` below the array maximum is raised to that floor.
pub fn power_to_db(power: &Array2<f64>, top_db: Option<f64>) -> Array2<f64> {
    let mut log_spec = power.mapv(|p| 10.0 * p.max(AMIN).log10());

    if let Some(top_db) = top_db {
        let max = log_spec.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        log_spec.mapv_inplace(|v| v.max(max - top_db));
    }

    log_spec
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Sum of a frame, or 1.0 for an all-zero frame so it is left unnormalised
fn unit_sum(column: ArrayView1<f64>) -> f64 {
    let total = column.sum();
    if total.abs() < f64::MIN_POSITIVE {
        1.0
    } else {
        total
    }
}

/// Bin indices belonging to contrast band `k`
fn band_rows(freqs: &[f64], low: f64, high: f64, k: usize, n_bands: usize) -> Result<Vec<usize>> {
    let mut in_band: Vec<bool> = freqs.iter().map(|&f| f >= low && f <= high).collect();

    let first = in_band.iter().position(|&b| b);
    let last = in_band.iter().rposition(|&b| b);
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(TonoError::ProcessingError {
                reason: format!("no frequency bins between {} and {} Hz", low, high),
            })
        }
    };

    if k > 0 && first > 0 {
        in_band[first - 1] = true;
    }
    if k == n_bands {
        in_band[last + 1..].iter_mut().for_each(|b| *b = true);
    }

    Ok(in_band
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i))
        .collect())
}
