//! Chromagram from a power spectrogram
//!
//! Pitch-class energy with a Gaussian filterbank centred on C. Before
//! projecting, the tuning offset of the recording is estimated from
//! interpolated spectral peaks so that detuned material still lands in the
//! right bins.

use ndarray::{Array2, Axis};

use super::frames::fft_frequencies;

/// Lowest frequency considered by peak picking
const PITCH_FMIN: f64 = 150.0;

/// Highest frequency considered by peak picking
const PITCH_FMAX: f64 = 4000.0;

/// Peaks below this fraction of the frame maximum are ignored
const PITCH_THRESHOLD: f64 = 0.1;

/// Tuning histogram resolution in fractions of a bin
const TUNING_RESOLUTION: f64 = 0.01;

/// Octave the filterbank weighting is centred on
const CENTER_OCTAVE: f64 = 5.0;

/// Width of the octave weighting, in octaves
const OCTAVE_WIDTH: f64 = 2.0;

/// Convert Hz to octave numbers (A440 sits at octave 4 with zero tuning)
#[inline]
pub fn hz_to_octs(freq: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    let a440 = 440.0 * 2f64.powf(tuning / bins_per_octave as f64);
    (freq / (a440 / 16.0)).log2()
}

/// Normalised 12-bin (or `n_chroma`-bin) chroma of a power spectrogram
///
/// # Returns
/// Chroma of shape (`n_chroma`, frames); each frame scaled to a maximum of 1
pub fn chroma_stft(power: &Array2<f64>, sample_rate: u32, n_chroma: usize) -> Array2<f64> {
    let n_fft = 2 * (power.nrows() - 1);
    let tuning = estimate_tuning(power, sample_rate, n_chroma);

    let filters = chroma_filterbank(sample_rate, n_fft, n_chroma, tuning);
    let mut chroma = filters.dot(power);

    for mut column in chroma.axis_iter_mut(Axis(1)) {
        let peak = column.fold(0.0f64, |m, &v| m.max(v.abs()));
        if peak >= f64::MIN_POSITIVE {
            column.mapv_inplace(|v| v / peak);
        }
    }

    chroma
}

/// Chroma filterbank
///
/// # Returns
/// Weights of shape (`n_chroma`, `n_fft / 2 + 1`), rows starting at C
pub fn chroma_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_chroma: usize,
    tuning: f64,
) -> Array2<f64> {
    let n_chroma_f = n_chroma as f64;

    // Fractional chroma bin of every FFT bin; DC is placed 1.5 octaves below bin 1
    let mut freq_bins = Vec::with_capacity(n_fft);
    freq_bins.push(0.0);
    freq_bins.extend((1..n_fft).map(|k| {
        let freq = k as f64 * sample_rate as f64 / n_fft as f64;
        n_chroma_f * hz_to_octs(freq, tuning, n_chroma)
    }));
    freq_bins[0] = freq_bins.get(1).copied().unwrap_or(0.0) - 1.5 * n_chroma_f;

    let mut bin_widths: Vec<f64> = freq_bins
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(1.0))
        .collect();
    bin_widths.push(1.0);

    let half = (n_chroma_f / 2.0).round();
    let mut weights = Array2::from_shape_fn((n_chroma, n_fft), |(c, k)| {
        let distance =
            (freq_bins[k] - c as f64 + half + 10.0 * n_chroma_f).rem_euclid(n_chroma_f) - half;
        (-0.5 * (2.0 * distance / bin_widths[k]).powi(2)).exp()
    });

    // Unit L2 norm per FFT bin, then a Gaussian weighting across octaves
    for (k, mut column) in weights.axis_iter_mut(Axis(1)).enumerate() {
        let norm = column.iter().map(|w| w * w).sum::<f64>().sqrt();
        let norm = if norm < f64::MIN_POSITIVE { 1.0 } else { norm };
        let octave_weight =
            (-0.5 * ((freq_bins[k] / n_chroma_f - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();
        column.mapv_inplace(|w| w / norm * octave_weight);
    }

    // Rows were laid out from A; rotate so row 0 is C
    let shift = 3 * (n_chroma / 12);
    let n_bins = n_fft / 2 + 1;
    Array2::from_shape_fn((n_chroma, n_bins), |(c, k)| {
        weights[[(c + shift) % n_chroma, k]]
    })
}

/// Estimate the tuning offset, in fractions of a chroma bin, in [-0.5, 0.5)
pub fn estimate_tuning(power: &Array2<f64>, sample_rate: u32, bins_per_octave: usize) -> f64 {
    let (pitches, magnitudes) = piptrack(power, sample_rate);

    let mut voiced: Vec<f64> = pitches
        .iter()
        .zip(magnitudes.iter())
        .filter(|&(&p, _)| p > 0.0)
        .map(|(_, &m)| m)
        .collect();

    let threshold = median(&mut voiced).unwrap_or(0.0);

    let selected: Vec<f64> = pitches
        .iter()
        .zip(magnitudes.iter())
        .filter(|&(&p, &m)| p > 0.0 && m >= threshold)
        .map(|(&p, _)| p)
        .collect();

    pitch_tuning(&selected, TUNING_RESOLUTION, bins_per_octave)
}

/// Most common deviation of `frequencies` from equal temperament
///
/// Deviations are histogrammed at `resolution`; the left edge of the fullest
/// bin is returned. No frequencies means zero tuning.
pub fn pitch_tuning(frequencies: &[f64], resolution: f64, bins_per_octave: usize) -> f64 {
    let residuals: Vec<f64> = frequencies
        .iter()
        .filter(|&&f| f > 0.0)
        .map(|&f| {
            let r = (bins_per_octave as f64 * hz_to_octs(f, 0.0, bins_per_octave)).rem_euclid(1.0);
            if r >= 0.5 {
                r - 1.0
            } else {
                r
            }
        })
        .collect();

    if residuals.is_empty() {
        return 0.0;
    }

    let n_bins = (1.0 / resolution).ceil() as usize;
    let step = 1.0 / n_bins as f64;
    let edges: Vec<f64> = (0..=n_bins).map(|i| -0.5 + i as f64 * step).collect();

    let mut counts = vec![0usize; n_bins];
    for r in residuals {
        if let Some(bin) = histogram_bin(&edges, r) {
            counts[bin] += 1;
        }
    }

    let best = counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best })
        .0;

    edges[best]
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Peak frequencies and magnitudes per bin and frame
///
/// A bin holds a pitch when it is a local maximum above a tenth of its frame's
/// maximum; its frequency and magnitude are refined by parabolic
/// interpolation. Bins without a pitch hold zero.
fn piptrack(power: &Array2<f64>, sample_rate: u32) -> (Array2<f64>, Array2<f64>) {
    let (n_bins, n_frames) = power.dim();
    let n_fft = 2 * (n_bins - 1);
    let freqs = fft_frequencies(sample_rate, n_fft);

    let fmax = PITCH_FMAX.min(sample_rate as f64 / 2.0);
    let mut pitches = Array2::zeros((n_bins, n_frames));
    let mut mags = Array2::zeros((n_bins, n_frames));

    if n_bins < 3 {
        return (pitches, mags);
    }

    for t in 0..n_frames {
        let column = power.column(t);
        let ref_value = PITCH_THRESHOLD * column.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let gated = |i: usize| if column[i] > ref_value { column[i] } else { 0.0 };

        for i in 1..n_bins {
            if !(PITCH_FMIN <= freqs[i] && freqs[i] < fmax) {
                continue;
            }

            let here = gated(i);
            let is_peak = if i + 1 < n_bins {
                here > gated(i - 1) && here >= gated(i + 1)
            } else {
                here > gated(i - 1)
            };
            if !is_peak {
                continue;
            }

            let (shift, slope) = if i + 1 < n_bins {
                let a = column[i + 1] + column[i - 1] - 2.0 * column[i];
                let b = (column[i + 1] - column[i - 1]) / 2.0;
                let shift = if b.abs() >= a.abs() { 0.0 } else { -b / a };
                (shift, b)
            } else {
                (0.0, column[i] - column[i - 1])
            };

            pitches[[i, t]] = (i as f64 + shift) * sample_rate as f64 / n_fft as f64;
            mags[[i, t]] = column[i] + 0.5 * slope * shift;
        }
    }

    (pitches, mags)
}

/// Median with averaging of the two middle values; sorts in place
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(0.5 * (values[mid - 1] + values[mid]))
    } else {
        Some(values[mid])
    }
}

/// Histogram bin holding `value`; the last bin includes its right edge
fn histogram_bin(edges: &[f64], value: f64) -> Option<usize> {
    let n_bins = edges.len().checked_sub(1)?;
    let (first, last) = (edges[0], edges[n_bins]);
    if !(first..=last).contains(&value) || n_bins == 0 {
        return None;
    }

    let mut bin = (((value - first) / (last - first)) * n_bins as f64) as usize;
    bin = bin.min(n_bins - 1);
    if value < edges[bin] {
        bin = bin.saturating_sub(1);
    } else if bin + 1 < n_bins && value >= edges[bin + 1] {
        bin += 1;
    }

    Some(bin)
}
