//! Mono signal type
//!
//! A decoded, mono, single-rate waveform. Signals only live for the duration
//! of one extraction call.

/// Mono audio samples at a fixed sample rate
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    /// Wrap existing mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Sample data
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the signal holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Drop everything after `max_samples`
    pub fn truncate(&mut self, max_samples: usize) {
        self.samples.truncate(max_samples);
    }

    /// Consume the signal and return its samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Generate a sine tone
    ///
    /// # Arguments
    /// * `frequency` - Frequency of the sine wave in Hz
    /// * `duration_secs` - Duration of the tone in seconds
    /// * `sample_rate` - Sample rate in Hz
    pub fn sine(frequency: f32, duration_secs: f32, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

        let samples = (0..num_samples)
            .map(|i| 0.5 * (angular_freq * i as f32).sin())
            .collect();

        Self::new(samples, sample_rate)
    }

    /// Generate digital silence
    pub fn silence(duration_secs: f32, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        Self::new(vec![0.0; num_samples], sample_rate)
    }

    /// Generate deterministic white noise in [-amplitude, amplitude)
    ///
    /// Uses a 64-bit LCG so the same seed always yields the same signal.
    pub fn noise(duration_secs: f32, sample_rate: u32, amplitude: f32, seed: u64) -> Self {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        let mut state = seed;

        let samples = (0..num_samples)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
                amplitude * (2.0 * unit - 1.0)
            })
            .collect();

        Self::new(samples, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_length_and_zero_crossing() {
        let signal = Signal::sine(441.0, 1.0, 44_100);

        assert_eq!(signal.len(), 44_100);
        assert!((signal.duration_secs() - 1.0).abs() < 1e-9);

        // 100 samples per cycle, so sample 50 sits on a zero crossing
        assert!(signal.samples()[50].abs() < 1e-3);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = Signal::noise(0.1, 22_050, 0.3, 7);
        let b = Signal::noise(0.1, 22_050, 0.3, 7);
        let c = Signal::noise(0.1, 22_050, 0.3, 8);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.samples().iter().all(|s| s.abs() <= 0.3));
    }

    #[test]
    fn test_truncate() {
        let mut signal = Signal::silence(2.0, 1000);
        signal.truncate(500);
        assert_eq!(signal.len(), 500);

        signal.truncate(10_000);
        assert_eq!(signal.len(), 500);
    }

    #[test]
    fn test_zero_rate_duration() {
        let signal = Signal::new(vec![0.0; 10], 0);
        assert_eq!(signal.duration_secs(), 0.0);
    }
}
