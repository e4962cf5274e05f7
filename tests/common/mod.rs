//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use serde_json::json;

pub const CLASSES: [&str; 4] = ["angry", "happy", "neutral", "sad"];

/// Write a 16-bit mono WAV of a decaying major triad with a little noise
pub fn write_clip(path: &Path, duration_secs: f32, sample_rate: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();

    let n = (duration_secs * sample_rate as f32) as usize;
    let mut state = 0x2545_f491_u32;
    for i in 0..n {
        let t = i as f32 / sample_rate as f32;
        let envelope = 0.6 + 0.4 * (-(t % 0.5) * 6.0).exp();
        let tone: f32 = [261.63f32, 329.63, 392.0]
            .iter()
            .map(|f| (2.0 * PI * f * t).sin())
            .sum::<f32>()
            / 3.0;

        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state as f32 / u32::MAX as f32 - 0.5) * 2e-4;

        let sample = (0.5 * envelope * tone + noise).clamp(-1.0, 1.0);
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Copy the first `n` samples of a 16-bit WAV into a new file
pub fn write_prefix(src: &Path, dst: &Path, n: usize) {
    let mut reader = hound::WavReader::open(src).unwrap();
    let spec = reader.spec();
    let mut writer = WavWriter::create(dst, spec).unwrap();
    for sample in reader.samples::<i16>().take(n) {
        writer.write_sample(sample.unwrap()).unwrap();
    }
    writer.finalize().unwrap();
}

/// Write raw samples to a 32-bit float mono WAV
pub fn write_float_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Drop the last `bytes` bytes of a file
pub fn cut_tail(path: &Path, bytes: u64) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    let len = file.metadata().unwrap().len();
    file.set_len(len - bytes).unwrap();
}

/// Write a complete bundle trained on [`CLASSES`]
///
/// The scaler brings the 94 features to comparable ranges, PCA keeps three
/// directions (loudness, brightness, first MFCC) and a multinomial logistic
/// regression scores the four classes.
pub fn write_bundle(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let mut mean = vec![0.0; 94];
    let mut scale = vec![1.0; 94];
    mean[2] = 0.1;
    scale[2] = 0.1;
    mean[4] = 1500.0;
    scale[4] = 1000.0;
    mean[12] = -200.0;
    scale[12] = 100.0;

    let mut components = vec![vec![0.0; 94]; 3];
    components[0][2] = 1.0;
    components[1][4] = 1.0;
    components[2][12] = 1.0;

    write_json(
        &dir.join("model.json"),
        json!({
            "kind": "logistic_regression",
            "classes": [0, 1, 2, 3],
            "coef": [
                [1.5, 0.5, 0.2],
                [0.8, 1.2, 0.4],
                [-0.2, 0.1, 0.1],
                [-1.0, -0.9, -0.3]
            ],
            "intercept": [-0.3, 0.2, 0.1, 0.0],
            "multi_class": "multinomial"
        }),
    );
    write_json(
        &dir.join("scaler.json"),
        json!({ "mean": mean, "scale": scale }),
    );
    write_json(
        &dir.join("pca.json"),
        json!({
            "mean": vec![0.0; 94],
            "components": components,
            "explained_variance": [1.0, 1.0, 1.0],
            "whiten": false
        }),
    );
    write_json(
        &dir.join("label_encoder.json"),
        json!({ "classes": CLASSES }),
    );

    dir.to_path_buf()
}

fn write_json(path: &Path, value: serde_json::Value) {
    fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}
