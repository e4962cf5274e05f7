//! Extraction Benchmarks
//!
//! Performance benchmarks for feature extraction and prediction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tono::features::extract_from_signal;
use tono::features::frames::Spectrogram;
use tono::model::classifier::{LogisticRegression, MultiClass};
use tono::model::{ClassifierModel, LabelEncoder, ModelBundle, Pca, StandardScaler};
use tono::{AnalysisConfig, FeatureVector, Predictor, Signal, FEATURE_COUNT};

fn benchmark_stft(c: &mut Criterion) {
    let signal = Signal::sine(440.0, 5.0, 22_050);

    c.bench_function("stft_5s", |b| {
        b.iter(|| Spectrogram::compute(black_box(signal.samples()), 2048, 512).unwrap())
    });
}

fn benchmark_extraction(c: &mut Criterion) {
    let signal = Signal::noise(5.0, 22_050, 0.3, 7);
    let config = AnalysisConfig::default();

    c.bench_function("extract_5s", |b| {
        b.iter(|| extract_from_signal(black_box(&signal), &config).unwrap())
    });
}

fn benchmark_prediction(c: &mut Criterion) {
    let mut components = vec![vec![0.0; FEATURE_COUNT]; 8];
    for (i, row) in components.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    let bundle = ModelBundle::from_parts(
        ClassifierModel::LogisticRegression(LogisticRegression {
            classes: vec![0, 1, 2, 3],
            coef: vec![vec![0.1; 8]; 4],
            intercept: vec![0.0; 4],
            multi_class: MultiClass::Multinomial,
        }),
        StandardScaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]),
        Pca {
            mean: vec![0.0; FEATURE_COUNT],
            components,
            explained_variance: None,
            whiten: false,
        },
        LabelEncoder::new(["angry", "happy", "neutral", "sad"]),
    )
    .unwrap();
    let predictor = Predictor::new(bundle, AnalysisConfig::default());
    let features = FeatureVector::from_values((0..54).map(|i| i as f64 * 0.01));

    c.bench_function("predict_features", |b| {
        b.iter(|| predictor.predict_features(black_box(&features)).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_stft,
    benchmark_extraction,
    benchmark_prediction
);
criterion_main!(benches);
