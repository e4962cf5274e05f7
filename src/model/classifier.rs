//! Classifier implementations
//!
//! All classifiers map a matrix of reduced features to one probability row
//! per sample, with columns in the order of the classifier's `classes`.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::{corrupt, Artifact, MODEL_FILE};
use crate::error::{Result, TonoError};

/// Common interface for trained classifiers
pub trait Classifier {
    /// Integer class codes, one per probability column
    fn classes(&self) -> &[i64];

    /// Number of input features expected per sample
    fn n_features(&self) -> usize;

    /// Class probabilities of shape (samples, classes)
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Most probable class code per sample
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| self.classes()[argmax(row)])
            .collect())
    }
}

// ============================================================================
// Serialized model
// ============================================================================

/// Classifier stored in `model.json`, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    LogisticRegression(LogisticRegression),
    Mlp(Mlp),
    RandomForest(RandomForest),
}

impl ClassifierModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierModel::LogisticRegression(m) => m,
            ClassifierModel::Mlp(m) => m,
            ClassifierModel::RandomForest(m) => m,
        }
    }

    /// Short name of the classifier kind for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierModel::LogisticRegression(_) => "logistic_regression",
            ClassifierModel::Mlp(_) => "mlp",
            ClassifierModel::RandomForest(_) => "random_forest",
        }
    }
}

impl Classifier for ClassifierModel {
    fn classes(&self) -> &[i64] {
        self.inner().classes()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().predict_proba(x)
    }
}

impl Artifact for ClassifierModel {
    const FILE_NAME: &'static str = MODEL_FILE;

    fn validate(&self) -> Result<()> {
        let classes = self.classes();
        if classes.len() < 2 {
            return Err(corrupt(MODEL_FILE, "a classifier needs at least two classes"));
        }
        match self {
            ClassifierModel::LogisticRegression(m) => m.validate(),
            ClassifierModel::Mlp(m) => m.validate(),
            ClassifierModel::RandomForest(m) => m.validate(),
        }
    }
}

// ============================================================================
// Logistic regression
// ============================================================================

/// Multi-class strategy of a logistic regression
///
/// `Auto` is one-vs-rest for a binary model and multinomial otherwise. An
/// explicit `Multinomial` binary model scores its single row as the softmax
/// of `[-d, d]`, which is `sigmoid(2d)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiClass {
    #[default]
    Auto,
    Multinomial,
    Ovr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<i64>,

    /// One row per class, or a single row for a binary model
    pub coef: Vec<Vec<f64>>,

    pub intercept: Vec<f64>,

    #[serde(default)]
    pub multi_class: MultiClass,
}

impl LogisticRegression {
    fn validate(&self) -> Result<()> {
        let binary = self.classes.len() == 2 && self.coef.len() == 1;
        if !binary && self.coef.len() != self.classes.len() {
            return Err(corrupt(
                MODEL_FILE,
                format!(
                    "{} coefficient rows for {} classes",
                    self.coef.len(),
                    self.classes.len()
                ),
            ));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(corrupt(MODEL_FILE, "intercept length differs from coef rows"));
        }
        check_rectangular(&self.coef, "coef")
    }
}

impl Classifier for LogisticRegression {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width(x, self.n_features())?;

        let scores = affine(x, &to_matrix(&self.coef).t().to_owned(), &self.intercept);

        if scores.ncols() == 1 {
            let gain = match self.multi_class {
                MultiClass::Multinomial => 2.0,
                MultiClass::Auto | MultiClass::Ovr => 1.0,
            };
            return Ok(binary_proba(
                &scores.column(0).mapv(|d| sigmoid(gain * d)),
            ));
        }

        Ok(match self.multi_class {
            MultiClass::Auto | MultiClass::Multinomial => softmax_rows(scores),
            MultiClass::Ovr => normalise_rows(scores.mapv(sigmoid)),
        })
    }
}

// ============================================================================
// Multi-layer perceptron
// ============================================================================

/// Hidden-layer activation of an MLP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Logistic,
    Tanh,
    Relu,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Logistic => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    pub classes: Vec<i64>,

    pub activation: Activation,

    /// Weights per layer, each of shape (inputs, outputs)
    pub coefs: Vec<Vec<Vec<f64>>>,

    /// Biases per layer
    pub intercepts: Vec<Vec<f64>>,
}

impl Mlp {
    fn validate(&self) -> Result<()> {
        if self.coefs.is_empty() || self.coefs.len() != self.intercepts.len() {
            return Err(corrupt(
                MODEL_FILE,
                "coefs and intercepts must describe the same non-empty set of layers",
            ));
        }

        let mut inputs = None;
        for (layer, (weights, bias)) in self.coefs.iter().zip(&self.intercepts).enumerate() {
            check_rectangular(weights, "coefs")?;
            let outputs = weights[0].len();
            if bias.len() != outputs {
                return Err(corrupt(
                    MODEL_FILE,
                    format!("layer {} has {} outputs but {} biases", layer, outputs, bias.len()),
                ));
            }
            if let Some(inputs) = inputs {
                if weights.len() != inputs {
                    return Err(corrupt(
                        MODEL_FILE,
                        format!(
                            "layer {} expects {} inputs, previous layer gives {}",
                            layer,
                            weights.len(),
                            inputs
                        ),
                    ));
                }
            }
            inputs = Some(outputs);
        }

        let outputs = inputs.unwrap_or(0);
        let binary = self.classes.len() == 2 && outputs == 1;
        if !binary && outputs != self.classes.len() {
            return Err(corrupt(
                MODEL_FILE,
                format!("{} output units for {} classes", outputs, self.classes.len()),
            ));
        }
        Ok(())
    }
}

impl Classifier for Mlp {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coefs.first().map_or(0, Vec::len)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width(x, self.n_features())?;

        let last = self.coefs.len() - 1;
        let mut activations = x.to_owned();
        for (layer, (weights, bias)) in self.coefs.iter().zip(&self.intercepts).enumerate() {
            activations = affine(&activations, &to_matrix(weights), bias);
            if layer < last {
                activations.mapv_inplace(|v| self.activation.apply(v));
            }
        }

        if activations.ncols() == 1 {
            return Ok(binary_proba(&activations.column(0).mapv(sigmoid)));
        }
        Ok(softmax_rows(activations))
    }
}

// ============================================================================
// Random forest
// ============================================================================

/// Decision tree flattened into parallel node arrays
///
/// Node 0 is the root. Leaves have `-1` in both child arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,

    /// Per-node class weights, one column per class
    pub value: Vec<Vec<f64>>,
}

const LEAF: i64 = -1;

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, tree: usize, n_features: usize, n_classes: usize) -> Result<()> {
        let n = self.node_count();
        let bad = |reason: String| corrupt(MODEL_FILE, format!("tree {}: {}", tree, reason));

        if n == 0 {
            return Err(bad("no nodes".to_string()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(bad("node arrays differ in length".to_string()));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if self.value[node].len() != n_classes {
                return Err(bad(format!("node {} has {} class weights", node, self.value[node].len())));
            }
            if left == LEAF && right == LEAF {
                continue;
            }
            // Children are stored after their parent, which rules out cycles
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(bad(format!("node {} has children out of range", node)));
            }
            if !(0..n_features as i64).contains(&self.feature[node]) {
                return Err(bad(format!("node {} splits on feature {}", node, self.feature[node])));
            }
        }
        Ok(())
    }

    /// Normalised class weights of the leaf reached by `sample`
    fn leaf_proba(&self, sample: ArrayView1<f64>) -> Array1<f64> {
        let mut node = 0;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if sample[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = Array1::from(self.value[node].clone());
        let total = weights.sum();
        if total > 0.0 {
            weights / total
        } else {
            weights
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<i64>,
    pub n_features: usize,
    pub estimators: Vec<DecisionTree>,
}

impl RandomForest {
    fn validate(&self) -> Result<()> {
        if self.estimators.is_empty() {
            return Err(corrupt(MODEL_FILE, "forest has no estimators"));
        }
        if self.n_features == 0 {
            return Err(corrupt(MODEL_FILE, "n_features must be positive"));
        }
        for (i, tree) in self.estimators.iter().enumerate() {
            tree.validate(i, self.n_features, self.classes.len())?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width(x, self.n_features)?;

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for (sample, mut out) in x.rows().into_iter().zip(proba.rows_mut()) {
            for tree in &self.estimators {
                out += &tree.leaf_proba(sample);
            }
            out /= self.estimators.len() as f64;
        }
        Ok(proba)
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn check_rectangular(rows: &[Vec<f64>], name: &str) -> Result<()> {
    let width = rows.first().map_or(0, Vec::len);
    if width == 0 || rows.iter().any(|r| r.len() != width) {
        return Err(corrupt(
            MODEL_FILE,
            format!("{} must be a non-empty rectangular matrix", name),
        ));
    }
    Ok(())
}

fn check_width(x: &Array2<f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(TonoError::ShapeMismatch {
            stage: "classifier",
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}

fn to_matrix(rows: &[Vec<f64>]) -> Array2<f64> {
    let cols = rows.first().map_or(0, Vec::len);
    Array2::from_shape_fn((rows.len(), cols), |(i, j)| rows[i][j])
}

/// `x · weights + bias`
fn affine(x: &Array2<f64>, weights: &Array2<f64>, bias: &[f64]) -> Array2<f64> {
    x.dot(weights) + &ArrayView1::from(bias)
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn binary_proba(positive: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((positive.len(), 2), |(i, j)| {
        if j == 1 {
            positive[i]
        } else {
            1.0 - positive[i]
        }
    })
}

fn softmax_rows(mut scores: Array2<f64>) -> Array2<f64> {
    for mut row in scores.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let total = row.sum();
        row /= total;
    }
    scores
}

fn normalise_rows(mut scores: Array2<f64>) -> Array2<f64> {
    let totals = scores.sum_axis(Axis(1));
    for (mut row, &total) in scores.rows_mut().into_iter().zip(totals.iter()) {
        if total > 0.0 {
            row /= total;
        }
    }
    scores
}

/// Index of the first maximum
fn argmax(row: ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}
