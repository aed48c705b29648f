//! Inference engine seam and the built-in linear classifier.
//!
//! The client never interprets model bytes itself; it hands them to an
//! [`InferenceEngine`] injected at construction. Tests swap in fakes the
//! same way.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Deserialize;

/// Builds a [`Classifier`] from raw model definition bytes.
pub trait InferenceEngine: Send + Sync {
    fn build(&self, definition: &[u8]) -> Result<Box<dyn Classifier>, EngineError>;
}

/// A loaded model ready to score images.
pub trait Classifier: Send + Sync {
    /// Number of output classes.
    fn class_count(&self) -> usize;

    /// Score an image, one value per class, in class order. Values carry
    /// whatever normalization the model itself defines.
    fn predict(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError>;
}

/// Errors building a classifier from a definition.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Malformed model definition: {0}")]
    MalformedDefinition(String),

    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("Model shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Errors scoring an image.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Image could not be decoded: {0}")]
    UndecodableImage(#[from] image::ImageError),

    #[error("Classifier produced {got} scores for {expected} classes")]
    ScoreCountMismatch { expected: usize, got: usize },
}

/// Format tag the built-in engine accepts.
const LINEAR_FORMAT: &str = "linear-softmax/1";

/// The shipped engine: a single dense layer over normalized RGB pixels
/// with an optional softmax, defined entirely by a JSON document.
#[derive(Debug, Default)]
pub struct LinearSoftmaxEngine;

#[derive(Debug, Deserialize)]
struct LinearDefinition {
    format: String,
    input: InputShape,
    /// Per-channel normalization, defaults to identity
    #[serde(default = "default_mean")]
    mean: Vec<f32>,
    #[serde(default = "default_std")]
    std: Vec<f32>,
    /// One row per class over the flattened RGB input
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
    #[serde(default = "default_activation")]
    activation: String,
}

#[derive(Debug, Deserialize)]
struct InputShape {
    width: u32,
    height: u32,
}

fn default_mean() -> Vec<f32> {
    vec![0.0, 0.0, 0.0]
}

fn default_std() -> Vec<f32> {
    vec![1.0, 1.0, 1.0]
}

fn default_activation() -> String {
    "softmax".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Softmax,
    None,
}

impl InferenceEngine for LinearSoftmaxEngine {
    fn build(&self, definition: &[u8]) -> Result<Box<dyn Classifier>, EngineError> {
        let def: LinearDefinition = serde_json::from_slice(definition)
            .map_err(|e| EngineError::MalformedDefinition(e.to_string()))?;

        if def.format != LINEAR_FORMAT {
            return Err(EngineError::UnsupportedFormat(def.format));
        }
        if def.input.width == 0 || def.input.height == 0 {
            return Err(EngineError::ShapeMismatch(
                "input dimensions must be non-zero".to_string(),
            ));
        }
        if def.weights.is_empty() {
            return Err(EngineError::ShapeMismatch("no weight rows".to_string()));
        }
        let feature_len = (def.input.width * def.input.height * 3) as usize;
        for (i, row) in def.weights.iter().enumerate() {
            if row.len() != feature_len {
                return Err(EngineError::ShapeMismatch(format!(
                    "weight row {} has {} values, expected {}",
                    i,
                    row.len(),
                    feature_len
                )));
            }
        }
        if def.biases.len() != def.weights.len() {
            return Err(EngineError::ShapeMismatch(format!(
                "{} biases for {} classes",
                def.biases.len(),
                def.weights.len()
            )));
        }
        if def.mean.len() != 3 || def.std.len() != 3 {
            return Err(EngineError::ShapeMismatch(
                "mean and std must have 3 channel entries".to_string(),
            ));
        }
        if def.std.iter().any(|s| *s == 0.0) {
            return Err(EngineError::ShapeMismatch(
                "std entries must be non-zero".to_string(),
            ));
        }

        let activation = match def.activation.as_str() {
            "softmax" => Activation::Softmax,
            "none" => Activation::None,
            other => {
                return Err(EngineError::MalformedDefinition(format!(
                    "unknown activation '{}'",
                    other
                )))
            }
        };

        Ok(Box::new(LinearClassifier {
            input_width: def.input.width,
            input_height: def.input.height,
            mean: def.mean,
            std: def.std,
            weights: def.weights,
            biases: def.biases,
            activation,
        }))
    }
}

struct LinearClassifier {
    input_width: u32,
    input_height: u32,
    mean: Vec<f32>,
    std: Vec<f32>,
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
    activation: Activation,
}

impl Classifier for LinearClassifier {
    fn class_count(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        // Features are row-major pixels with interleaved RGB, matching
        // the weight layout in the definition.
        let resized = image
            .resize_exact(self.input_width, self.input_height, FilterType::Triangle)
            .to_rgb8();

        let mut features = Vec::with_capacity(resized.as_raw().len());
        for pixel in resized.pixels() {
            for c in 0..3 {
                let v = pixel.0[c] as f32 / 255.0;
                features.push((v - self.mean[c]) / self.std[c]);
            }
        }

        let mut scores: Vec<f32> = self
            .weights
            .iter()
            .zip(self.biases.iter())
            .map(|(row, bias)| {
                row.iter()
                    .zip(features.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
                    + bias
            })
            .collect();

        if self.activation == Activation::Softmax {
            scores = softmax(&scores);
        }

        Ok(scores)
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
