//! ONNX Image Classifier
//!
//! Maps RGB pixel tensors to ranked class predictions using tract-onnx.

mod config;
mod handle;
mod labels;
mod onnx;
mod ranking;

pub use config::{ClassifierConfig, LoadPolicy};
pub use handle::{ModelHandle, SharedClassifier};
pub use labels::{load_labels, parse_labels};
pub use onnx::{preprocess, OnnxClassifier};
pub use ranking::{rank, softmax, Prediction};

use pixel_tensor::RgbTensor;
use thiserror::Error;

/// Errors during classification
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Label file error: {0}")]
    Labels(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Invalid model output: expected {expected} scores, got {actual}")]
    InvalidOutput { expected: String, actual: usize },
    #[error("Invalid model output: non-finite score at index {index}")]
    NonFiniteScore { index: usize },
}

/// A loaded classifier mapping a 3-dimensional pixel tensor to predictions
/// ordered by descending probability.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &RgbTensor) -> Result<Vec<Prediction>, ClassifierError>;
}
