//! Classifier configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the model handle obtains a classifier for each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Load once on first use and share across all requests
    #[default]
    Shared,
    /// Load a fresh classifier for every request
    PerRequest,
}

impl LoadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPolicy::Shared => "shared",
            LoadPolicy::PerRequest => "per_request",
        }
    }
}

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// ONNX model file
    pub path: PathBuf,

    /// Newline-separated class labels, one per model output
    pub labels_path: PathBuf,

    /// Square input edge expected by the model (NCHW 1x3xSxS)
    pub input_size: u32,

    /// Per-channel mean subtracted after scaling to [0, 1]
    pub mean: [f32; 3],

    /// Per-channel standard deviation
    pub std: [f32; 3],

    /// Apply softmax to raw model scores
    pub apply_softmax: bool,

    /// Number of predictions returned
    pub top_k: usize,

    pub load_policy: LoadPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/mobilenetv2.onnx"),
            labels_path: PathBuf::from("models/imagenet_labels.txt"),
            input_size: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            apply_softmax: true,
            top_k: 3,
            load_policy: LoadPolicy::Shared,
        }
    }
}

impl ClassifierConfig {
    /// MobileNet exports that expect pixels scaled to [-1, 1]
    pub fn signed_unit() -> Self {
        Self {
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), crate::ClassifierError> {
        use crate::ClassifierError::Config;

        if self.input_size == 0 {
            return Err(Config("input_size must be positive".into()));
        }
        if self.top_k == 0 {
            return Err(Config("top_k must be positive".into()));
        }
        if self.std.iter().any(|s| *s <= 0.0) {
            return Err(Config(format!("std must be positive, got {:?}", self.std)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClassifierConfig::default();
        assert_eq!(config.input_size, 224);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.load_policy, LoadPolicy::Shared);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = ClassifierConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClassifierConfig {
            std: [0.5, 0.0, 0.5],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_policy_names() {
        let policy: LoadPolicy = serde_json::from_str("\"per_request\"").unwrap();
        assert_eq!(policy, LoadPolicy::PerRequest);
        assert_eq!(LoadPolicy::Shared.as_str(), "shared");
    }
}
