//! tract-onnx classifier implementation

use std::time::Instant;

use image::imageops::{self, FilterType};
use pixel_tensor::RgbTensor;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::labels::load_labels;
use crate::ranking::{rank, softmax, Prediction};
use crate::{ClassifierConfig, ClassifierError, ImageClassifier};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX image classifier (MobileNet-style NCHW input)
pub struct OnnxClassifier {
    plan: OnnxPlan,
    labels: Vec<String>,
    input_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
    apply_softmax: bool,
    top_k: usize,
}

impl OnnxClassifier {
    /// Load and optimize the model, then read its labels
    pub fn load(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        let start = Instant::now();
        info!("Loading classification model from {}", config.path.display());

        let labels = load_labels(&config.labels_path)?;
        let size = config.input_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(&config.path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| ClassifierError::ModelLoad(format!("{}: {}", config.path.display(), e)))?;

        info!(
            "Model loaded in {}ms ({} labels)",
            start.elapsed().as_millis(),
            labels.len()
        );

        Ok(Self {
            plan,
            labels,
            input_size: config.input_size,
            mean: config.mean,
            std: config.std,
            apply_softmax: config.apply_softmax,
            top_k: config.top_k,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&self, image: &RgbTensor) -> Result<Vec<Prediction>, ClassifierError> {
        let start = Instant::now();
        let input = preprocess(image, self.input_size, &self.mean, &self.std)?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model produced no outputs".into()))?;
        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        let scores = if self.apply_softmax { softmax(&scores)? } else { scores };
        let predictions = rank(&scores, &self.labels, self.top_k)?;

        debug!(
            "Classified {}x{} image in {}ms",
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(predictions)
    }
}

/// Resize to `size` x `size` and build a normalized 1x3xSxS f32 tensor
pub fn preprocess(
    image: &RgbTensor,
    size: u32,
    mean: &[f32; 3],
    std: &[f32; 3],
) -> Result<Tensor, ClassifierError> {
    let source = image
        .to_rgb_image()
        .map_err(|e| ClassifierError::Inference(e.to_string()))?;
    let resized = imageops::resize(&source, size, size, FilterType::Triangle);
    let edge = size as usize;

    Ok(tract_ndarray::Array4::from_shape_fn((1, 3, edge, edge), |(_, c, y, x)| {
        let value = resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
        (value - mean[c]) / std[c]
    })
    .into_tensor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use pixel_tensor::PixelTensor;
    use std::path::PathBuf;

    fn solid(h: usize, w: usize, rgb: [u8; 3]) -> RgbTensor {
        let pixels = Array3::from_shape_fn((h, w, 3), |(_, _, c)| rgb[c]);
        PixelTensor::three_dimensional(pixels).unwrap().into_rgb()
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let image = solid(10, 20, [255, 0, 51]);
        let tensor = preprocess(&image, 8, &[0.5, 0.5, 0.5], &[0.5, 0.5, 0.5]).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);

        let view = tensor
            .to_array_view::<f32>()
            .unwrap()
            .into_dimensionality::<tract_ndarray::Ix4>()
            .unwrap();
        assert!((view[[0, 0, 3, 3]] - 1.0).abs() < 1e-5);
        assert!((view[[0, 1, 0, 7]] + 1.0).abs() < 1e-5);
        assert!((view[[0, 2, 7, 0]] + 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_load_missing_labels() {
        let config = ClassifierConfig {
            labels_path: PathBuf::from("/nonexistent/labels.txt"),
            ..Default::default()
        };
        assert!(matches!(
            OnnxClassifier::load(&config),
            Err(ClassifierError::Labels(_))
        ));
    }

    #[test]
    fn test_load_invalid_model() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        let model = dir.path().join("model.onnx");
        std::fs::write(&labels, "cat\ndog\n").unwrap();
        std::fs::write(&model, b"definitely not protobuf").unwrap();

        let config = ClassifierConfig {
            path: model,
            labels_path: labels,
            ..Default::default()
        };
        assert!(matches!(
            OnnxClassifier::load(&config),
            Err(ClassifierError::ModelLoad(_))
        ));
    }
}
