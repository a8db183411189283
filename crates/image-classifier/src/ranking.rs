//! Score post-processing

use serde::{Deserialize, Serialize};

use crate::ClassifierError;

/// One ranked class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Human-readable class label
    pub class_name: String,
    /// Probability (0.0 to 1.0)
    pub probability: f32,
}

/// Numerically stable softmax.
///
/// Fails when the logits contain NaN or infinities, or are all negative
/// infinity, since no distribution can be formed from them.
pub fn softmax(scores: &[f32]) -> Result<Vec<f32>, ClassifierError> {
    if let Some(index) = first_non_finite(scores) {
        return Err(ClassifierError::NonFiniteScore { index });
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return Err(ClassifierError::Inference(format!("softmax normalizer is {}", sum)));
    }
    Ok(exps.into_iter().map(|e| e / sum).collect())
}

fn first_non_finite(scores: &[f32]) -> Option<usize> {
    scores.iter().position(|s| !s.is_finite())
}

/// Pick the `top_k` highest scores and attach labels.
///
/// `scores` holds one value per label, or one extra leading value for a
/// background class which is skipped. Ties keep the lower class index first.
/// Non-finite scores are rejected rather than ranked.
pub fn rank(scores: &[f32], labels: &[String], top_k: usize) -> Result<Vec<Prediction>, ClassifierError> {
    let offset = if scores.len() == labels.len() {
        0
    } else if scores.len() == labels.len() + 1 {
        1
    } else {
        return Err(ClassifierError::InvalidOutput {
            expected: format!("{} or {}", labels.len(), labels.len() + 1),
            actual: scores.len(),
        });
    };

    if let Some(index) = first_non_finite(scores) {
        return Err(ClassifierError::NonFiniteScore { index });
    }

    let scores = &scores[offset..];
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    Ok(order
        .into_iter()
        .take(top_k)
        .map(|i| Prediction {
            class_name: labels[i].clone(),
            probability: scores[i].clamp(0.0, 1.0),
        })
        .collect())
}
