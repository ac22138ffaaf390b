//! The tagging model contract.
//!
//! Any model that maps a batch of spectrogram patches to per-patch tag
//! probabilities over a fixed vocabulary can drive the extractor, local or
//! remote.

use std::collections::HashMap;

use ndarray::{Array2, ArrayD, ArrayView3};

use crate::error::PipelineError;

use super::vocabulary::TagVocabulary;

/// Output of one model invocation.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    /// (batch × N) tag probabilities in [0, 1]
    pub probabilities: Array2<f32>,
    /// Optional intermediate feature maps, keyed by layer name
    pub features: HashMap<String, ArrayD<f32>>,
}

impl ModelOutput {
    /// Output with probabilities only.
    pub fn probabilities(probabilities: Array2<f32>) -> Self {
        Self {
            probabilities,
            features: HashMap::new(),
        }
    }
}

/// A pluggable audio tagging model.
pub trait TaggingModel: Send + Sync {
    /// The tags each output column corresponds to.
    fn vocabulary(&self) -> &TagVocabulary;

    /// Tag names in output column order.
    fn tags(&self) -> &[String] {
        self.vocabulary().tags()
    }

    /// Run the model on a (batch × frames × mel bands) patch tensor.
    fn predict(&self, patches: ArrayView3<'_, f32>) -> Result<ModelOutput, PipelineError>;
}

/// Logistic function, used for models that emit raw logits.
pub fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_range() {
        assert!(sigmoid(-20.0) < 1e-6);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
        assert!(sigmoid(20.0) > 0.999_999);
    }

    #[test]
    fn test_sigmoid_monotonic() {
        assert!(sigmoid(-1.0) < sigmoid(0.0));
        assert!(sigmoid(0.0) < sigmoid(1.0));
    }
}
