//! Per-track tag vector extraction.
//!
//! Feeds patches through the model in chunks of at most `batch_size`, stacks
//! the per-patch probabilities into a taggram, and averages each tag over time.

use ndarray::{s, Array1, Array2, Array3, Axis};

use crate::error::PipelineError;

use super::model::TaggingModel;
use super::vocabulary::TagVocabulary;

/// Runs a tagging model over patch tensors in bounded batches.
pub struct TagVectorExtractor<'m> {
    model: &'m dyn TaggingModel,
    batch_size: usize,
}

impl<'m> TagVectorExtractor<'m> {
    /// Create an extractor. `batch_size` must be > 0.
    pub fn new(model: &'m dyn TaggingModel, batch_size: usize) -> Result<Self, PipelineError> {
        if batch_size == 0 {
            return Err(PipelineError::InvalidBatching(
                "batch size must be > 0".to_string(),
            ));
        }
        Ok(Self { model, batch_size })
    }

    /// The vocabulary every extracted vector is laid out in.
    pub fn vocabulary(&self) -> &'m TagVocabulary {
        self.model.vocabulary()
    }

    /// The model's tag count.
    pub fn tag_count(&self) -> usize {
        self.model.vocabulary().len()
    }

    /// Compute the (patches × N) taggram, preserving patch order.
    pub fn taggram(&self, patches: &Array3<f32>) -> Result<Array2<f32>, PipelineError> {
        let count = patches.dim().0;
        let width = self.tag_count();
        let mut taggram = Array2::<f32>::zeros((count, width));

        let mut start = 0;
        while start < count {
            let end = (start + self.batch_size).min(count);
            let output = self.model.predict(patches.slice(s![start..end, .., ..]))?;
            let probs = output.probabilities;

            if probs.dim() != (end - start, width) {
                return Err(PipelineError::Tagging {
                    message: format!(
                        "model returned {:?} for a batch of {} over {} tags",
                        probs.dim(),
                        end - start,
                        width
                    ),
                });
            }
            if let Some(bad) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                return Err(PipelineError::Tagging {
                    message: format!("probability {bad} outside [0, 1]"),
                });
            }

            taggram.slice_mut(s![start..end, ..]).assign(&probs);
            start = end;
        }

        Ok(taggram)
    }

    /// Mean tag probability across all patches of one track.
    pub fn extract(&self, patches: &Array3<f32>) -> Result<Vec<f32>, PipelineError> {
        let taggram = self.taggram(patches)?;
        let mean: Array1<f32> = taggram.mean_axis(Axis(0)).ok_or_else(|| PipelineError::Tagging {
            message: "no patches to aggregate".to_string(),
        })?;
        Ok(mean.to_vec())
    }
}
