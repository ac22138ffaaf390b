//! ONNX Runtime tagging model.
//!
//! Expects `{model_dir}/model.onnx` taking a `[batch, frames, mel_bands]`
//! float tensor. The first declared output is the tag tensor `[batch, N]`;
//! any further outputs are treated as intermediate feature maps. Tag names
//! come from `{model_dir}/labels.txt` when present, otherwise the built-in
//! MSD vocabulary is assumed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::{Array2, ArrayD, ArrayView3, IxDyn};
use ort::session::Session;
use ort::value::Value;

use crate::config::TaggingConfig;
use crate::error::PipelineError;

use super::model::{sigmoid, ModelOutput, TaggingModel};
use super::vocabulary::TagVocabulary;

/// The tagging model ONNX filename.
const MODEL_FILENAME: &str = "model.onnx";

/// Optional labels file next to the model.
const LABELS_FILENAME: &str = "labels.txt";

/// Wraps an ONNX Runtime session for audio tagging.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxTagger {
    session: Mutex<Session>,
    input_name: String,
    tags_output: String,
    vocabulary: TagVocabulary,
    apply_sigmoid: bool,
    extract_features: bool,
}

impl OnnxTagger {
    /// Expected model file path for a model directory.
    pub fn model_path(model_dir: &Path) -> PathBuf {
        model_dir.join(MODEL_FILENAME)
    }

    /// Check whether the model file exists.
    pub fn model_exists(model_dir: &Path) -> bool {
        Self::model_path(model_dir).exists()
    }

    /// Load the model and its vocabulary from `model_dir`.
    pub fn load(model_dir: &Path, config: &TaggingConfig) -> Result<Self, PipelineError> {
        let model_path = Self::model_path(model_dir);
        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!("Model not found at {:?}", model_path),
            });
        }

        let labels_path = model_dir.join(LABELS_FILENAME);
        let vocabulary = if labels_path.exists() {
            TagVocabulary::load(&labels_path)?
        } else {
            tracing::debug!("No {} in {:?}, assuming MSD tags", LABELS_FILENAME, model_dir);
            TagVocabulary::msd()
        };

        tracing::info!("Loading tagging model from {:?}", model_path);
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load ONNX model {:?}: {e}", model_path),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());
        let tags_output = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| PipelineError::Model {
                message: "Model declares no outputs".to_string(),
            })?;

        tracing::debug!(
            "Tagging model ready (input: {:?}, tags output: {:?}, {} tags)",
            input_name,
            tags_output,
            vocabulary.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            tags_output,
            vocabulary,
            apply_sigmoid: config.apply_sigmoid,
            extract_features: config.extract_features,
        })
    }
}

impl TaggingModel for OnnxTagger {
    fn vocabulary(&self) -> &TagVocabulary {
        &self.vocabulary
    }

    fn predict(&self, patches: ArrayView3<'_, f32>) -> Result<ModelOutput, PipelineError> {
        let model_err = |message: String| PipelineError::Model { message };

        let batch = patches.dim().0;
        let shape: Vec<i64> = patches.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = patches.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| model_err(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| model_err(format!("Session lock poisoned: {e}")))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| model_err(format!("ONNX inference failed: {e}")))?;

        let mut probabilities = None;
        let mut features = HashMap::new();
        for (name, value) in outputs.iter() {
            let is_tags = name == self.tags_output;
            if !is_tags && !self.extract_features {
                continue;
            }
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| model_err(format!("Failed to extract {name:?}: {e}")))?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

            if is_tags {
                let width = match dims.as_slice() {
                    [b, n] if *b == batch => *n,
                    [n] if batch == 1 => *n,
                    _ => {
                        return Err(model_err(format!(
                            "Unexpected tags output shape {:?} for batch {}",
                            dims, batch
                        )))
                    }
                };
                let mut probs = Array2::from_shape_vec((batch, width), data.to_vec())
                    .map_err(|e| model_err(format!("Bad tags output: {e}")))?;
                if self.apply_sigmoid {
                    probs.mapv_inplace(sigmoid);
                }
                probabilities = Some(probs);
            } else {
                let map = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
                    .map_err(|e| model_err(format!("Bad feature map {name:?}: {e}")))?;
                features.insert(name.to_string(), map);
            }
        }

        let probabilities = probabilities.ok_or_else(|| {
            model_err(format!("Model did not produce {:?}", self.tags_output))
        })?;
        Ok(ModelOutput {
            probabilities,
            features,
        })
    }
}
