//! Audio tagging: the model contract, the ONNX runtime implementation, and
//! per-track tag vector extraction.
//!
//! A model maps spectrogram patches to per-patch tag probabilities; the
//! extractor averages them into one vector per track.

pub mod extractor;
pub mod model;
pub mod onnx;
pub mod vocabulary;

pub use extractor::TagVectorExtractor;
pub use model::{ModelOutput, TaggingModel};
pub use onnx::OnnxTagger;
pub use vocabulary::{TagVocabulary, MSD_TAGS};
