//! Audio front-end: decode, mel spectrogram, log compression, patching.
//!
//! - **decode**: Load and decode audio files to mono PCM
//! - **spectrogram**: Mel power spectrogram and log compression
//! - **batch**: Sliding-window patches fed to the tagging model

pub mod batch;
pub mod decode;
pub mod spectrogram;

pub use batch::{PatchGeometry, SpectrogramBatcher};
pub use decode::{AudioDecoder, DecodedAudio};
pub use spectrogram::{log_compress, MelSpectrogram};

use std::path::Path;

use ndarray::Array3;

use crate::config::{AudioConfig, TaggingConfig};
use crate::error::PipelineError;

/// Turns an audio file into the patch tensor the tagging model consumes.
pub struct AudioFrontend {
    decoder: AudioDecoder,
    mel: MelSpectrogram,
    batcher: SpectrogramBatcher,
}

impl AudioFrontend {
    /// Build the front-end from audio and tagging settings.
    pub fn new(audio: &AudioConfig, tagging: &TaggingConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            decoder: AudioDecoder::new(audio),
            mel: MelSpectrogram::new(audio),
            batcher: SpectrogramBatcher::new(PatchGeometry::from_config(audio, tagging)?),
        })
    }

    /// Patch geometry used for every track.
    pub fn geometry(&self) -> PatchGeometry {
        self.batcher.geometry()
    }

    /// Decode a file and return its (patches × n × n_mels) tensor.
    pub fn patches(&self, path: &Path) -> Result<Array3<f32>, PipelineError> {
        let audio = self.decoder.decode(path)?;
        self.patches_from_samples(&audio.samples)
    }

    /// Same as [`patches`](Self::patches) for already decoded mono samples.
    pub fn patches_from_samples(&self, samples: &[f32]) -> Result<Array3<f32>, PipelineError> {
        let mut rep = self.mel.compute(samples)?;
        log_compress(&mut rep);
        self.batcher.batch(&rep)
    }
}
