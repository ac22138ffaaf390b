//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where tagging models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.genreod/models"),
        }
    }
}

/// Audio front-end settings: decode rate and mel spectrogram geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate the model expects; sources are resampled to it
    pub sample_rate: u32,

    /// FFT window size in samples
    pub n_fft: usize,

    /// Hop between successive frames in samples
    pub hop_length: usize,

    /// Number of mel bands (spectrogram columns)
    pub n_mels: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            n_fft: 512,
            hop_length: 256,
            n_mels: 96,
        }
    }
}

/// Tagging model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Patch length in seconds
    pub input_length: f32,

    /// Step between patch starts in seconds. `None` means back-to-back patches.
    pub input_overlap: Option<f32>,

    /// Maximum patches per model invocation
    pub batch_size: usize,

    /// Apply a sigmoid to the model output (for models that emit logits)
    pub apply_sigmoid: bool,

    /// Keep intermediate feature maps returned by the model
    pub extract_features: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            model: "msd_musicnn_big".to_string(),
            input_length: 3.0,
            input_overlap: None,
            batch_size: 32,
            apply_sigmoid: false,
            extract_features: false,
        }
    }
}

/// What a scan does when a single file fails to tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log, count, and continue with the next file
    #[default]
    Skip,
    /// Stop the scan and return the error
    Abort,
}

/// What subset selection does when a file on disk has no index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy {
    /// Count the miss and continue
    #[default]
    Skip,
    /// Return `LibraryError::MissingEntry`
    Fail,
}

/// Every audio extension a library scan can pick up.
pub const AUDIO_FORMATS: [&str; 4] = ["mp3", "wav", "flac", "m4a"];

/// Library scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Audio extensions picked up by scans (case-insensitive), a subset of
    /// [`AUDIO_FORMATS`]
    pub supported_formats: Vec<String>,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// Per-file failure policy during index builds
    pub on_error: FailurePolicy,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            supported_formats: AUDIO_FORMATS.iter().map(|f| f.to_string()).collect(),
            follow_links: true,
            on_error: FailurePolicy::default(),
        }
    }
}

/// Outlier detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Reweight contributions by `max(value, median)`
    pub weighted: bool,

    /// Contamination used when the outlier group has at most one record
    pub default_contamination: f64,

    /// Policy for files under a group root that are missing from the index
    pub on_missing: MissPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            weighted: true,
            default_contamination: 0.1,
            on_missing: MissPolicy::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
