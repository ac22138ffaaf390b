//! Error types for the genreod indexing and detection pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, stage names, specific issues).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for genreod operations.
#[derive(Error, Debug)]
pub enum GenreodError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-file pipeline errors (decode, spectrogram, tagging)
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Library index and subset errors
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    /// Outlier detection errors
    #[error("Detection error: {0}")]
    Detect(#[from] DetectError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-file pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Audio decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Spectrogram computation failed
    #[error("Spectrogram error: {message}")]
    Spectrogram { message: String },

    /// The track is shorter than one patch
    #[error("Insufficient audio length: {frames} frames < patch length {frame_length}")]
    InsufficientAudioLength { frames: usize, frame_length: usize },

    /// Patch or batch geometry is invalid
    #[error("Invalid batching: {0}")]
    InvalidBatching(String),

    /// Tagging model returned unusable output
    #[error("Tagging failed: {message}")]
    Tagging { message: String },

    /// Model loading or inference failed
    #[error("Model error: {message}")]
    Model { message: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Library index and subset selection errors.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// A track vector does not match the established vocabulary
    #[error("Vocabulary mismatch for {path}: expected {expected} tags, got {actual}")]
    VocabularyMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Snapshot is malformed or missing its vocabulary
    #[error("Invalid index format: {0}")]
    InvalidIndexFormat(String),

    /// Path already present in the index
    #[error("Duplicate path in index: {0}")]
    DuplicatePath(PathBuf),

    /// Lookup miss under the strict miss policy
    #[error("No index entry for {0}")]
    MissingEntry(PathBuf),

    /// Snapshot I/O failed
    #[error("Index I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outlier detection errors.
#[derive(Error, Debug)]
pub enum DetectError {
    /// Fewer than two records to fit on
    #[error("Insufficient samples: need at least 2 records, got {samples}")]
    InsufficientSamples { samples: usize },

    /// Input matrix or split is inconsistent
    #[error("Invalid detection input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for genreod results.
pub type Result<T> = std::result::Result<T, GenreodError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
