//! genreod core - tag-vector indexing and genre outlier detection for audio
//! libraries.
//!
//! Every track is reduced to a vector of tag probabilities by an audio
//! tagging model. Given a set of known-good groups (albums, artists), the
//! tracks of other groups are scored with COPOD and explained tag by tag.
//!
//! # Architecture
//!
//! ```text
//! Audio → Decode → Mel → Patches → Tagging model → Mean → LibraryIndex (JSON)
//! LibraryIndex + groups → Subset → OutlierScorer → CSV report + evaluation
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use genreod_core::{Config, DetectionJob};
//!
//! let config = Config::load()?;
//! let job = DetectionJob {
//!     library_root: "/music".into(),
//!     snapshot: "library.json".into(),
//!     inliers: vec!["Artist/Album".into()],
//!     outliers: vec!["Other Artist".into()],
//!     output: "out.csv".into(),
//!     weighted: true,
//! };
//! let summary = job.run(&config)?;
//! println!("{} flagged", summary.flagged);
//! ```

pub mod audio;
pub mod config;
pub mod detect;
pub mod error;
pub mod job;
pub mod library;
pub mod math;
pub mod report;
pub mod tagging;

pub use audio::AudioFrontend;
pub use config::Config;
pub use detect::{Detection, OutlierResult, OutlierScorer};
pub use error::{
    ConfigError, DetectError, GenreodError, LibraryError, PipelineError, PipelineResult, Result,
};
pub use job::{DetectionJob, JobSummary};
pub use library::{BuildStats, IndexBuilder, LibraryIndex, Subset, SubsetSelector, TrackVector};
pub use report::{Evaluation, ReportWriter};
pub use tagging::{OnnxTagger, TagVectorExtractor, TagVocabulary, TaggingModel};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
