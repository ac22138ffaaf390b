//! Index construction: discover, decode, tag, append.

use std::path::Path;
use std::time::Instant;

use crate::audio::AudioFrontend;
use crate::config::{Config, FailurePolicy};
use crate::error::{GenreodError, PipelineError, Result};
use crate::tagging::{TagVectorExtractor, TaggingModel};

use super::discovery::{DiscoveredFile, FileDiscovery};
use super::index::{LibraryIndex, TrackVector};

/// Counters from one build run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Tracks tagged and appended
    pub indexed: usize,
    /// Tracks already present in the index
    pub existing: usize,
    /// Tracks shorter than one patch
    pub too_short: usize,
    /// Tracks that failed to decode or tag
    pub failed: usize,
}

/// Builds or extends a [`LibraryIndex`] from audio files on disk.
pub struct IndexBuilder<'m> {
    frontend: AudioFrontend,
    extractor: TagVectorExtractor<'m>,
    discovery: FileDiscovery,
    on_error: FailurePolicy,
}

impl<'m> IndexBuilder<'m> {
    /// Create a builder driving `model` with the configured front-end.
    pub fn new(config: &Config, model: &'m dyn TaggingModel) -> Result<Self> {
        Ok(Self {
            frontend: AudioFrontend::new(&config.audio, &config.tagging)?,
            extractor: TagVectorExtractor::new(model, config.tagging.batch_size)?,
            discovery: FileDiscovery::new(&config.library),
            on_error: config.library.on_error,
        })
    }

    /// Find every supported audio file under `root`, sorted by path.
    pub fn discover(&self, root: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(root)
    }

    /// Tag a single file.
    pub fn process_file(&self, path: &Path) -> std::result::Result<TrackVector, PipelineError> {
        let start = Instant::now();
        tracing::debug!("Tagging: {:?}", path);

        let patches = self.frontend.patches(path)?;
        let patch_time = start.elapsed();
        tracing::trace!("  Decode + patches: {:?} ({} patches)", patch_time, patches.dim().0);

        let vector = self.extractor.extract(&patches)?;
        tracing::trace!("  Tagging: {:?}", start.elapsed() - patch_time);

        tracing::debug!("Tagged {:?} in {:?}", path, start.elapsed());
        Ok(TrackVector {
            path: path.to_path_buf(),
            vector,
        })
    }

    /// Scan `root` and build a fresh index.
    pub fn build(&self, root: &Path) -> Result<(LibraryIndex, BuildStats)> {
        let files = self.discover(root);
        let mut index = LibraryIndex::new();
        let stats = self.build_into(&mut index, &files, |_| {})?;
        Ok((index, stats))
    }

    /// Tag `files` in order and append them to `index`.
    ///
    /// Files already in the index are left alone. `on_file` is called once
    /// per file after it has been handled, whatever the outcome.
    pub fn build_into<F>(
        &self,
        index: &mut LibraryIndex,
        files: &[DiscoveredFile],
        mut on_file: F,
    ) -> Result<BuildStats>
    where
        F: FnMut(&Path),
    {
        let vocabulary = self.extractor.vocabulary();
        let mut stats = BuildStats::default();
        let start = Instant::now();

        for file in files {
            let path = file.path.as_path();
            if index.lookup(path).is_some() {
                tracing::debug!("Already indexed: {:?}", path);
                stats.existing += 1;
                on_file(path);
                continue;
            }

            match self.process_file(path) {
                Ok(track) => {
                    index.push(vocabulary, track)?;
                    stats.indexed += 1;
                }
                Err(PipelineError::InsufficientAudioLength {
                    frames,
                    frame_length,
                }) => {
                    tracing::warn!(
                        "Skipping {:?}: {} frames is shorter than one {}-frame patch",
                        path,
                        frames,
                        frame_length
                    );
                    stats.too_short += 1;
                }
                Err(e) => match self.on_error {
                    FailurePolicy::Skip => {
                        tracing::warn!("Failed to tag {:?}: {}", path, e);
                        stats.failed += 1;
                    }
                    FailurePolicy::Abort => return Err(GenreodError::Pipeline(e)),
                },
            }
            on_file(path);
        }

        tracing::info!(
            "Indexed {} tracks in {:?} ({} existing, {} too short, {} failed)",
            stats.indexed,
            start.elapsed(),
            stats.existing,
            stats.too_short,
            stats.failed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use crate::tagging::{ModelOutput, TagVocabulary};
    use ndarray::{Array2, ArrayView3};
    use std::path::PathBuf;

    /// Scores every patch by its mean log-mel energy.
    struct EnergyModel(TagVocabulary);

    impl EnergyModel {
        fn new() -> Self {
            Self(TagVocabulary::new(vec!["loud".into(), "quiet".into()]).unwrap())
        }
    }

    impl TaggingModel for EnergyModel {
        fn vocabulary(&self) -> &TagVocabulary {
            &self.0
        }

        fn predict(
            &self,
            patches: ArrayView3<'_, f32>,
        ) -> std::result::Result<ModelOutput, PipelineError> {
            let batch = patches.dim().0;
            let mut probs = Array2::zeros((batch, 2));
            for (i, patch) in patches.outer_iter().enumerate() {
                let energy = patch.mean().unwrap_or(0.0);
                let loud = (energy / 5.0).clamp(0.0, 1.0);
                probs[[i, 0]] = loud;
                probs[[i, 1]] = 1.0 - loud;
            }
            Ok(ModelOutput::probabilities(probs))
        }
    }

    fn write_tone(path: &Path, seconds: f32, amplitude: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (seconds * 16000.0) as usize;
        for i in 0..frames {
            let s = (i as f32 * 0.07).sin() * amplitude * i16::MAX as f32;
            writer.write_sample(s as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("Artist").join("Album");
        std::fs::create_dir_all(&album).unwrap();
        write_tone(&album.join("01.wav"), 4.0, 0.5);
        write_tone(&album.join("02.wav"), 4.0, 0.01);
        write_tone(&album.join("03.wav"), 1.0, 0.5);
        std::fs::write(album.join("04.mp3"), b"not audio").unwrap();
        std::fs::write(album.join("cover.jpg"), b"img").unwrap();
        dir
    }

    #[test]
    fn test_build_counts_outcomes() {
        let dir = library();
        let model = EnergyModel::new();
        let builder = IndexBuilder::new(&Config::default(), &model).unwrap();

        let (index, stats) = builder.build(dir.path()).unwrap();
        assert_eq!(
            stats,
            BuildStats {
                indexed: 2,
                existing: 0,
                too_short: 1,
                failed: 1,
            }
        );
        assert_eq!(index.vocabulary().unwrap().tags(), model.tags());

        let paths: Vec<PathBuf> = index.entries().iter().map(|e| e.path.clone()).collect();
        let album = dir.path().join("Artist").join("Album");
        assert_eq!(paths, vec![album.join("01.wav"), album.join("02.wav")]);
        for entry in index.entries() {
            assert_eq!(entry.vector.len(), 2);
            assert!(entry.vector.iter().all(|v| (0.0..=1.0).contains(v)));
        }

        let loud = &index.lookup(&album.join("01.wav")).unwrap().vector;
        let quiet = &index.lookup(&album.join("02.wav")).unwrap().vector;
        assert!(loud[0] > quiet[0]);
    }

    #[test]
    fn test_abort_policy_returns_error() {
        let dir = library();
        let model = EnergyModel::new();
        let mut config = Config::default();
        config.library.on_error = FailurePolicy::Abort;
        let builder = IndexBuilder::new(&config, &model).unwrap();

        let err = builder.build(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            GenreodError::Pipeline(PipelineError::Decode { .. })
        ));
    }

    #[test]
    fn test_build_into_skips_existing_and_reports_progress() {
        let dir = library();
        let model = EnergyModel::new();
        let builder = IndexBuilder::new(&Config::default(), &model).unwrap();
        let files = builder.discover(dir.path());
        assert_eq!(files.len(), 4);

        let mut index = LibraryIndex::new();
        builder.build_into(&mut index, &files, |_| {}).unwrap();

        let mut seen = 0;
        let stats = builder
            .build_into(&mut index, &files, |_| seen += 1)
            .unwrap();
        assert_eq!(seen, 4);
        assert_eq!(stats.existing, 2);
        assert_eq!(stats.indexed, 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_foreign_vocabulary_aborts_build() {
        let dir = library();
        let model = EnergyModel::new();
        let builder = IndexBuilder::new(&Config::default(), &model).unwrap();
        let files = builder.discover(dir.path());

        let mut index =
            LibraryIndex::with_vocabulary(TagVocabulary::new(vec!["rock".into()]).unwrap());
        let err = builder.build_into(&mut index, &files, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            GenreodError::Library(LibraryError::VocabularyMismatch {
                expected: 1,
                actual: 2,
                ..
            })
        ));
        assert!(index.is_empty());
    }
}
