//! The library index: one tag vector per track under a shared vocabulary.
//!
//! Persisted as a single JSON snapshot:
//!
//! ```json
//! {"vocabulary": ["rock", "pop"], "entries": [{"path": "/music/a.mp3", "vector": [0.8, 0.1]}]}
//! ```
//!
//! The path lookup table is rebuilt on load and never written.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LibraryError;
use crate::tagging::TagVocabulary;

/// A track and its mean tag probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackVector {
    /// Path of the audio file as discovered during the scan
    pub path: PathBuf,
    /// Per-tag mean probability, in vocabulary order
    pub vector: Vec<f32>,
}

/// On-disk layout. `vocabulary` is optional here so a missing field can be
/// reported as a format error rather than a generic parse error.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    vocabulary: Option<Vec<String>>,
    #[serde(default)]
    entries: Vec<TrackVector>,
}

/// Append-only collection of track vectors.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    vocabulary: Option<TagVocabulary>,
    entries: Vec<TrackVector>,
    by_path: HashMap<PathBuf, usize>,
}

impl LibraryIndex {
    /// An empty index; the first pushed entry's vocabulary becomes the index's.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index with the vocabulary fixed up front.
    pub fn with_vocabulary(vocabulary: TagVocabulary) -> Self {
        Self {
            vocabulary: Some(vocabulary),
            ..Self::default()
        }
    }

    /// The established vocabulary, if any entry or constructor set one.
    pub fn vocabulary(&self) -> Option<&TagVocabulary> {
        self.vocabulary.as_ref()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[TrackVector] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a track vector produced under `vocabulary`.
    ///
    /// The first push establishes the vocabulary when none is set. A vector
    /// whose length or vocabulary disagrees with the established one is
    /// rejected with `VocabularyMismatch`; a repeated path with `DuplicatePath`.
    pub fn push(
        &mut self,
        vocabulary: &TagVocabulary,
        track: TrackVector,
    ) -> Result<(), LibraryError> {
        let established = self.vocabulary.as_ref().unwrap_or(vocabulary);
        if track.vector.len() != established.len() || established != vocabulary {
            return Err(LibraryError::VocabularyMismatch {
                path: track.path,
                expected: established.len(),
                actual: track.vector.len(),
            });
        }
        if self.by_path.contains_key(&track.path) {
            return Err(LibraryError::DuplicatePath(track.path));
        }

        if self.vocabulary.is_none() {
            self.vocabulary = Some(vocabulary.clone());
        }
        self.by_path.insert(track.path.clone(), self.entries.len());
        self.entries.push(track);
        Ok(())
    }

    /// Find the entry for an exact path.
    pub fn lookup(&self, path: &Path) -> Option<&TrackVector> {
        self.by_path.get(path).map(|&row| &self.entries[row])
    }

    /// Write the snapshot as JSON.
    ///
    /// An index without a vocabulary cannot be reloaded, so it is refused.
    pub fn save(&self, path: &Path) -> Result<(), LibraryError> {
        let vocabulary = self.vocabulary.as_ref().ok_or_else(|| {
            LibraryError::InvalidIndexFormat("cannot save an index without a vocabulary".into())
        })?;

        let io_err = |source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let snapshot = Snapshot {
            vocabulary: Some(vocabulary.tags().to_vec()),
            entries: self.entries.clone(),
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer(&mut writer, &snapshot)
            .map_err(|e| LibraryError::InvalidIndexFormat(e.to_string()))?;
        writer.flush().map_err(io_err)?;

        tracing::info!("Saved index with {} entries to {:?}", self.len(), path);
        Ok(())
    }

    /// Load a snapshot written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let file = File::open(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_reader(BufReader::new(file))?;
        tracing::info!("Loaded index with {} entries from {:?}", index.len(), path);
        Ok(index)
    }

    /// Parse a snapshot from any reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LibraryError> {
        let snapshot: Snapshot = serde_json::from_reader(reader)
            .map_err(|e| LibraryError::InvalidIndexFormat(e.to_string()))?;

        let tags = snapshot
            .vocabulary
            .ok_or_else(|| LibraryError::InvalidIndexFormat("missing vocabulary".into()))?;
        let vocabulary = TagVocabulary::new(tags).map_err(LibraryError::InvalidIndexFormat)?;

        let mut index = Self::with_vocabulary(vocabulary.clone());
        for entry in snapshot.entries {
            index.push(&vocabulary, entry).map_err(|e| match e {
                LibraryError::VocabularyMismatch {
                    path,
                    expected,
                    actual,
                } => LibraryError::InvalidIndexFormat(format!(
                    "entry {:?} has {} values, vocabulary has {}",
                    path, actual, expected
                )),
                LibraryError::DuplicatePath(path) => {
                    LibraryError::InvalidIndexFormat(format!("duplicate entry {:?}", path))
                }
                other => other,
            })?;
        }
        Ok(index)
    }
}
