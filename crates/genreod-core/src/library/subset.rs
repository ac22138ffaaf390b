//! Subset selection: gather index entries for tracks under named groups.
//!
//! A group is a directory relative to the library root (an artist, an album,
//! `Artist/Album`). Files are discovered the same way index builds discover
//! them and matched against the index by exact path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::config::{LibraryConfig, MissPolicy};
use crate::error::LibraryError;
use crate::tagging::TagVocabulary;

use super::discovery::FileDiscovery;
use super::index::{LibraryIndex, TrackVector};

/// A copy of selected index entries sharing the index vocabulary.
#[derive(Debug, Clone)]
pub struct Subset {
    vocabulary: TagVocabulary,
    entries: Vec<TrackVector>,
    skipped: usize,
}

impl Subset {
    /// An empty subset over `vocabulary`.
    pub fn empty(vocabulary: TagVocabulary) -> Self {
        Self {
            vocabulary,
            entries: Vec::new(),
            skipped: 0,
        }
    }

    pub fn vocabulary(&self) -> &TagVocabulary {
        &self.vocabulary
    }

    pub fn entries(&self) -> &[TrackVector] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files found on disk that had no index entry.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Stack the vectors into an (entries × tags) matrix.
    pub fn matrix(&self) -> Array2<f64> {
        let cols = self.vocabulary.len();
        Array2::from_shape_fn((self.entries.len(), cols), |(i, j)| {
            f64::from(self.entries[i].vector[j])
        })
    }
}

/// Selects index entries by directory group.
pub struct SubsetSelector<'a> {
    index: &'a LibraryIndex,
    vocabulary: &'a TagVocabulary,
    discovery: FileDiscovery,
    on_missing: MissPolicy,
}

impl<'a> SubsetSelector<'a> {
    /// Create a selector over `index`, which must have a vocabulary.
    pub fn new(
        index: &'a LibraryIndex,
        library: &LibraryConfig,
        on_missing: MissPolicy,
    ) -> Result<Self, LibraryError> {
        let vocabulary = index.vocabulary().ok_or_else(|| {
            LibraryError::InvalidIndexFormat("index has no vocabulary".to_string())
        })?;
        Ok(Self {
            index,
            vocabulary,
            discovery: FileDiscovery::new(library),
            on_missing,
        })
    }

    /// Every indexed track under `root/<group>` for each group, in group
    /// order then path order.
    pub fn build_subset<S: AsRef<Path>>(
        &self,
        root: &Path,
        groups: &[S],
    ) -> Result<Subset, LibraryError> {
        let mut subset = Subset::empty(self.vocabulary.clone());
        for dir in self.group_dirs(root, groups) {
            for file in self.discovery.discover(&dir) {
                self.select(&mut subset, &file.path)?;
            }
        }
        tracing::debug!(
            "Subset of {} groups: {} tracks, {} skipped",
            groups.len(),
            subset.len(),
            subset.skipped
        );
        Ok(subset)
    }

    /// Append at most one indexed track per directory under each group.
    ///
    /// Within a directory the first file (by path) with an index entry is
    /// taken and the rest ignored. Files without an entry never use up the
    /// directory's pick. Subdirectories are directories in their own right.
    pub fn pick_into<S: AsRef<Path>>(
        &self,
        acc: &mut Subset,
        root: &Path,
        groups: &[S],
    ) -> Result<(), LibraryError> {
        let before = acc.len();
        let mut picked: HashSet<PathBuf> = HashSet::new();
        for dir in self.group_dirs(root, groups) {
            for file in self.discovery.discover(&dir) {
                let parent = file.path.parent().map(Path::to_path_buf).unwrap_or_default();
                if picked.contains(&parent) {
                    continue;
                }
                if self.select(acc, &file.path)? {
                    picked.insert(parent);
                }
            }
        }
        tracing::debug!("Picked {} tracks from {} groups", acc.len() - before, groups.len());
        Ok(())
    }

    /// Existing group directories; missing ones are logged and dropped.
    fn group_dirs<S: AsRef<Path>>(&self, root: &Path, groups: &[S]) -> Vec<PathBuf> {
        groups
            .iter()
            .map(|g| root.join(g))
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    tracing::warn!("Group directory {:?} does not exist", dir);
                }
                exists
            })
            .collect()
    }

    /// Look up one file; returns whether it was added.
    fn select(&self, subset: &mut Subset, path: &Path) -> Result<bool, LibraryError> {
        match self.index.lookup(path) {
            Some(entry) => {
                subset.entries.push(entry.clone());
                Ok(true)
            }
            None => match self.on_missing {
                MissPolicy::Skip => {
                    tracing::debug!("Not in index: {:?}", path);
                    subset.skipped += 1;
                    Ok(false)
                }
                MissPolicy::Fail => Err(LibraryError::MissingEntry(path.to_path_buf())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> TagVocabulary {
        TagVocabulary::new(vec!["rock".into(), "jazz".into()]).unwrap()
    }

    /// Lays out files under a temp root and indexes the ones in `indexed`.
    fn fixture(files: &[&str], indexed: &[&str]) -> (tempfile::TempDir, LibraryIndex) {
        let dir = tempfile::tempdir().unwrap();
        for f in files {
            let path = dir.path().join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"x").unwrap();
        }
        let mut index = LibraryIndex::new();
        for (i, f) in indexed.iter().enumerate() {
            let v = i as f32 / 10.0;
            index
                .push(
                    &vocab(),
                    TrackVector {
                        path: dir.path().join(f),
                        vector: vec![v, 1.0 - v],
                    },
                )
                .unwrap();
        }
        (dir, index)
    }

    fn names(subset: &Subset, root: &Path) -> Vec<String> {
        subset
            .entries()
            .iter()
            .map(|e| e.path.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_subset_counts_misses() {
        let (dir, index) = fixture(
            &["A/x/1.mp3", "A/x/2.mp3", "A/y/1.mp3", "B/1.mp3", "A/x/notes.txt"],
            &["A/x/1.mp3", "A/y/1.mp3", "B/1.mp3"],
        );
        let selector =
            SubsetSelector::new(&index, &LibraryConfig::default(), MissPolicy::Skip).unwrap();

        let subset = selector.build_subset(dir.path(), &["A"]).unwrap();
        assert_eq!(names(&subset, dir.path()), vec!["A/x/1.mp3", "A/y/1.mp3"]);
        assert_eq!(subset.skipped(), 1);
        assert_eq!(subset.vocabulary(), index.vocabulary().unwrap());
        assert_eq!(subset.matrix().dim(), (2, 2));
    }

    #[test]
    fn test_build_subset_strict_miss_policy() {
        let (dir, index) = fixture(&["A/1.mp3", "A/2.mp3"], &["A/1.mp3"]);
        let selector =
            SubsetSelector::new(&index, &LibraryConfig::default(), MissPolicy::Fail).unwrap();
        let err = selector.build_subset(dir.path(), &["A"]).unwrap_err();
        assert!(matches!(err, LibraryError::MissingEntry(p) if p.ends_with("A/2.mp3")));
    }

    #[test]
    fn test_missing_group_contributes_nothing() {
        let (dir, index) = fixture(&["A/1.mp3"], &["A/1.mp3"]);
        let selector =
            SubsetSelector::new(&index, &LibraryConfig::default(), MissPolicy::Fail).unwrap();
        let subset = selector.build_subset(dir.path(), &["A", "Nope"]).unwrap();
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.skipped(), 0);
    }

    #[test]
    fn test_pick_into_one_per_directory() {
        let (dir, index) = fixture(
            &[
                "Out/album1/01.mp3",
                "Out/album1/02.mp3",
                "Out/album1/03.mp3",
                "Out/album1/disc2/01.mp3",
                "Out/album2/01.mp3",
                "Out/album2/02.mp3",
            ],
            &[
                "Out/album1/02.mp3",
                "Out/album1/03.mp3",
                "Out/album1/disc2/01.mp3",
                "Out/album2/01.mp3",
                "Out/album2/02.mp3",
            ],
        );
        let selector =
            SubsetSelector::new(&index, &LibraryConfig::default(), MissPolicy::Skip).unwrap();

        let mut acc = Subset::empty(vocab());
        selector.pick_into(&mut acc, dir.path(), &["Out"]).unwrap();

        // album1/01.mp3 is a miss and does not use up album1's pick.
        assert_eq!(
            names(&acc, dir.path()),
            vec!["Out/album1/02.mp3", "Out/album1/disc2/01.mp3", "Out/album2/01.mp3"]
        );
        assert_eq!(acc.skipped(), 1);
    }

    #[test]
    fn test_pick_into_appends_after_inliers() {
        let (dir, index) = fixture(
            &["In/a.mp3", "In/b.mp3", "Out/c.mp3", "Out/d.mp3"],
            &["In/a.mp3", "In/b.mp3", "Out/c.mp3", "Out/d.mp3"],
        );
        let selector =
            SubsetSelector::new(&index, &LibraryConfig::default(), MissPolicy::Skip).unwrap();

        let mut acc = selector.build_subset(dir.path(), &["In"]).unwrap();
        selector.pick_into(&mut acc, dir.path(), &["Out"]).unwrap();
        assert_eq!(
            names(&acc, dir.path()),
            vec!["In/a.mp3", "In/b.mp3", "Out/c.mp3"]
        );
    }

    #[test]
    fn test_selector_requires_vocabulary() {
        let index = LibraryIndex::new();
        assert!(
            SubsetSelector::new(&index, &LibraryConfig::default(), MissPolicy::Skip).is_err()
        );
    }
}
