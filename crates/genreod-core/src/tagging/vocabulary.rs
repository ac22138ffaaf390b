//! Tag vocabulary: the ordered tag names that fix vector dimensionality.
//!
//! A vocabulary is loaded from a model's `labels.txt` (one tag per line, `#`
//! comments allowed) or falls back to the built-in Million Song Dataset tags.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// The 50 Million Song Dataset tags, in model output order.
pub const MSD_TAGS: [&str; 50] = [
    "rock",
    "pop",
    "alternative",
    "indie",
    "electronic",
    "female vocalists",
    "dance",
    "00s",
    "alternative rock",
    "jazz",
    "beautiful",
    "metal",
    "chillout",
    "male vocalists",
    "classic rock",
    "soul",
    "indie rock",
    "Mellow",
    "electronica",
    "80s",
    "folk",
    "90s",
    "chill",
    "instrumental",
    "punk",
    "oldies",
    "blues",
    "hard rock",
    "ambient",
    "acoustic",
    "experimental",
    "female vocalist",
    "guitar",
    "Hip-Hop",
    "70s",
    "party",
    "country",
    "easy listening",
    "sexy",
    "catchy",
    "funk",
    "electro",
    "heavy metal",
    "Progressive rock",
    "60s",
    "rnb",
    "indie pop",
    "sad",
    "House",
    "happy",
];

/// Ordered, duplicate-free list of tag names.
///
/// Serializes as a plain JSON array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TagVocabulary {
    tags: Vec<String>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl TagVocabulary {
    /// Build a vocabulary, rejecting empty lists and duplicate names.
    pub fn new(tags: Vec<String>) -> Result<Self, String> {
        if tags.is_empty() {
            return Err("vocabulary must contain at least one tag".to_string());
        }
        let mut by_name = HashMap::with_capacity(tags.len());
        for (i, tag) in tags.iter().enumerate() {
            if by_name.insert(tag.clone(), i).is_some() {
                return Err(format!("duplicate tag {tag:?}"));
            }
        }
        Ok(Self { tags, by_name })
    }

    /// The built-in MSD vocabulary.
    pub fn msd() -> Self {
        let tags: Vec<String> = MSD_TAGS.iter().map(|t| t.to_string()).collect();
        let by_name = tags
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { tags, by_name }
    }

    /// Load `labels.txt`-style content: one tag per line, `#` comments ignored.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Model {
            message: format!("Failed to read {:?}: {}", path, e),
        })?;
        let tags: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        let vocab = Self::new(tags).map_err(|message| PipelineError::Model {
            message: format!("Invalid labels file {:?}: {}", path, message),
        })?;
        tracing::info!("Loaded vocabulary: {} tags from {:?}", vocab.len(), path);
        Ok(vocab)
    }

    /// All tags in order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the vocabulary is empty (never true for a constructed value).
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Column index of a tag.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

impl TryFrom<Vec<String>> for TagVocabulary {
    type Error = String;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(tags)
    }
}

impl From<TagVocabulary> for Vec<String> {
    fn from(vocab: TagVocabulary) -> Self {
        vocab.tags
    }
}
