//! The library side of the pipeline.
//!
//! - **discovery**: Walk directories for supported audio files
//! - **index**: Track vectors, path lookup, JSON snapshots
//! - **builder**: Tag every discovered file into an index
//! - **subset**: Select index entries by directory group

pub mod builder;
pub mod discovery;
pub mod index;
pub mod subset;

pub use builder::{BuildStats, IndexBuilder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use index::{LibraryIndex, TrackVector};
pub use subset::{Subset, SubsetSelector};
