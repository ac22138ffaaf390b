//! Outlier detection over tag vectors.

pub mod copod;
pub mod scorer;

pub use copod::{contamination_for_split, Copod, CopodFit};
pub use scorer::{
    tag_weight, Detection, Direction, OutlierResult, OutlierScorer, TagContribution,
};
