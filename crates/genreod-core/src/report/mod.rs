//! Detection output: the CSV report and the evaluation summary.

pub mod metrics;
pub mod writer;

pub use metrics::{precision_at_rank_n, roc_auc, Confusion, Evaluation};
pub use writer::{format_explanation, format_score, ReportWriter, HEADER};
