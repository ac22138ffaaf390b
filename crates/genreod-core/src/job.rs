//! A detection run: select inliers and candidates, score, report, evaluate.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::detect::OutlierScorer;
use crate::error::Result;
use crate::library::{LibraryIndex, SubsetSelector};
use crate::report::{Evaluation, ReportWriter};

/// Everything one detection run needs besides the global config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionJob {
    /// Library root; groups and report paths are relative to it
    pub library_root: PathBuf,
    /// Index snapshot to score against
    pub snapshot: PathBuf,
    /// Groups whose tracks form the inlier set
    pub inliers: Vec<PathBuf>,
    /// Groups sampled one track per directory as candidates
    #[serde(default)]
    pub outliers: Vec<PathBuf>,
    /// CSV report destination
    pub output: PathBuf,
    /// Reweight contributions by `max(value, median)`
    pub weighted: bool,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct JobSummary {
    /// Inlier records scored
    pub inliers: usize,
    /// Candidate records scored
    pub outliers: usize,
    /// Files under the groups that had no index entry
    pub skipped: usize,
    /// Records labelled as outliers
    pub flagged: usize,
    pub threshold: f64,
    pub contamination: f64,
    /// Present when outlier groups were given
    pub evaluation: Option<Evaluation>,
    pub output: PathBuf,
}

impl DetectionJob {
    /// Load the snapshot and run.
    pub fn run(&self, config: &Config) -> Result<JobSummary> {
        let index = LibraryIndex::load(&self.snapshot)?;
        self.run_with_index(&index, config)
    }

    /// Run against an index already in memory.
    pub fn run_with_index(&self, index: &LibraryIndex, config: &Config) -> Result<JobSummary> {
        let start = Instant::now();
        let root = self.library_root.as_path();

        let selector = SubsetSelector::new(index, &config.library, config.detection.on_missing)?;
        let mut subset = selector.build_subset(root, &self.inliers)?;
        let inliers = subset.len();
        selector.pick_into(&mut subset, root, &self.outliers)?;
        let outliers = subset.len() - inliers;
        tracing::info!(
            "Selected {} inlier and {} candidate tracks ({} not indexed)",
            inliers,
            outliers,
            subset.skipped()
        );

        let scorer = OutlierScorer::from_config(&config.detection).weighted(self.weighted);
        let detection = scorer.score_subset(&subset, inliers)?;

        let mut writer = ReportWriter::create(&self.output, root)?;
        let paths = subset.entries().iter().map(|e| e.path.as_path());
        writer.write_report(paths.zip(&detection.results))?;
        tracing::info!("Wrote {} rows to {:?}", writer.rows_written(), self.output);

        let evaluation = if self.outliers.is_empty() {
            None
        } else {
            let eval = Evaluation::from_labels(&detection.truth(), &detection.predicted());
            log_evaluation(&eval);
            Some(eval)
        };

        tracing::info!(
            "Detection finished in {:?}: {} of {} flagged",
            start.elapsed(),
            detection.flagged(),
            subset.len()
        );
        Ok(JobSummary {
            inliers,
            outliers,
            skipped: subset.skipped(),
            flagged: detection.flagged(),
            threshold: detection.threshold,
            contamination: detection.contamination,
            evaluation,
            output: self.output.clone(),
        })
    }
}

fn log_evaluation(eval: &Evaluation) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
    let c = &eval.confusion;
    tracing::info!(
        "Genre COPOD ROC:{}, precision @ rank n:{}",
        fmt(eval.roc_auc),
        fmt(eval.precision_at_n)
    );
    tracing::info!(
        "tp={} fp={} tn={} fn={} accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
        c.true_positives,
        c.false_positives,
        c.true_negatives,
        c.false_negatives,
        c.accuracy(),
        c.precision(),
        c.recall(),
        c.f1()
    );
}
