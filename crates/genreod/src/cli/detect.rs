//! The `genreod detect` command: score groups against a reference set.

use std::path::PathBuf;

use clap::Args;
use genreod_core::config::MissPolicy;
use genreod_core::{Config, DetectionJob, JobSummary};

use super::expand;

/// Arguments for the `detect` command.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Library root the snapshot was built from
    #[arg(short, long)]
    pub library: PathBuf,

    /// Library snapshot written by `genreod index`
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Reference group (directory relative to the library root); repeatable
    #[arg(long = "inlier", required = true)]
    pub inliers: Vec<PathBuf>,

    /// Candidate group, sampled one track per directory; repeatable
    #[arg(long = "outlier")]
    pub outliers: Vec<PathBuf>,

    /// CSV report destination
    #[arg(short, long, default_value = "out.csv")]
    pub output: PathBuf,

    /// Rank by raw COPOD contributions instead of reweighting by tag strength
    #[arg(long)]
    pub unweighted: bool,

    /// Fail when a file under a group has no snapshot entry
    #[arg(long)]
    pub strict: bool,
}

/// Execute the detect command.
pub async fn execute(args: DetectArgs, mut config: Config) -> anyhow::Result<()> {
    let snapshot = expand(&args.snapshot);
    if !snapshot.exists() {
        anyhow::bail!(
            "Snapshot not found: {:?}\n\n  Hint: Build one with `genreod index <library>`.",
            snapshot
        );
    }
    if args.strict {
        config.detection.on_missing = MissPolicy::Fail;
    }

    let job = DetectionJob {
        library_root: expand(&args.library),
        snapshot,
        inliers: args.inliers,
        outliers: args.outliers,
        output: expand(&args.output),
        weighted: config.detection.weighted && !args.unweighted,
    };

    let summary = tokio::task::spawn_blocking(move || job.run(&config)).await??;
    print_summary(&summary);
    Ok(())
}

/// Print the run summary and evaluation.
fn print_summary(summary: &JobSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("             Detection");
    eprintln!("  ====================================");
    eprintln!("    Inliers:      {:>8}", summary.inliers);
    eprintln!("    Candidates:   {:>8}", summary.outliers);
    if summary.skipped > 0 {
        eprintln!("    Not indexed:  {:>8}", summary.skipped);
    }
    eprintln!("    Flagged:      {:>8}", summary.flagged);
    eprintln!("    Threshold:    {:>8.3}", summary.threshold);
    eprintln!("    Contamination:{:>8.3}", summary.contamination);

    if let Some(eval) = &summary.evaluation {
        let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
        let c = &eval.confusion;
        eprintln!("  ------------------------------------");
        eprintln!("    ROC AUC:      {:>8}", fmt(eval.roc_auc));
        eprintln!("    Prec @ n:     {:>8}", fmt(eval.precision_at_n));
        eprintln!("    Accuracy:     {:>8.4}", c.accuracy());
        eprintln!("    Precision:    {:>8.4}", c.precision());
        eprintln!("    Recall:       {:>8.4}", c.recall());
        eprintln!("    F1:           {:>8.4}", c.f1());
    }
    eprintln!("  ====================================");
    println!("Report written to: {}", summary.output.display());
}
