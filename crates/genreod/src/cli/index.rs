//! The `genreod index` command: tag a library into a snapshot.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use genreod_core::config::FailurePolicy;
use genreod_core::library::FileDiscovery;
use genreod_core::{BuildStats, Config, IndexBuilder, LibraryIndex, OnnxTagger};

use super::{create_progress_bar, expand};

/// Arguments for the `index` command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Library root to scan
    #[arg(required = true)]
    pub library: PathBuf,

    /// Snapshot file to write
    #[arg(short, long, default_value = "library.json")]
    pub output: PathBuf,

    /// Keep entries from an existing snapshot and tag only new files
    #[arg(long)]
    pub update: bool,

    /// Stop at the first file that fails to decode or tag
    #[arg(long)]
    pub fail_fast: bool,

    /// Patches per model invocation
    #[arg(long)]
    pub batch_size: Option<usize>,
}

/// Execute the index command.
pub async fn execute(args: IndexArgs, mut config: Config) -> anyhow::Result<()> {
    let library = expand(&args.library);
    if !library.is_dir() {
        anyhow::bail!(
            "Library root is not a directory: {:?}\n\n  Hint: Check the path and try again.",
            library
        );
    }

    if args.fail_fast {
        config.library.on_error = FailurePolicy::Abort;
    }
    if let Some(batch_size) = args.batch_size {
        config.tagging.batch_size = batch_size;
    }

    let model_dir = config.tagging_model_dir();
    if !OnnxTagger::model_exists(&model_dir) {
        anyhow::bail!(
            "Tagging model not found at {:?}\n\n  Hint: Place model.onnx (and optionally labels.txt) there, \
             or point [general] model_dir / [tagging] model at it.",
            OnnxTagger::model_path(&model_dir)
        );
    }

    let output = expand(&args.output);
    let update = args.update;
    tokio::task::spawn_blocking(move || run(&config, &model_dir, &library, &output, update))
        .await?
}

fn run(
    config: &Config,
    model_dir: &Path,
    library: &Path,
    output: &Path,
    update: bool,
) -> anyhow::Result<()> {
    let model = OnnxTagger::load(model_dir, &config.tagging)?;
    let builder = IndexBuilder::new(config, &model)?;

    let mut index = if update && output.exists() {
        LibraryIndex::load(output)?
    } else {
        LibraryIndex::new()
    };

    let files = builder.discover(library);
    if files.is_empty() {
        tracing::warn!("No supported audio files found under {:?}", library);
        return Ok(());
    }
    tracing::info!(
        "Found {} audio file(s) ({:.1} MB)",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );

    let start = Instant::now();
    let pb = create_progress_bar(files.len() as u64);
    let result = builder.build_into(&mut index, &files, |path| {
        if let Some(name) = path.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.inc(1);
    });
    pb.finish_and_clear();
    let stats = result?;

    if index.is_empty() {
        tracing::warn!("No tracks could be tagged; snapshot not written");
    } else {
        index.save(output)?;
        println!("Snapshot written to: {}", output.display());
    }
    print_summary(&stats, index.len(), start.elapsed());
    Ok(())
}

/// Print a formatted summary table after indexing.
fn print_summary(stats: &BuildStats, entries: usize, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        stats.indexed as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Indexed:      {:>8}", stats.indexed);
    if stats.existing > 0 {
        eprintln!("    Existing:     {:>8}", stats.existing);
    }
    if stats.too_short > 0 {
        eprintln!("    Too short:    {:>8}", stats.too_short);
    }
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Entries:      {:>8}", entries);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} tracks/sec", rate);
    eprintln!("  ====================================");
}
