//! CSV report of a detection run.
//!
//! One row per scored record:
//!
//! ```text
//! Truth,Fitted,OD,File Path,Judgement
//! 1,1,2.197,Artist/Album/03.mp3,"more tag2:0.989(0.900/0.200), less tag1:0.879(0.100/0.800)"
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::detect::{OutlierResult, TagContribution};
use crate::error::{GenreodError, Result};

/// Column names, in order.
pub const HEADER: [&str; 5] = ["Truth", "Fitted", "OD", "File Path", "Judgement"];

/// Writes detection results as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    library_root: PathBuf,
    rows_written: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Create (or truncate) a report file.
    pub fn create(path: &Path, library_root: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), library_root))
    }
}

impl<W: Write> ReportWriter<W> {
    /// Wrap a writer. Paths in the report are made relative to `library_root`.
    pub fn new(writer: W, library_root: &Path) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            library_root: library_root.to_path_buf(),
            rows_written: 0,
        }
    }

    /// Write the header row.
    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(HEADER)?;
        Ok(())
    }

    /// Write one result row for the track at `path`.
    pub fn write_result(&mut self, path: &Path, result: &OutlierResult) -> Result<()> {
        let relative = relative_path(path, &self.library_root);
        self.writer.write_record([
            result.truth.to_string(),
            result.predicted.to_string(),
            format_score(result.score),
            relative.to_string_lossy().into_owned(),
            format_explanation(&result.explanation),
        ])?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write the header followed by every `(path, result)` pair.
    pub fn write_report<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a Path, &'a OutlierResult)>,
    {
        self.write_header()?;
        for (path, result) in rows {
            self.write_result(path, result)?;
        }
        self.flush()
    }

    /// Number of result rows written (header excluded).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| GenreodError::Io(e.into_error()))
    }
}

/// Score with three decimals.
pub fn format_score(score: f64) -> String {
    format!("{:.3}", score)
}

/// `"<dir> <tag>:<contribution>(<observed>/<median>)"` fragments joined by `", "`.
pub fn format_explanation(explanation: &[TagContribution]) -> String {
    explanation
        .iter()
        .map(|c| {
            format!(
                "{} {}:{:.3}({:.3}/{:.3})",
                c.direction, c.tag, c.contribution, c.observed, c.median
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `path` relative to `root`, or `path` itself when it is not under `root`.
pub fn relative_path(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Direction;

    fn result() -> OutlierResult {
        OutlierResult {
            truth: 1,
            predicted: 1,
            score: 2.0,
            explanation: vec![
                TagContribution {
                    direction: Direction::More,
                    tag: "tag2".into(),
                    contribution: 0.9887,
                    observed: 0.9,
                    median: 0.2,
                },
                TagContribution {
                    direction: Direction::Less,
                    tag: "tag1".into(),
                    contribution: 0.8789,
                    observed: 0.1,
                    median: 0.8,
                },
            ],
        }
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(2.0), "2.000");
        assert_eq!(format_score(0.81093), "0.811");
    }

    #[test]
    fn test_format_explanation() {
        assert_eq!(
            format_explanation(&result().explanation),
            "more tag2:0.989(0.900/0.200), less tag1:0.879(0.100/0.800)"
        );
        assert_eq!(format_explanation(&[]), "");
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/music");
        assert_eq!(
            relative_path(Path::new("/music/A/b.mp3"), root),
            PathBuf::from("A/b.mp3")
        );
        assert_eq!(
            relative_path(Path::new("/elsewhere/b.mp3"), root),
            PathBuf::from("/elsewhere/b.mp3")
        );
    }

    #[test]
    fn test_report_rows() {
        let mut writer = ReportWriter::new(Vec::new(), Path::new("/music"));
        let r = result();
        writer
            .write_report([(Path::new("/music/A/03.mp3"), &r)])
            .unwrap();
        assert_eq!(writer.rows_written(), 1);

        let csv = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Truth,Fitted,OD,File Path,Judgement"));
        assert_eq!(
            lines.next(),
            Some("1,1,2.000,A/03.mp3,\"more tag2:0.989(0.900/0.200), less tag1:0.879(0.100/0.800)\"")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("out.csv");
        let mut writer = ReportWriter::create(&path, dir.path()).unwrap();
        writer.write_report(std::iter::empty()).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().collect::<Vec<_>>(),
            vec!["Truth,Fitted,OD,File Path,Judgement"]
        );
    }
}
