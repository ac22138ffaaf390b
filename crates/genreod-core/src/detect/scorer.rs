//! Outlier scoring with per-tag reweighting and explanations.
//!
//! Rows `0..inliers` are the known-good set; the remaining rows are the
//! candidates. COPOD is fitted on all rows. When weighting is on, each
//! contribution is scaled by `max(observed, median)` so tags that are strong
//! in a track, or typical of the set, dominate the ranking. Labels always
//! come from the unweighted fit.

use std::cmp::Ordering;
use std::fmt;

use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::Serialize;

use crate::config::DetectionConfig;
use crate::error::DetectError;
use crate::library::Subset;
use crate::math;

use super::copod::{contamination_for_split, Copod};

/// Whether a tag is above or below the set's median.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    More,
    Less,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::More => write!(f, "more"),
            Direction::Less => write!(f, "less"),
        }
    }
}

/// One tag's share of a record's outlier score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagContribution {
    pub direction: Direction,
    pub tag: String,
    /// (Re)weighted contribution to the score
    pub contribution: f64,
    /// The record's value for this tag
    pub observed: f64,
    /// Median of this tag over all scored records
    pub median: f64,
}

/// Scoring outcome for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierResult {
    /// 0 for inliers, 1 for candidate outliers
    pub truth: u8,
    /// COPOD label: 1 when the unweighted score exceeds the threshold
    pub predicted: u8,
    /// Outlier score, reweighted when enabled
    pub score: f64,
    /// Every tag, largest contribution first
    pub explanation: Vec<TagContribution>,
}

/// All records of one scoring run, in input order.
#[derive(Debug, Clone)]
pub struct Detection {
    pub results: Vec<OutlierResult>,
    /// Per-tag medians
    pub medians: Vec<f64>,
    /// Unweighted decision threshold
    pub threshold: f64,
    pub contamination: f64,
    pub weighted: bool,
}

impl Detection {
    /// Ground-truth labels in record order.
    pub fn truth(&self) -> Vec<u8> {
        self.results.iter().map(|r| r.truth).collect()
    }

    /// Predicted labels in record order.
    pub fn predicted(&self) -> Vec<u8> {
        self.results.iter().map(|r| r.predicted).collect()
    }

    /// Number of records labelled as outliers.
    pub fn flagged(&self) -> usize {
        self.results.iter().filter(|r| r.predicted == 1).count()
    }
}

/// Weight applied to a contribution: the larger of the observed value and
/// the tag's median.
pub fn tag_weight(observed: f64, median: f64) -> f64 {
    observed.max(median)
}

/// Scores a matrix with COPOD and explains each record.
#[derive(Debug, Clone, Copy)]
pub struct OutlierScorer {
    weighted: bool,
    default_contamination: f64,
}

impl OutlierScorer {
    pub fn new(weighted: bool) -> Self {
        Self {
            weighted,
            default_contamination: DetectionConfig::default().default_contamination,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            weighted: config.weighted,
            default_contamination: config.default_contamination,
        }
    }

    /// Override the weighting flag.
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Score a subset whose first `inliers` entries are the inlier set.
    pub fn score_subset(&self, subset: &Subset, inliers: usize) -> Result<Detection, DetectError> {
        self.score(subset.matrix().view(), subset.vocabulary().tags(), inliers)
    }

    /// Score `data` (records × tags); rows before `inliers` are truth 0.
    pub fn score(
        &self,
        data: ArrayView2<'_, f64>,
        tags: &[String],
        inliers: usize,
    ) -> Result<Detection, DetectError> {
        let (n, d) = data.dim();
        if n < 2 {
            return Err(DetectError::InsufficientSamples { samples: n });
        }
        if inliers == 0 {
            return Err(DetectError::InvalidInput("no inlier records".to_string()));
        }
        if inliers > n {
            return Err(DetectError::InvalidInput(format!(
                "{inliers} inliers requested from {n} records"
            )));
        }
        if tags.len() != d {
            return Err(DetectError::InvalidInput(format!(
                "{} tag names for {} columns",
                tags.len(),
                d
            )));
        }

        let contamination = contamination_for_split(n, inliers, self.default_contamination);
        let fit = Copod::new(contamination)?.fit(data)?;

        let medians: Vec<f64> = data
            .axis_iter(Axis(1))
            .map(|col| math::median(&col.to_vec()).unwrap_or(0.0))
            .collect();

        let (contributions, scores) = if self.weighted {
            let mut weighted = Array2::<f64>::zeros((n, d));
            Zip::indexed(&mut weighted)
                .and(&fit.contributions)
                .for_each(|(i, j), w, &o| *w = o * tag_weight(data[[i, j]], medians[j]));
            let scores = weighted.sum_axis(Axis(1)).to_vec();
            (weighted, scores)
        } else {
            (fit.contributions.clone(), fit.scores.clone())
        };

        let results = (0..n)
            .map(|i| {
                let mut explanation: Vec<TagContribution> = (0..d)
                    .map(|j| {
                        let observed = data[[i, j]];
                        TagContribution {
                            direction: if observed > medians[j] {
                                Direction::More
                            } else {
                                Direction::Less
                            },
                            tag: tags[j].clone(),
                            contribution: contributions[[i, j]],
                            observed,
                            median: medians[j],
                        }
                    })
                    .collect();
                // Stable: ties keep vocabulary order.
                explanation.sort_by(|a, b| {
                    b.contribution
                        .partial_cmp(&a.contribution)
                        .unwrap_or(Ordering::Equal)
                });

                OutlierResult {
                    truth: u8::from(i >= inliers),
                    predicted: fit.labels[i],
                    score: scores[i],
                    explanation,
                }
            })
            .collect();

        let detection = Detection {
            results,
            medians,
            threshold: fit.threshold,
            contamination,
            weighted: self.weighted,
        };
        tracing::debug!(
            "Scored {} records ({} inliers), contamination {:.3}, threshold {:.3}, {} flagged",
            n,
            inliers,
            contamination,
            fit.threshold,
            detection.flagged()
        );
        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tags(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("tag{i}")).collect()
    }

    fn sample() -> Array2<f64> {
        array![[0.9, 0.1], [0.8, 0.2], [0.1, 0.9]]
    }

    /// Ten records with a handful of obvious deviants at the end.
    fn library() -> Array2<f64> {
        array![
            [0.80, 0.10, 0.30],
            [0.75, 0.15, 0.35],
            [0.82, 0.12, 0.28],
            [0.78, 0.09, 0.33],
            [0.85, 0.11, 0.31],
            [0.79, 0.14, 0.29],
            [0.81, 0.13, 0.32],
            [0.20, 0.85, 0.90],
            [0.15, 0.70, 0.05],
            [0.77, 0.95, 0.30],
        ]
    }

    #[test]
    fn test_flags_and_explains_deviant_record() {
        let detection = OutlierScorer::new(true)
            .score(sample().view(), &tags(2), 2)
            .unwrap();

        assert_eq!(detection.medians, vec![0.8, 0.2]);
        assert_eq!(detection.predicted(), vec![0, 0, 1]);
        assert_eq!(detection.truth(), vec![0, 0, 1]);
        assert!((detection.contamination - 0.1).abs() < 1e-12);

        let last = &detection.results[2];
        let first = &last.explanation[0];
        let second = &last.explanation[1];
        assert_eq!((first.direction, first.tag.as_str()), (Direction::More, "tag2"));
        assert_eq!((second.direction, second.tag.as_str()), (Direction::Less, "tag1"));
        assert!(first.contribution > second.contribution);

        let ln3 = 3f64.ln();
        assert!((first.contribution - 0.9 * ln3).abs() < 1e-9);
        assert!((second.contribution - 0.8 * ln3).abs() < 1e-9);
        assert!((last.score - 1.7 * ln3).abs() < 1e-9);
    }

    #[test]
    fn test_unweighted_scores_are_copod_scores() {
        let detection = OutlierScorer::new(false)
            .score(sample().view(), &tags(2), 2)
            .unwrap();
        let ln3 = 3f64.ln();
        assert!((detection.results[2].score - 2.0 * ln3).abs() < 1e-9);
        // Equal contributions keep vocabulary order.
        let order: Vec<&str> = detection.results[2]
            .explanation
            .iter()
            .map(|c| c.tag.as_str())
            .collect();
        assert_eq!(order, vec!["tag1", "tag2"]);
    }

    #[test]
    fn test_labels_do_not_depend_on_weighting() {
        let data = library();
        let weighted = OutlierScorer::new(true).score(data.view(), &tags(3), 7).unwrap();
        let plain = OutlierScorer::new(false).score(data.view(), &tags(3), 7).unwrap();
        assert_eq!(weighted.predicted(), plain.predicted());
        assert_eq!(weighted.threshold, plain.threshold);
        assert!((weighted.contamination - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_weighting_never_increases_contribution() {
        // Values are probabilities, so weights are at most 1.
        let data = library();
        let weighted = OutlierScorer::new(true).score(data.view(), &tags(3), 7).unwrap();
        let plain = OutlierScorer::new(false).score(data.view(), &tags(3), 7).unwrap();
        for (w, p) in weighted.results.iter().zip(&plain.results) {
            assert!(w.score <= p.score + 1e-12);
        }
    }

    #[test]
    fn test_tag_weight_monotonic() {
        let median = 0.4;
        let mut last = 0.0;
        for step in 0..=20 {
            let observed = step as f64 / 20.0;
            let w = tag_weight(observed, median);
            assert!(w >= last);
            assert!(w >= median);
            last = w;
        }
        assert_eq!(tag_weight(0.1, 0.4), 0.4);
        assert_eq!(tag_weight(0.9, 0.4), 0.9);
    }

    fn contribution(detection: &Detection, record: usize, tag: &str) -> f64 {
        detection.results[record]
            .explanation
            .iter()
            .find(|c| c.tag == tag)
            .map(|c| c.contribution)
            .unwrap()
    }

    /// Column `tag1` has median 0.3; raising one value leaves every rank as is.
    fn ranked(raised_row: usize, value: f64) -> Array2<f64> {
        let mut data = array![
            [0.10, 0.90],
            [0.20, 0.70],
            [0.30, 0.80],
            [0.50, 0.60],
            [0.60, 0.95],
        ];
        data[[raised_row, 0]] = value;
        data
    }

    #[test]
    fn test_weighted_contribution_grows_above_median() {
        let scorer = OutlierScorer::new(true);
        let before = scorer.score(ranked(3, 0.50).view(), &tags(2), 5).unwrap();
        let after = scorer.score(ranked(3, 0.55).view(), &tags(2), 5).unwrap();

        assert_eq!(before.medians, after.medians);
        assert!(contribution(&after, 3, "tag1") > contribution(&before, 3, "tag1"));
        // The untouched tag keeps its weight.
        assert_eq!(contribution(&after, 3, "tag2"), contribution(&before, 3, "tag2"));
    }

    #[test]
    fn test_weight_stays_at_median_below_it() {
        let weighted = OutlierScorer::new(true);
        let plain = OutlierScorer::new(false);
        for value in [0.10, 0.15] {
            let data = ranked(0, value);
            let w = weighted.score(data.view(), &tags(2), 5).unwrap();
            let p = plain.score(data.view(), &tags(2), 5).unwrap();
            assert_eq!(w.medians[0], 0.3);
            let ratio = contribution(&w, 0, "tag1") / contribution(&p, 0, "tag1");
            assert!((ratio - 0.3).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deterministic() {
        let data = library();
        let scorer = OutlierScorer::new(true);
        let a = scorer.score(data.view(), &tags(3), 7).unwrap();
        let b = scorer.score(data.view(), &tags(3), 7).unwrap();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn test_invalid_input() {
        let scorer = OutlierScorer::new(true);
        assert!(matches!(
            scorer.score(array![[0.5, 0.5]].view(), &tags(2), 1),
            Err(DetectError::InsufficientSamples { samples: 1 })
        ));
        assert!(matches!(
            scorer.score(sample().view(), &tags(2), 4),
            Err(DetectError::InvalidInput(_))
        ));
        assert!(matches!(
            scorer.score(sample().view(), &tags(3), 2),
            Err(DetectError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_no_inliers_is_reported() {
        let err = OutlierScorer::new(true)
            .score(sample().view(), &tags(2), 0)
            .unwrap_err();
        assert!(matches!(err, DetectError::InvalidInput(_)));
        assert!(err.to_string().contains("no inlier records"));
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::More.to_string(), "more");
        assert_eq!(Direction::Less.to_string(), "less");
    }
}
