//! Evaluation of predicted labels against the inlier/outlier split.

use std::cmp::Ordering;

use serde::Serialize;

use crate::math;

/// Confusion counts for binary labels (1 = outlier).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Confusion {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl Confusion {
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        let mut c = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t == 1, p == 1) {
                (true, true) => c.true_positives += 1,
                (false, true) => c.false_positives += 1,
                (false, false) => c.true_negatives += 1,
                (true, false) => c.false_negatives += 1,
            }
        }
        c
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// 0 when the denominator is 0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Summary printed after a detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Area under the ROC curve; `None` when only one class is present
    pub roc_auc: Option<f64>,
    /// Precision among the top-n scored records, n = number of true outliers
    pub precision_at_n: Option<f64>,
    pub confusion: Confusion,
}

impl Evaluation {
    /// Evaluate predicted labels against the truth.
    ///
    /// The labels double as the ranking scores, so ties are common and are
    /// handled by rank averaging.
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        let scores: Vec<f64> = predicted.iter().map(|&p| f64::from(p)).collect();
        Self {
            roc_auc: roc_auc(truth, &scores),
            precision_at_n: precision_at_rank_n(truth, &scores),
            confusion: Confusion::from_labels(truth, predicted),
        }
    }
}

/// ROC AUC via the Mann-Whitney U statistic with average ranks for ties.
pub fn roc_auc(truth: &[u8], scores: &[f64]) -> Option<f64> {
    let positives = truth.iter().filter(|&&t| t == 1).count();
    let negatives = truth.len() - positives;
    if positives == 0 || negatives == 0 || truth.len() != scores.len() {
        return None;
    }

    let ranks = average_ranks(scores);
    let positive_rank_sum: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|&(&t, _)| t == 1)
        .map(|(_, &r)| r)
        .sum();
    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

/// Precision of `score > percentile(100 · (1 − outliers / n))` as the
/// positive rule, where `outliers` is the number of true outliers.
pub fn precision_at_rank_n(truth: &[u8], scores: &[f64]) -> Option<f64> {
    let outliers = truth.iter().filter(|&&t| t == 1).count();
    if outliers == 0 || truth.len() != scores.len() {
        return None;
    }
    let q = 100.0 * (1.0 - outliers as f64 / truth.len() as f64);
    let threshold = math::percentile(scores, q)?;
    let predicted: Vec<u8> = scores.iter().map(|&s| u8::from(s > threshold)).collect();
    Some(Confusion::from_labels(truth, &predicted).precision())
}

/// 1-based ranks, ties sharing the mean of their positions.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end.
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}
