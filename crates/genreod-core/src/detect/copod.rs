//! Copula-based outlier detection (COPOD).
//!
//! Each column gets an empirical CDF from the fitted rows. A record's
//! per-dimension contribution is its negative log tail probability, choosing
//! the tail by the column's skewness. The outlier score is the row sum.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::DetectError;
use crate::math;

/// Result of fitting COPOD to a matrix.
#[derive(Debug, Clone)]
pub struct CopodFit {
    /// (rows × dims) per-dimension contributions `O`
    pub contributions: Array2<f64>,
    /// Row sums of `contributions`
    pub scores: Vec<f64>,
    /// Scores strictly above this are labelled outliers
    pub threshold: f64,
    /// Fraction of records expected to be outliers
    pub contamination: f64,
    /// 1 for outliers, 0 for inliers
    pub labels: Vec<u8>,
}

/// COPOD detector with a fixed contamination.
#[derive(Debug, Clone, Copy)]
pub struct Copod {
    contamination: f64,
}

impl Copod {
    /// Create a detector. Contamination must lie in (0, 1).
    pub fn new(contamination: f64) -> Result<Self, DetectError> {
        if !(contamination > 0.0 && contamination < 1.0) {
            return Err(DetectError::InvalidInput(format!(
                "contamination must be in (0, 1), got {contamination}"
            )));
        }
        Ok(Self { contamination })
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Fit on all rows of `data` and score them.
    pub fn fit(&self, data: ArrayView2<'_, f64>) -> Result<CopodFit, DetectError> {
        let (n, d) = data.dim();
        if n < 2 {
            return Err(DetectError::InsufficientSamples { samples: n });
        }
        if d == 0 {
            return Err(DetectError::InvalidInput("matrix has no columns".to_string()));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(DetectError::InvalidInput("matrix contains non-finite values".to_string()));
        }

        let mut contributions = Array2::<f64>::zeros((n, d));
        let len = n as f64;

        for (j, column) in data.axis_iter(Axis(1)).enumerate() {
            let values = column.to_vec();
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

            let skew = math::sign(math::skewness(&values));
            for (i, &x) in values.iter().enumerate() {
                let at_or_below = sorted.partition_point(|&v| v <= x) as f64;
                let at_or_above = (n - sorted.partition_point(|&v| v < x)) as f64;
                let u_left = 0.0 - (at_or_below / len).ln();
                let u_right = 0.0 - (at_or_above / len).ln();

                let mut u_skew = 0.0;
                if skew <= 0 {
                    u_skew += u_left;
                }
                if skew >= 0 {
                    u_skew += u_right;
                }
                contributions[[i, j]] = u_skew.max((u_left + u_right) / 2.0);
            }
        }

        let scores: Vec<f64> = contributions.sum_axis(Axis(1)).to_vec();
        let threshold = math::percentile(&scores, 100.0 * (1.0 - self.contamination))
            .ok_or(DetectError::InsufficientSamples { samples: 0 })?;
        let labels = scores.iter().map(|&s| u8::from(s > threshold)).collect();

        Ok(CopodFit {
            contributions,
            scores,
            threshold,
            contamination: self.contamination,
            labels,
        })
    }
}

/// Contamination for a split of `inliers` known-good rows out of `total`:
/// the outlier fraction when more than one outlier is present, else `default`.
pub fn contamination_for_split(total: usize, inliers: usize, default: f64) -> f64 {
    let outliers = total.saturating_sub(inliers);
    if outliers > 1 {
        outliers as f64 / total as f64
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_contributions_for_skewed_columns() {
        let data = array![[0.9, 0.1], [0.8, 0.2], [0.1, 0.9]];
        let fit = Copod::new(0.1).unwrap().fit(data.view()).unwrap();

        let ln3 = 3f64.ln();
        let ln_1_5 = 1.5f64.ln();
        // Left-skewed first column uses the left tail, right-skewed second
        // column the right tail; both mirror each other.
        for j in 0..2 {
            assert!((fit.contributions[[0, j]] - ln3 / 2.0).abs() < EPS);
            assert!((fit.contributions[[1, j]] - ln_1_5).abs() < EPS);
            assert!((fit.contributions[[2, j]] - ln3).abs() < EPS);
        }
        assert!((fit.scores[2] - 2.0 * ln3).abs() < EPS);
        assert_eq!(fit.labels, vec![0, 0, 1]);

        let expected_threshold = ln3 + 0.8 * (2.0 * ln3 - ln3);
        assert!((fit.threshold - expected_threshold).abs() < EPS);
    }

    #[test]
    fn test_constant_column_contributes_nothing() {
        let data = array![[0.5, 0.1], [0.5, 0.2], [0.5, 0.3], [0.5, 0.4]];
        let fit = Copod::new(0.25).unwrap().fit(data.view()).unwrap();
        for i in 0..4 {
            assert_eq!(fit.contributions[[i, 0]], 0.0);
        }
        assert!(fit.scores.iter().all(|s| s.is_sign_positive()));
    }

    #[test]
    fn test_symmetric_column_uses_both_tails() {
        // Zero skew: contribution is U_left + U_right.
        let data = array![[0.0], [0.5], [1.0]];
        let fit = Copod::new(0.1).unwrap().fit(data.view()).unwrap();
        let ln3 = 3f64.ln();
        assert!((fit.contributions[[0, 0]] - ln3).abs() < EPS);
        assert!((fit.contributions[[1, 0]] - 2.0 * 1.5f64.ln()).abs() < EPS);
        assert!((fit.contributions[[2, 0]] - ln3).abs() < EPS);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let copod = Copod::new(0.1).unwrap();
        assert!(matches!(
            copod.fit(array![[0.5, 0.5]].view()),
            Err(DetectError::InsufficientSamples { samples: 1 })
        ));
        assert!(matches!(
            copod.fit(Array2::<f64>::zeros((3, 0)).view()),
            Err(DetectError::InvalidInput(_))
        ));
        assert!(matches!(
            copod.fit(array![[0.5], [f64::NAN]].view()),
            Err(DetectError::InvalidInput(_))
        ));
        assert!(Copod::new(0.0).is_err());
        assert!(Copod::new(1.0).is_err());
    }

    #[test]
    fn test_contamination_for_split() {
        assert_eq!(contamination_for_split(3, 2, 0.1), 0.1);
        assert_eq!(contamination_for_split(10, 10, 0.1), 0.1);
        assert!((contamination_for_split(10, 7, 0.1) - 0.3).abs() < EPS);
    }
}
