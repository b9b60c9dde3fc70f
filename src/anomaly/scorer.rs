//! Delta-time anomaly scorer
//!
//! Fits a fresh Isolation Forest on every batch of elapsed-time deltas and
//! reports the most anomalous observation. Nothing is cached between calls,
//! so a batch is only ever judged against its own distribution.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anomaly::{AnomalyDetector, IsolationForest};
use crate::error::Result;

/// Number of trees in the ensemble
pub const N_ESTIMATORS: usize = 100;

/// Contamination used by the forest to calibrate its own offset.
/// Independent of [`ANOMALY_THRESHOLD`].
pub const CONTAMINATION: f64 = 0.2;

/// Seed for reproducible scores
pub const RANDOM_SEED: u64 = 42;

/// Minimum decision scores strictly below this are reported as anomalies
pub const ANOMALY_THRESHOLD: f64 = -0.1;

/// Outcome of scoring one batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Lowest decision score in the batch (lower = more anomalous)
    pub anomaly_score: f64,
    /// `anomaly_score < ANOMALY_THRESHOLD`
    pub is_anomaly: bool,
}

impl AnomalyReport {
    pub fn from_score(anomaly_score: f64) -> Self {
        Self {
            anomaly_score,
            is_anomaly: anomaly_score < ANOMALY_THRESHOLD,
        }
    }
}

fn build_model() -> IsolationForest {
    IsolationForest::new()
        .with_n_estimators(N_ESTIMATORS)
        .with_contamination(CONTAMINATION)
        .with_seed(RANDOM_SEED)
}

/// Per-sample decision scores for a batch, using a freshly fitted model
pub fn decision_scores(delta_times: &[f64]) -> Result<Vec<f64>> {
    let x = Array2::from_shape_vec((delta_times.len(), 1), delta_times.to_vec())?;

    let mut model = build_model();
    model.fit(&x)?;
    let result = model.detect(&x)?;

    debug!(
        n_samples = delta_times.len(),
        offset = result.offset,
        internal_outliers = result.n_anomalies,
        "Isolation forest fitted"
    );

    Ok(result.scores.to_vec())
}

/// Score a batch of deltas and classify its most anomalous point
pub fn detect(delta_times: &[f64]) -> Result<AnomalyReport> {
    let min_score = decision_scores(delta_times)?
        .into_iter()
        .fold(f64::INFINITY, f64::min);

    Ok(AnomalyReport::from_score(min_score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnomalyError;

    const BATCHES: &[&[f64]] = &[
        &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0],
        &[5.0, 5.0, 5.0, 5.0, 5.0],
        &[42.0],
        &[12.5, 13.1, 11.9, 12.7, 30.2, 12.2, 12.9],
        &[0.0, 1800000.0, 1750000.0, 1900000.0, 1820000.0, 9600000.0],
    ];

    #[test]
    fn test_model_uses_fixed_hyperparameters() {
        let model = build_model();
        assert_eq!(model.n_estimators(), 100);
        assert_eq!(model.contamination(), 0.2);
        assert!(model.trees().is_none());
    }

    #[test]
    fn test_far_outlier_is_anomaly() {
        let report = detect(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0]).unwrap();
        assert!(report.is_anomaly);
        assert!((report.anomaly_score + 0.391_245_366).abs() < 1e-6);
    }

    #[test]
    fn test_homogeneous_batch_is_normal() {
        let report = detect(&[5.0, 5.0, 5.0, 5.0, 5.0]).unwrap();
        assert_eq!(report.anomaly_score, 0.0);
        assert!(!report.is_anomaly);
    }

    #[test]
    fn test_single_value_baseline() {
        let report = detect(&[42.0]).unwrap();
        assert_eq!(report.anomaly_score, 0.0);
        assert!(!report.is_anomaly);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(matches!(detect(&[]), Err(AnomalyError::InvalidInput(_))));
    }

    #[test]
    fn test_non_finite_is_rejected() {
        assert!(matches!(
            detect(&[1.0, f64::NAN]),
            Err(AnomalyError::InvalidInput(_))
        ));
        assert!(matches!(
            detect(&[f64::NEG_INFINITY, 2.0]),
            Err(AnomalyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        for batch in BATCHES {
            let a = detect(batch).unwrap();
            let b = detect(batch).unwrap();
            assert_eq!(a.anomaly_score.to_bits(), b.anomaly_score.to_bits());
            assert_eq!(a.is_anomaly, b.is_anomaly);
        }
    }

    #[test]
    fn test_verdict_follows_threshold() {
        for batch in BATCHES {
            let report = detect(batch).unwrap();
            assert_eq!(report.is_anomaly, report.anomaly_score < ANOMALY_THRESHOLD);
        }
    }

    #[test]
    fn test_score_is_batch_minimum() {
        for batch in BATCHES {
            let scores = decision_scores(batch).unwrap();
            let report = detect(batch).unwrap();
            assert!(scores.iter().all(|&s| s >= report.anomaly_score));
            assert!(scores.iter().any(|&s| s == report.anomaly_score));
        }
    }

    #[test]
    fn test_minimum_never_positive() {
        // The offset is a low percentile of the batch's own scores
        for batch in BATCHES {
            assert!(detect(batch).unwrap().anomaly_score <= 0.0);
        }
    }

    #[test]
    fn test_from_score_boundary() {
        assert!(!AnomalyReport::from_score(-0.1).is_anomaly);
        assert!(AnomalyReport::from_score(-0.100_000_1).is_anomaly);
        assert!(!AnomalyReport::from_score(0.0).is_anomaly);
    }
}
