//! Anomaly detection module
//!
//! Provides the Isolation Forest detector and the fixed-parameter
//! delta-time scorer built on top of it.

mod isolation_forest;
pub mod scorer;

pub use isolation_forest::{average_path_length, IsolationForest, IsolationTree};
pub use scorer::{detect, AnomalyReport};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Anomaly detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Decision scores (lower = more anomalous)
    pub scores: Array1<f64>,
    /// Binary labels (-1 = anomaly, 1 = normal)
    pub labels: Array1<i32>,
    /// Offset subtracted from raw scores to centre the decision boundary on zero
    pub offset: f64,
    /// Number of anomalies detected
    pub n_anomalies: usize,
}

/// Trait for anomaly detectors
///
/// Scores follow the "higher is more normal" convention: `score_samples`
/// returns raw scores, `decision_function` shifts them by [`offset`] so that
/// negative values are outliers under the detector's own calibration.
///
/// [`offset`]: AnomalyDetector::offset
pub trait AnomalyDetector: Send + Sync {
    /// Fit the detector on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Compute raw scores for new data
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Offset calibrated during fitting
    fn offset(&self) -> Result<f64>;

    /// Raw scores shifted by the fitted offset
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let offset = self.offset()?;
        Ok(self.score_samples(x)? - offset)
    }

    /// Predict labels (-1 = anomaly, 1 = normal)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        Ok(self
            .decision_function(x)?
            .mapv(|d| if d < 0.0 { -1 } else { 1 }))
    }

    /// Fit and predict in one step
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Get detection results with decision scores and labels
    fn detect(&self, x: &Array2<f64>) -> Result<AnomalyResult> {
        let scores = self.decision_function(x)?;
        let labels = scores.mapv(|d| if d < 0.0 { -1 } else { 1 });
        let n_anomalies = labels.iter().filter(|&&l| l == -1).count();

        Ok(AnomalyResult {
            scores,
            labels,
            offset: self.offset()?,
            n_anomalies,
        })
    }
}
