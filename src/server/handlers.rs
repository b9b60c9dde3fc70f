//! HTTP request handlers

use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::anomaly::{scorer, AnomalyReport};

use super::error::{Result, ServerError, ValidationIssue};
use super::extract::ValidatedJson;

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolationRequest {
    pub delta_times: Vec<f64>,
}

impl IsolationRequest {
    pub fn validate(&self) -> Result<()> {
        if self.delta_times.is_empty() {
            return Err(ServerError::validation(ValidationIssue::new(
                vec![json!("body"), json!("deltaTimes")],
                "List should have at least 1 item after validation, not 0",
                "too_short",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolationResponse {
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

impl From<AnomalyReport> for IsolationResponse {
    fn from(report: AnomalyReport) -> Self {
        Self {
            anomaly_score: report.anomaly_score,
            is_anomaly: report.is_anomaly,
        }
    }
}

// ============================================================================
// Anomaly Handlers
// ============================================================================

/// Fit a fresh isolation forest on the posted deltas and report the batch minimum
pub async fn isolation_forest(
    ValidatedJson(request): ValidatedJson<IsolationRequest>,
) -> Result<Json<IsolationResponse>> {
    request.validate()?;

    let n_samples = request.delta_times.len();

    // Fitting is CPU-bound
    let report = tokio::task::spawn_blocking(move || scorer::detect(&request.delta_times))
        .await
        .map_err(|e| ServerError::Internal(format!("Scoring task failed: {}", e)))??;

    info!(
        n_samples,
        anomaly_score = report.anomaly_score,
        is_anomaly = report.is_anomaly,
        "Isolation forest request scored"
    );

    Ok(Json(report.into()))
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
