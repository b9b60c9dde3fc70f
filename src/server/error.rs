//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::error::AnomalyError;

/// One entry of a 422 response body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `["body", "deltaTimes", 0]`
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    pub fn new(loc: Vec<serde_json::Value>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        detail: Vec<ValidationIssue>,
    },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Scoring error: {0}")]
    Scoring(#[from] AnomalyError),
}

impl ServerError {
    pub fn validation(issue: ValidationIssue) -> Self {
        ServerError::Validation {
            message: issue.msg.clone(),
            detail: vec![issue],
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ServerError::Validation { message, detail } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, Some(detail))
            }
            ServerError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg, None),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string(), None)
            }
            ServerError::Scoring(AnomalyError::InvalidInput(msg)) => {
                let issue = ValidationIssue::new(
                    vec![json!("body"), json!("deltaTimes")],
                    msg.clone(),
                    "value_error",
                );
                (StatusCode::UNPROCESSABLE_ENTITY, msg, Some(vec![issue]))
            }
            ServerError::Scoring(e) => {
                tracing::error!(detail = %e, "Scoring error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Scoring failed. Check server logs for details.".to_string(), None)
            }
        };

        let body = match detail {
            Some(detail) => json!({
                "error": true,
                "message": message,
                "detail": detail,
            }),
            None => json!({
                "error": true,
                "message": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
