//! JSON body extractor that reports where deserialization failed

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{error::Category, json, Value};
use serde_path_to_error::Segment;

use super::error::{ServerError, ValidationIssue};

/// Like `axum::Json`, but failures become a 422 whose detail carries the
/// path of the offending value and what type was expected there.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ServerError::PayloadTooLarge(rejection.body_text())
            } else {
                ServerError::BadRequest(rejection.body_text())
            }
        })?;

        parse_body(&bytes).map(ValidatedJson)
    }
}

/// Deserialize a JSON body, mapping failures to a located validation issue
pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ServerError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);

    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let mut loc = vec![json!("body")];
        loc.extend(err.path().iter().filter_map(segment_to_loc));
        to_issue(loc, err.inner())
    })?;

    de.end().map_err(|err| to_issue(vec![json!("body")], &err))?;

    Ok(value)
}

fn segment_to_loc(segment: &Segment) -> Option<Value> {
    match segment {
        Segment::Seq { index } => Some(json!(index)),
        Segment::Map { key } => Some(json!(key)),
        Segment::Enum { variant } => Some(json!(variant)),
        Segment::Unknown => None,
    }
}

fn to_issue(mut loc: Vec<Value>, err: &serde_json::Error) -> ServerError {
    let full = err.to_string();
    let msg = full
        .rsplit_once(" at line ")
        .map(|(head, _)| head.to_string())
        .unwrap_or(full);

    let kind = match err.classify() {
        Category::Syntax | Category::Eof | Category::Io => "json_invalid",
        Category::Data if msg.starts_with("missing field") => {
            // Serde reports the missing field at its parent; point at the field itself
            if let Some(field) = msg.split('`').nth(1) {
                loc.push(json!(field));
            }
            "missing"
        }
        Category::Data if msg.starts_with("invalid type") => "type_error",
        Category::Data => "value_error",
    };

    ServerError::validation(ValidationIssue::new(loc, msg, kind))
}
