//! Response envelope parsing and server error classification.

use crate::error::{RequestError, RequestResult};
use serde_json::Value;
use tracing::warn;

/// Classification of a server-declared error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// Client-caused error (missing or invalid fields, bad url).
    BadRequest,
    /// Asynchronous request is not finished yet.
    InProgress,
    /// Anything not in the table.
    Unexpected,
}

/// Known server error codes. Codes missing here are unexpected.
const ERROR_CODES: &[(i64, ServerErrorKind)] = &[
    (1, ServerErrorKind::BadRequest),
    (2, ServerErrorKind::BadRequest),
    (3, ServerErrorKind::BadRequest),
    (4, ServerErrorKind::BadRequest),
    (7, ServerErrorKind::InProgress),
    (8, ServerErrorKind::BadRequest),
];

/// Classify a server error code.
pub fn classify(code: i64) -> ServerErrorKind {
    ERROR_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, kind)| *kind)
        .unwrap_or(ServerErrorKind::Unexpected)
}

/// Build the typed error for a server error code.
pub fn server_error(code: i64, message: impl Into<String>) -> RequestError {
    let message = message.into();
    match classify(code) {
        ServerErrorKind::BadRequest => RequestError::BadRequest { code, message },
        ServerErrorKind::InProgress => RequestError::InProgress { code, message },
        ServerErrorKind::Unexpected => RequestError::UnexpectedResponse {
            status: None,
            code: Some(code),
            message,
        },
    }
}

/// Parse `{"status": ..., "response": ...}` and return the `response` field.
///
/// Non-`ok` statuses are mapped through [`classify`].
pub fn parse(body: &[u8]) -> RequestResult<Value> {
    let envelope: Value = serde_json::from_slice(body)
        .map_err(|e| RequestError::unexpected(format!("response must be json: {e}")))?;

    let status = envelope
        .get("status")
        .filter(|s| !s.is_null())
        .ok_or_else(|| RequestError::unexpected("response has no status field"))?;
    let response = envelope
        .get("response")
        .filter(|r| !r.is_null())
        .ok_or_else(|| RequestError::unexpected("response has no response field"))?;

    if status.as_str() == Some("ok") {
        return Ok(response.clone());
    }

    let code = response
        .get("error_code")
        .and_then(error_code)
        .ok_or_else(|| RequestError::unexpected("response is not ok and has no error code"))?;
    let message = response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no error message");

    warn!("Server reported error {}: {}", code, message);
    Err(server_error(code, message))
}

/// Error codes arrive as numbers, occasionally as numeric strings.
fn error_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
