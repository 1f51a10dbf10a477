//! Userbot client errors.

use std::time::Duration;
use thiserror::Error;

/// Failures of the payload codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The HMAC primitive rejected the key. Not recoverable at protocol level.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Inbound envelope is missing `payload`/`signature` or has the wrong shape.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Signature mismatch")]
    SignatureMismatch,
}

/// Failures raised by the transport before any status code is known.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Attachment error: {0}")]
    File(#[from] std::io::Error),
}

/// Closed taxonomy of request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    BadRequest,
    InProgress,
    UnexpectedResponse,
    PollTimeout,
    Signing,
}

/// Errors produced while executing an API call.
#[derive(Error, Debug)]
pub enum RequestError {
    /// Caller-side precondition failed before any I/O.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server rejected the request with a known client-side error code.
    #[error("Bad request ({code}): {message}")]
    BadRequest { code: i64, message: String },

    /// Server has not finished the request yet.
    #[error("Request in progress ({code}): {message}")]
    InProgress { code: i64, message: String },

    #[error("Unexpected response{}: {}", http_suffix(.status), .message)]
    UnexpectedResponse {
        status: Option<u16>,
        code: Option<i64>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Request did not complete within {0:?}")]
    PollTimeout(Duration),

    #[error("Signing error: {0}")]
    Signing(#[from] CodecError),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (http {s})")).unwrap_or_default()
}

impl RequestError {
    pub(crate) fn unexpected(message: impl Into<String>) -> Self {
        RequestError::UnexpectedResponse {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Classify the error into the closed taxonomy.
    ///
    /// Transport failures are reported as [`ErrorKind::UnexpectedResponse`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RequestError::BadRequest { .. } => ErrorKind::BadRequest,
            RequestError::InProgress { .. } => ErrorKind::InProgress,
            RequestError::UnexpectedResponse { .. } | RequestError::Transport(_) => {
                ErrorKind::UnexpectedResponse
            }
            RequestError::PollTimeout(_) => ErrorKind::PollTimeout,
            RequestError::Signing(_) => ErrorKind::Signing,
        }
    }

    /// HTTP status carried by an unexpected response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::UnexpectedResponse { status, .. } => *status,
            _ => None,
        }
    }

    /// Server error code, if the server reported one.
    pub fn code(&self) -> Option<i64> {
        match self {
            RequestError::BadRequest { code, .. } | RequestError::InProgress { code, .. } => {
                Some(*code)
            }
            RequestError::UnexpectedResponse { code, .. } => *code,
            _ => None,
        }
    }
}

/// Result type alias for request errors.
pub type RequestResult<T> = Result<T, RequestError>;
