//! Application error types.

use crate::commands::MatchArityError;
use thiserror::Error;
use userbot_client::{CodecError, RequestError};

/// Rejection of an inbound webhook call.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Envelope failed structural or signature validation.
    #[error("Bad webhook request: {0}")]
    BadRequest(#[from] CodecError),

    #[error("Webhook body is not a JSON object: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Webhook payload is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Got unknown command {0}")]
    BadCommand(String),

    #[error(transparent)]
    MatchArity(#[from] MatchArityError),
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Userbot API error: {0}")]
    Request(#[from] RequestError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Handler error: {0}")]
    Handler(String),
}

impl AppError {
    /// Precondition failure raised before any I/O.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Request(RequestError::InvalidRequest(message.into()))
    }
}

impl From<MatchArityError> for AppError {
    fn from(err: MatchArityError) -> Self {
        Self::Webhook(WebhookError::MatchArity(err))
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        Self::Webhook(WebhookError::BadRequest(err))
    }
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;
