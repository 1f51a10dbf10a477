//! Userbot credentials.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Wire protocol generation, selected by the presence of a signature key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Unsigned payloads, bearer token header, synchronous results.
    Legacy,
    /// HMAC-signed envelopes with asynchronous completion.
    Signed,
}

/// Immutable api token and optional signature key.
///
/// Both values are kept as `SecretString` and only exposed at the signing
/// and header boundaries.
#[derive(Clone)]
pub struct Credentials {
    api_token: SecretString,
    signature_key: Option<SecretString>,
}

impl Credentials {
    /// Credentials for the legacy (unsigned) protocol.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: SecretString::new(api_token.into()),
            signature_key: None,
        }
    }

    /// Credentials for the signed protocol.
    pub fn signed(api_token: impl Into<String>, signature_key: impl Into<String>) -> Self {
        Self {
            api_token: SecretString::new(api_token.into()),
            signature_key: Some(SecretString::new(signature_key.into())),
        }
    }

    pub fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }

    pub fn signature_key(&self) -> Option<&str> {
        self.signature_key.as_ref().map(|k| k.expose_secret().as_str())
    }

    pub fn generation(&self) -> Generation {
        match self.signature_key {
            Some(_) => Generation::Signed,
            None => Generation::Legacy,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"[REDACTED]")
            .field("generation", &self.generation())
            .finish()
    }
}
