//! HTTP transport used by request sessions.

use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = "Robot";

/// Outbound request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw JSON document.
    Json(String),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
    /// Multipart form with one attached file sent as field `file`.
    Multipart {
        fields: Vec<(String, String)>,
        file: PathBuf,
    },
}

/// Status code and raw body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Narrow POST contract the protocol core depends on.
///
/// Implementations own timeouts, TLS, user agent and body encoding, and must
/// fail with a [`TransportError`] rather than fabricate a status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: RequestBody,
        headers: Vec<(String, String)>,
    ) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, body, headers))]
    async fn post(
        &self,
        url: &str,
        body: RequestBody,
        headers: Vec<(String, String)>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match body {
            RequestBody::Json(json) => request
                .header("Content-Type", "application/json")
                .body(json),
            RequestBody::Form(fields) => request.form(&fields),
            RequestBody::Multipart { fields, file } => {
                let bytes = tokio::fs::read(&file).await?;
                let file_name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "file".into());

                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                form = form.part("file", Part::bytes(bytes).file_name(file_name));
                request.multipart(form)
            }
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
