//! Userbot API client.

use crate::codec::Payload;
use crate::credentials::{Credentials, Generation};
use crate::error::{RequestError, RequestResult, TransportError};
use crate::response;
use crate::session::RequestSession;
use crate::transport::{HttpTransport, RequestBody, Transport};
use crate::urls::UrlProvider;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Interval between status checks while a request is in progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long [`UserbotClient::call`] waits for asynchronous completion.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared, read-only context for request sessions.
///
/// Cloning is cheap; credentials and transport are reference counted and
/// never mutated after construction.
#[derive(Clone)]
pub struct UserbotClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<Credentials>,
    urls: UrlProvider,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl UserbotClient {
    /// Create a client backed by [`HttpTransport`].
    pub fn new(
        credentials: Credentials,
        urls: UrlProvider,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(timeout, user_agent)?;
        Ok(Self::with_transport(Arc::new(transport), credentials, urls))
    }

    /// Create a client over any transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        urls: UrlProvider,
    ) -> Self {
        Self {
            transport,
            credentials: Arc::new(credentials),
            urls,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Override the status-check interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the completion timeout used by [`call`](Self::call).
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn generation(&self) -> Generation {
        self.credentials.generation()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// URL of an API method for the configured generation.
    pub fn method_url(&self, method: &str) -> String {
        self.urls.api_url(self.generation(), method)
    }

    /// Start a new request.
    pub fn make_request(&self) -> RequestSession {
        RequestSession::new(self.clone())
    }

    /// Default flow: signed call to `method`, then wait for completion.
    #[instrument(skip(self, payload))]
    pub async fn call(&self, method: &str, payload: Payload) -> RequestResult<Value> {
        let mut sent = self
            .make_request()
            .with_address(self.method_url(method))
            .with_message(payload)
            .send()
            .await?;

        sent.wait_response(self.wait_timeout).await
    }

    /// POST `body`, gate on HTTP 200 and parse the envelope.
    pub(crate) async fn execute(
        &self,
        url: &str,
        body: RequestBody,
        headers: Vec<(String, String)>,
    ) -> RequestResult<Value> {
        let response = self.transport.post(url, body, headers).await?;

        if response.status != 200 {
            warn!("Unexpected http status {} from {}", response.status, url);
            return Err(RequestError::UnexpectedResponse {
                status: Some(response.status),
                code: None,
                message: "response is not ok".into(),
            });
        }

        debug!("Response body: {} bytes", response.body.len());
        response::parse(&response.body)
    }
}

impl fmt::Debug for UserbotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserbotClient")
            .field("credentials", &self.credentials)
            .field("urls", &self.urls)
            .field("poll_interval", &self.poll_interval)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}
