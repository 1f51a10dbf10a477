//! One logical API call: build, send, and optionally poll for completion.
//!
//! ```text
//! Building -> Sent -> Completed
//!                  \-> AwaitingPoll -> Completed | Failed | TimedOut
//! ```
//!
//! [`RequestSession`] is a consuming builder; [`RequestSession::send`] freezes
//! it into a [`SentRequest`], so one session can never be sent twice.

use crate::client::UserbotClient;
use crate::codec::{self, Payload};
use crate::credentials::Generation;
use crate::error::{RequestError, RequestResult};
use crate::transport::RequestBody;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

/// Status-check method of the signed generation.
pub const STATUS_METHOD: &str = "request/get";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Building,
    Sent,
    AwaitingPoll,
    Completed,
    Failed,
    TimedOut,
}

/// Request under construction.
#[derive(Debug)]
pub struct RequestSession {
    client: UserbotClient,
    url: String,
    payload: Payload,
    file: Option<PathBuf>,
    signed: bool,
}

impl RequestSession {
    pub(crate) fn new(client: UserbotClient) -> Self {
        Self {
            client,
            url: String::new(),
            payload: Payload::new(),
            file: None,
            signed: true,
        }
    }

    /// Set the request address. Last call wins.
    pub fn with_address(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request payload. Last call wins.
    pub fn with_message(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Attach a file; switches the body to multipart. Last call wins.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Sign (default) or send the payload as plain form fields.
    pub fn with_sign(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn state(&self) -> RequestState {
        RequestState::Building
    }

    /// Send the request.
    ///
    /// In the signed generation a result carrying `request_id` is not the
    /// answer yet; the returned [`SentRequest`] is then awaiting a poll.
    #[instrument(skip(self), fields(url = %self.url, signed = self.signed))]
    pub async fn send(self) -> RequestResult<SentRequest> {
        if self.url.is_empty() {
            return Err(RequestError::InvalidRequest("url can not be empty".into()));
        }

        debug!("Request state: {:?}", RequestState::Sent);
        let result = match self.dispatch().await {
            Err(RequestError::InProgress { code, message }) => {
                return Err(RequestError::UnexpectedResponse {
                    status: None,
                    code: Some(code),
                    message,
                })
            }
            other => other?,
        };

        let polls = self.signed && self.client.generation() == Generation::Signed;
        let request_id = if polls { request_id(&result) } else { None };

        let sent = match request_id {
            Some(id) => {
                debug!("Request state: {:?} ({})", RequestState::AwaitingPoll, id);
                SentRequest {
                    client: self.client,
                    state: RequestState::AwaitingPoll,
                    request_id: Some(id),
                    result: None,
                }
            }
            None => {
                debug!("Request state: {:?}", RequestState::Completed);
                SentRequest {
                    client: self.client,
                    state: RequestState::Completed,
                    request_id: None,
                    result: Some(result),
                }
            }
        };

        Ok(sent)
    }

    /// Encode and execute once, without any polling.
    async fn dispatch(&self) -> RequestResult<Value> {
        let (body, headers) = self.encode()?;
        self.client.execute(&self.url, body, headers).await
    }

    fn encode(&self) -> RequestResult<(RequestBody, Vec<(String, String)>)> {
        let credentials = self.client.credentials();

        if !self.signed {
            return Ok((self.body(form_fields(&self.payload), None), Vec::new()));
        }

        match credentials.generation() {
            Generation::Legacy => {
                let headers = vec![(
                    "Authorization".to_string(),
                    format!("bearer={}", credentials.api_token()),
                )];
                let encoded = codec::encode(&self.payload);
                let body = self.body(Vec::new(), Some(encoded));
                Ok((body, headers))
            }
            Generation::Signed => {
                let envelope = codec::encode_signed(credentials, &self.payload)?;
                Ok((self.body(envelope.into_fields(), None), Vec::new()))
            }
        }
    }

    /// Pick the wire form. `json` is the legacy signed body; with a file it
    /// travels as the `payload` field next to the attachment.
    fn body(&self, mut fields: Vec<(String, String)>, json: Option<String>) -> RequestBody {
        match (&self.file, json) {
            (None, Some(json)) => RequestBody::Json(json),
            (None, None) => RequestBody::Form(fields),
            (Some(file), json) => {
                if let Some(json) = json {
                    fields.push(("payload".to_string(), json));
                }
                RequestBody::Multipart {
                    fields,
                    file: file.clone(),
                }
            }
        }
    }
}

/// A request that has been sent.
#[derive(Debug)]
pub struct SentRequest {
    client: UserbotClient,
    state: RequestState,
    request_id: Option<Value>,
    result: Option<Value>,
}

impl SentRequest {
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Server-issued id of an asynchronous request, as the server sent it.
    pub fn request_id(&self) -> Option<&Value> {
        self.request_id.as_ref()
    }

    /// Final result, once completed.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Wait until the server completes the request.
    ///
    /// Polls [`STATUS_METHOD`] once per poll interval while the server reports
    /// the request in progress. `timeout` is a soft deadline measured from
    /// this call. Any other server error ends the wait immediately. Dropping
    /// the future cancels polling at the next await point.
    #[instrument(skip(self), fields(request_id = ?self.request_id))]
    pub async fn wait_response(&mut self, timeout: Duration) -> RequestResult<Value> {
        match self.state {
            RequestState::Completed => {
                return self
                    .result
                    .clone()
                    .ok_or_else(|| RequestError::unexpected("completed request has no result"));
            }
            RequestState::AwaitingPoll | RequestState::TimedOut => {}
            state => {
                return Err(RequestError::InvalidRequest(format!(
                    "can not wait for a request in state {state:?}"
                )))
            }
        }

        let request_id = self
            .request_id
            .clone()
            .ok_or_else(|| RequestError::InvalidRequest("request has no request_id".into()))?;

        let deadline = Instant::now() + timeout;
        let mut payload = Payload::new();
        payload.insert("request_id".into(), request_id.clone());
        let status_check = self
            .client
            .make_request()
            .with_address(self.client.method_url(STATUS_METHOD))
            .with_message(payload);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match status_check.dispatch().await {
                Ok(value) => {
                    info!("Request {} completed after {} status checks", request_id, attempts);
                    self.state = RequestState::Completed;
                    self.result = Some(value.clone());
                    return Ok(value);
                }
                Err(RequestError::InProgress { .. }) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!("Request {} still in progress after {:?}", request_id, timeout);
                        self.state = RequestState::TimedOut;
                        return Err(RequestError::PollTimeout(timeout));
                    }
                    debug!("Request {} in progress (check {})", request_id, attempts);
                    sleep(self.client.poll_interval().min(deadline - now)).await;
                }
                Err(e) => {
                    warn!("Request {} failed: {}", request_id, e);
                    self.state = RequestState::Failed;
                    return Err(e);
                }
            }
        }
    }
}

/// The id is echoed back verbatim, so numeric ids stay numeric.
fn request_id(result: &Value) -> Option<Value> {
    match result.get("request_id")? {
        Value::String(id) if id.is_empty() => None,
        id @ (Value::String(_) | Value::Number(_)) => Some(id.clone()),
        _ => None,
    }
}

/// Flatten a payload into form fields; non-string values travel as JSON text.
fn form_fields(payload: &Payload) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}
