//! Compass userbot API client.
//!
//! Signs outgoing payloads, verifies inbound webhook posts, and drives the
//! send-then-poll lifecycle of API calls.

mod client;
pub mod codec;
mod credentials;
mod error;
pub mod response;
mod session;
mod transport;
mod urls;

pub use client::{UserbotClient, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT};
pub use codec::{Payload, SignedEnvelope};
pub use credentials::{Credentials, Generation};
pub use error::{CodecError, ErrorKind, RequestError, RequestResult, TransportError};
pub use session::{RequestSession, RequestState, SentRequest, STATUS_METHOD};
pub use transport::{
    HttpResponse, HttpTransport, RequestBody, Transport, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use urls::{UrlProvider, DEFAULT_ENDPOINT};
