//! Payload canonicalization, signing and verification.
//!
//! Two independent wire generations live here:
//!
//! - the legacy generation, where [`encode`] produces a plain JSON object and
//!   authentication travels in a bearer header;
//! - the signed generation, where [`encode_signed`] wraps the payload into a
//!   [`SignedEnvelope`] and [`decode_signed`] verifies inbound webhook posts.
//!
//! The signature is `HMAC-SHA256(signature_key, canonicalize(payload + {token}))`,
//! hex encoded. Canonical form sorts every object's keys and leaves array
//! order untouched, so payloads that differ only in key order sign the same.

use crate::credentials::Credentials;
use crate::error::CodecError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

/// JSON object sent to or received from the userbot API.
pub type Payload = Map<String, Value>;

type HmacSha256 = Hmac<Sha256>;

/// Outbound/inbound envelope of the signed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Serialized JSON payload.
    pub payload: String,
    pub token: String,
    /// Hex-encoded HMAC-SHA256.
    pub signature: String,
}

impl SignedEnvelope {
    /// Form fields in wire order.
    pub fn into_fields(self) -> Vec<(String, String)> {
        vec![
            ("payload".to_string(), self.payload),
            ("token".to_string(), self.token),
            ("signature".to_string(), self.signature),
        ]
    }
}

/// Recursively sort object keys so that key order never affects output.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sorted_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn sorted_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    // Insertion in sorted order keeps the result sorted whether or not the
    // map preserves insertion order.
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), sorted(v)))
        .collect()
}

/// Deterministic JSON serialization of a payload.
pub fn canonicalize(payload: &Payload) -> String {
    Value::Object(sorted_map(payload)).to_string()
}

fn keyed_mac(
    payload: &Payload,
    api_token: &str,
    signature_key: &str,
) -> Result<HmacSha256, CodecError> {
    if signature_key.is_empty() {
        return Err(CodecError::Signing("signature key is empty".into()));
    }

    let mut signed = payload.clone();
    signed.insert("token".into(), Value::String(api_token.to_string()));

    let mut mac = HmacSha256::new_from_slice(signature_key.as_bytes())
        .map_err(|e| CodecError::Signing(e.to_string()))?;
    mac.update(canonicalize(&signed).as_bytes());
    Ok(mac)
}

/// Sign `payload` together with `api_token` under `signature_key`.
pub fn sign(payload: &Payload, api_token: &str, signature_key: &str) -> Result<String, CodecError> {
    let mac = keyed_mac(payload, api_token, signature_key)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Legacy generation body: the payload as a JSON object.
pub fn encode(payload: &Payload) -> String {
    Value::Object(payload.clone()).to_string()
}

/// Signed generation body.
pub fn encode_signed(
    credentials: &Credentials,
    payload: &Payload,
) -> Result<SignedEnvelope, CodecError> {
    let key = credentials
        .signature_key()
        .ok_or_else(|| CodecError::Signing("no signature key configured".into()))?;
    let token = credentials.api_token();

    Ok(SignedEnvelope {
        payload: canonicalize(payload),
        token: token.to_string(),
        signature: sign(payload, token, key)?,
    })
}

/// Verify an inbound signed post and return its payload.
///
/// The signature is recomputed over the decoded payload and compared in
/// constant time.
pub fn decode_signed(credentials: &Credentials, post: &Payload) -> Result<Payload, CodecError> {
    let raw_payload = match post.get("payload") {
        Some(Value::String(s)) => s,
        Some(_) => return Err(CodecError::MalformedEnvelope("payload is not a string".into())),
        None => return Err(CodecError::MalformedEnvelope("payload is missing".into())),
    };
    let signature = match post.get("signature") {
        Some(Value::String(s)) => s,
        Some(_) => return Err(CodecError::MalformedEnvelope("signature is not a string".into())),
        None => return Err(CodecError::MalformedEnvelope("signature is missing".into())),
    };

    let payload = match serde_json::from_str::<Value>(raw_payload) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(CodecError::MalformedEnvelope("payload is not an object".into())),
        Err(e) => return Err(CodecError::MalformedEnvelope(format!("payload is not json: {e}"))),
    };

    let key = credentials
        .signature_key()
        .ok_or_else(|| CodecError::Signing("no signature key configured".into()))?;
    let mac = keyed_mac(&payload, credentials.api_token(), key)?;

    let expected = hex::decode(signature).map_err(|_| CodecError::SignatureMismatch)?;
    mac.verify_slice(&expected).map_err(|_| CodecError::SignatureMismatch)?;

    Ok(payload)
}
