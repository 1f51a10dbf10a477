//! Common test utilities for integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use userbot::{builtin_handlers, Bot, Credentials, Dispatcher, Payload, UrlProvider, UserbotClient};
use userbot_client::{codec, DEFAULT_USER_AGENT};
use wiremock::{MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_KEY: &str = "test-signature-key";

/// Start a mock userbot API server.
pub async fn mock_userbot_server() -> MockServer {
    MockServer::start().await
}

fn test_client(mock_server: &MockServer, credentials: Credentials) -> UserbotClient {
    UserbotClient::new(
        credentials,
        UrlProvider::new(Some(mock_server.uri())),
        Duration::from_secs(5),
        DEFAULT_USER_AGENT,
    )
    .unwrap()
    .with_poll_interval(Duration::from_millis(20))
    .with_wait_timeout(Duration::from_secs(2))
}

/// Legacy-protocol bot with the built-in handlers.
pub fn legacy_bot(mock_server: &MockServer) -> Bot {
    Bot::new(test_client(mock_server, Credentials::new(TEST_TOKEN)))
        .with_dispatcher(Dispatcher::with_handlers(builtin_handlers()))
}

/// Signed-protocol bot with the built-in handlers.
pub fn signed_bot(mock_server: &MockServer) -> Bot {
    Bot::new(test_client(
        mock_server,
        Credentials::signed(TEST_TOKEN, TEST_KEY),
    ))
    .with_dispatcher(Dispatcher::with_handlers(builtin_handlers()))
}

pub fn ok(response: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "response": response}))
}

pub fn server_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "error",
        "response": {"error_code": code, "message": message}
    }))
}

pub fn payload(value: Value) -> Payload {
    value.as_object().cloned().unwrap()
}

/// Inbound webhook fields for a command line.
pub fn webhook_message(text: &str) -> Payload {
    payload(json!({
        "text": text,
        "user_id": 42,
        "message_id": "m-100",
        "group_id": "g-1"
    }))
}

/// Signed webhook post as the server would send it.
pub fn signed_webhook(text: &str) -> Payload {
    let envelope = codec::encode_signed(
        &Credentials::signed(TEST_TOKEN, TEST_KEY),
        &webhook_message(text),
    )
    .unwrap();

    payload(serde_json::to_value(envelope).unwrap())
}

/// `count` users with consecutive ids starting at `first_id`.
pub fn user_page(first_id: i64, count: i64) -> Value {
    let users: Vec<Value> = (first_id..first_id + count)
        .map(|id| {
            json!({
                "user_id": id,
                "user_name": format!("User {id}"),
                "avatar_file_url": ""
            })
        })
        .collect();

    json!({ "user_list": users })
}
