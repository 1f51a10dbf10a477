//! End-to-end integration tests for the userbot.

mod common;

use async_trait::async_trait;
use common::*;
use serde_json::json;
use std::io::Write;
use userbot::{
    Answer, AppError, AppResult, Bot, Command, CommandAction, TemplateCommand, WebhookError,
};
use userbot_client::{CodecError, RequestError};
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_legacy_webhook_ping() {
    let server = mock_userbot_server().await;
    let bot = legacy_bot(&server);

    let answer = bot
        .serve_webhook(&webhook_message("/ping"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        answer.to_json(),
        json!({"answer": {"action": "message_send", "type": "text", "text": "pong"}})
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signed_webhook_echo() {
    let server = mock_userbot_server().await;
    let bot = signed_bot(&server);

    let answer = bot
        .serve_webhook(&signed_webhook("/echo [hello world]"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(answer.action(), "thread_send");
    assert_eq!(answer.fields()["text"], "hello world");
}

#[tokio::test]
async fn test_signed_webhook_rejects_tampering() {
    let server = mock_userbot_server().await;
    let bot = signed_bot(&server);

    let mut post = signed_webhook("/ping");
    post.insert("payload".into(), json!(r#"{"text":"/echo pwned"}"#));

    let err = bot.serve_webhook(&post).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Webhook(WebhookError::BadRequest(CodecError::SignatureMismatch))
    ));

    // A legacy-shaped body is not a valid signed envelope.
    let err = bot
        .serve_webhook(&webhook_message("/ping"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Webhook(WebhookError::BadRequest(CodecError::MalformedEnvelope(_)))
    ));
}

#[tokio::test]
async fn test_webhook_rejections() {
    let server = mock_userbot_server().await;
    let bot = legacy_bot(&server);

    let err = bot
        .serve_webhook(&payload(json!({"text": "/ping", "message_id": "m-1"})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Webhook(WebhookError::MissingField("user_id"))
    ));

    let err = bot
        .serve_webhook(&webhook_message("/pong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Webhook(WebhookError::BadCommand(_))));
}

/// Acknowledges in the group and mentions the sender.
struct AckAction;

#[async_trait]
impl CommandAction for AckAction {
    async fn run(&self, bot: &Bot, command: &Command) -> AppResult<Option<Answer>> {
        let order = command.argument("order_id").unwrap_or_default();
        let text = format!("@User-{} order {} accepted", command.sender_id, order);
        bot.send_group_message(&command.group_id, &text).await?;
        Ok(None)
    }
}

#[tokio::test]
async fn test_handler_calls_api_with_mentions() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/user/getList"))
        .and(header("Authorization", "bearer=test-token"))
        .respond_with(ok(user_page(40, 5)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v3/group/send"))
        .and(body_json(json!({
            "text": r#"["@"|42|"User 42"] order 17 accepted"#,
            "type": "text",
            "group_id": "g-1"
        })))
        .respond_with(ok(json!({"message_id": "m-200"})))
        .expect(1)
        .mount(&server)
        .await;

    let bot =
        legacy_bot(&server).with_handler(TemplateCommand::new("/order [order_id]", AckAction));

    let answer = bot
        .serve_webhook(&webhook_message("/order 17"))
        .await
        .unwrap();
    assert!(answer.is_none());
}

#[tokio::test]
async fn test_get_user_pages_through_list() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/user/getList"))
        .and(body_string_contains("\"offset\":0"))
        .respond_with(ok(user_page(1, 300)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v3/user/getList"))
        .and(body_string_contains("\"offset\":300"))
        .respond_with(ok(user_page(301, 2)))
        .mount(&server)
        .await;

    let bot = legacy_bot(&server);

    let user = bot.get_user(302).await.unwrap();
    assert_eq!(user.user_name, "User 302");

    let first = bot.get_user(3).await.unwrap();
    assert_eq!(first.user_id, 3);

    let err = bot.get_user(999).await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound(999)));
}

#[tokio::test]
async fn test_get_groups_accepts_legacy_keys() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/group/getList"))
        .and(body_json(json!({"limit": 300, "offset": 0})))
        .respond_with(ok(json!({"group_list": [
            {"group_id": "g-1", "name": "Ops", "avatar_file_url": ""},
            {"conversation_key": "c-2", "group_name": "Dev", "avatar_file_url": "https://a"}
        ]})))
        .mount(&server)
        .await;

    let groups = legacy_bot(&server).get_groups(300, 0).await.unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].group_id, "c-2");
    assert_eq!(groups[1].name, "Dev");
}

#[tokio::test]
async fn test_add_commands_merges_existing() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/command/getList"))
        .respond_with(ok(json!({"command_list": ["/ping", "/legacy"]})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v3/command/update"))
        .and(body_json(json!({"command_list": ["/ping", "/legacy", "/echo [text]"]})))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let bot = legacy_bot(&server);
    bot.add_commands(bot.dispatcher().templates()).await.unwrap();
}

#[tokio::test]
async fn test_remove_missing_command_skips_update() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/command/getList"))
        .respond_with(ok(json!({"command_list": ["/ping"]})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v3/command/update"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    legacy_bot(&server).remove_command("/gone").await.unwrap();
}

#[tokio::test]
async fn test_send_file_uploads_then_sends() {
    let server = mock_userbot_server().await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"report body").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v3/file/getUrl"))
        .respond_with(ok(json!({
            "node_url": format!("{}/upload", server.uri()),
            "file_token": "ft-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("ft-1"))
        .and(body_string_contains("report body"))
        .respond_with(ok(json!({"file_key": "k-1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v3/group/send"))
        .and(body_json(json!({"group_id": "g-1", "type": "file", "file_id": "k-1"})))
        .respond_with(ok(json!({"message_id": "m-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let message_id = legacy_bot(&server)
        .send_file_to_group("g-1", file.path())
        .await
        .unwrap();
    assert_eq!(message_id, "m-9");
}

#[tokio::test]
async fn test_signed_call_waits_for_completion() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/webhook/getVersion"))
        .and(body_string_contains("signature="))
        .respond_with(ok(json!({"request_id": "r-1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/request/get"))
        .respond_with(server_error(7, "in progress"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/request/get"))
        .respond_with(ok(json!({"version": 4})))
        .mount(&server)
        .await;

    let version = signed_bot(&server).get_webhook_version().await.unwrap();
    assert_eq!(version, 4);
}

#[tokio::test]
async fn test_server_errors_surface() {
    let server = mock_userbot_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/webhook/setVersion"))
        .respond_with(server_error(2, "version is too old"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v3/message/addReaction"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let bot = legacy_bot(&server);

    let err = bot.set_webhook_version(3).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Request(RequestError::BadRequest { code: 2, .. })
    ));

    let err = bot.react_on_message("m-1", ":+1:").await.unwrap_err();
    match err {
        AppError::Request(err) => assert_eq!(err.status(), Some(500)),
        other => panic!("unexpected error {other:?}"),
    }
}
