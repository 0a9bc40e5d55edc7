//! End-to-end tests driving the audit client against a live worker.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;

use serde_json::json;

use audient_engine::{AuditClient, AuditConfig, AuditError};
use audient_protocol::{CommandAction, HookEvent, HookEventType};

fn anthropic_request_event(content: &str) -> HookEvent {
    let body = json!({
        "model": "claude-x",
        "messages": [{"role": "user", "content": content}],
        "tools": []
    })
    .to_string();
    let mut data = HashMap::new();
    data.insert("method".to_string(), json!("POST"));
    data.insert(
        "url".to_string(),
        json!("https://api.anthropic.com/v1/messages"),
    );
    data.insert(
        "headers".to_string(),
        json!({"content-type": "application/json", "host": "api.anthropic.com"}),
    );
    data.insert("body".to_string(), json!(body));
    HookEvent::new(HookEventType::HttpRequest, data)
}

#[tokio::test]
async fn test_start_ping_shutdown() {
    let client = AuditClient::start(AuditConfig::default()).await.unwrap();
    assert!(client.is_running());

    let response = client
        .send_command_wait(CommandAction::Ping, None)
        .await
        .unwrap()
        .unwrap();
    assert!(response.success);

    client.shutdown().await.unwrap();
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_event_commands_are_acknowledged() {
    let client = AuditClient::start(AuditConfig::default()).await.unwrap();

    let callback_id = client
        .process_event(&anthropic_request_event("hello there"))
        .await
        .unwrap();
    assert!(!callback_id.is_empty());

    // The worker keeps responding after traffic events.
    let response = client
        .send_command_wait(CommandAction::Ping, None)
        .await
        .unwrap()
        .unwrap();
    assert!(response.success);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_response_correlation_skips_foreign_callbacks() {
    let client = AuditClient::start(AuditConfig::default()).await.unwrap();

    // Fire-and-forget commands leave their responses queued on the
    // transport; a later waiting call must skip past them.
    client.send_command(CommandAction::Ping, None).await.unwrap();
    client.send_command(CommandAction::Verbose, None).await.unwrap();

    let response = client
        .send_command_wait(CommandAction::Ping, None)
        .await
        .unwrap()
        .unwrap();
    assert!(response.success);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_commands_after_shutdown_are_refused() {
    let client = AuditClient::start(AuditConfig::default()).await.unwrap();
    client.shutdown().await.unwrap();

    let result = client.send_command(CommandAction::Ping, None).await;
    assert!(matches!(result, Err(AuditError::NotRunning)));
}

#[tokio::test]
async fn test_second_shutdown_is_a_noop() {
    let client = AuditClient::start(AuditConfig::default()).await.unwrap();
    client.shutdown().await.unwrap();
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_add_webhook_is_acknowledged() {
    let client = AuditClient::start(AuditConfig::default()).await.unwrap();

    let callback_id = client
        .add_webhook("http://localhost:9000/hook")
        .await
        .unwrap();
    assert!(!callback_id.is_empty());

    client.shutdown().await.unwrap();
}
