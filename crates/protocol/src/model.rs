//! Data models for supervisor/worker IPC.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actions carried by a [`Command`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Event,
    Shutdown,
    Ping,
    AddWebhook,
    Verbose,
}

/// A single command sent from the supervisor to the audit worker.
///
/// Immutable once created; `callback_id` uniquely correlates the matching
/// [`CommandResponse`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Command {
    pub action: CommandAction,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    pub callback_id: String,
    pub execution_id: String,
    pub timestamp: f64,
}

impl Command {
    /// Create a new command with a fresh callback id and current timestamp.
    pub fn new(
        execution_id: &str,
        action: CommandAction,
        params: Option<HashMap<String, serde_json::Value>>,
    ) -> Self {
        Self {
            action,
            params: params.unwrap_or_default(),
            callback_id: uuid::Uuid::new_v4().to_string(),
            execution_id: execution_id.to_string(),
            timestamp: unix_now(),
        }
    }
}

/// Acknowledgement for a processed [`Command`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    pub timestamp: f64,
}

impl CommandResponse {
    /// Successful response correlated to a command.
    pub fn ok(callback_id: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            callback_id: Some(callback_id.to_string()),
            timestamp: unix_now(),
        }
    }

    /// Failed response correlated to a command.
    pub fn failure(callback_id: &str, error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            callback_id: Some(callback_id.to_string()),
            timestamp: unix_now(),
        }
    }
}

/// Kinds of intercepted traffic events.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HookEventType {
    HttpRequest,
    HttpResponse,
}

/// Normalized unit handed in from the interception layer.
///
/// `data` is the JSON-decoded HTTP request or response; the core makes no
/// assumption about how it was captured.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HookEvent {
    pub event_type: HookEventType,
    pub data: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl HookEvent {
    pub fn new(event_type: HookEventType, data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Decoded outbound HTTP request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpRequestData {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Decoded inbound HTTP response, carrying the originating request so
/// extractors can read the request host.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpResponseData {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub request: HashMap<String, serde_json::Value>,
}

/// Current unix time in fractional seconds.
pub fn unix_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_round_trip() {
        let mut params = HashMap::new();
        params.insert("url".to_string(), json!("http://localhost:9000/hook"));
        let cmd = Command::new("exec-1", CommandAction::AddWebhook, Some(params));

        let serialized = serde_json::to_string(&cmd).unwrap();
        let deserialized: Command = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.action, CommandAction::AddWebhook);
        assert_eq!(deserialized.callback_id, cmd.callback_id);
        assert_eq!(deserialized.execution_id, "exec-1");
        assert_eq!(deserialized.params["url"], json!("http://localhost:9000/hook"));
    }

    #[test]
    fn test_command_round_trip_without_params() {
        let cmd = Command::new("exec-1", CommandAction::Ping, None);
        let serialized = serde_json::to_string(&cmd).unwrap();
        let deserialized: Command = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.action, CommandAction::Ping);
        assert!(deserialized.params.is_empty());
    }

    #[test]
    fn test_action_serialization_format() {
        assert_eq!(
            serde_json::to_string(&CommandAction::AddWebhook).unwrap(),
            r#""add_webhook""#
        );
        assert_eq!(
            serde_json::to_string(&CommandAction::Event).unwrap(),
            r#""event""#
        );
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let response = CommandResponse::ok("cb-1", None);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["callback_id"], json!("cb-1"));
        assert!(value.get("data").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_response_carries_error() {
        let response = CommandResponse::failure("cb-2", "bad event".to_string());
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("bad event"));
    }

    #[test]
    fn test_hook_event_round_trip() {
        let mut data = HashMap::new();
        data.insert("method".to_string(), json!("POST"));
        let event = HookEvent::new(HookEventType::HttpRequest, data);

        let serialized = serde_json::to_string(&event).unwrap();
        let deserialized: HookEvent = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.event_type, HookEventType::HttpRequest);
        assert_eq!(deserialized.data["method"], json!("POST"));
    }

    #[test]
    fn test_http_request_data_decode() {
        let raw = json!({
            "method": "POST",
            "url": "https://api.anthropic.com/v1/messages",
            "headers": {"content-type": "application/json"},
            "body": "{}"
        });
        let request: HttpRequestData = serde_json::from_value(raw).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some("{}"));
    }
}
