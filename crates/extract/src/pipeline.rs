//! Hook event processing pipeline: normalize, dispatch, extract.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use audient_graph::GraphStructure;
use audient_policy::RuntimeChecker;
use audient_protocol::{HookEvent, HookEventType, HttpRequestData, HttpResponseData};

use crate::context::ExtractContext;
use crate::detector::PiiDetector;
use crate::normalize::NormalizerSet;
use crate::registry::dispatch;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid hook event: {0}")]
    InvalidEvent(String),
}

/// Run one intercepted traffic event through normalization, schema dispatch
/// and policy checking.
///
/// # Returns
/// `Ok(Some(structure))` when a registered schema matched; `Ok(None)` for
/// bodies that are absent, non-JSON or unrecognized (all no-ops by design).
///
/// # Errors
/// Only a `HookEvent` whose `data` does not decode as HTTP request/response
/// data is an error; payload content never is.
pub fn process_hook_event(
    event: &HookEvent,
    normalizers: &NormalizerSet,
    detector: &dyn PiiDetector,
    checker: Option<&mut RuntimeChecker>,
) -> Result<Option<GraphStructure>, ExtractError> {
    let data = Value::Object(event.data.clone().into_iter().collect());

    let (headers, content_type, body) = match event.event_type {
        HookEventType::HttpRequest => {
            let request: HttpRequestData = serde_json::from_value(data)
                .map_err(|e| ExtractError::InvalidEvent(e.to_string()))?;
            let content_type = header_value(&request.headers, "content-type").map(str::to_string);
            (request.headers, content_type, request.body)
        }
        HookEventType::HttpResponse => {
            let response: HttpResponseData = serde_json::from_value(data)
                .map_err(|e| ExtractError::InvalidEvent(e.to_string()))?;
            // The response's own content-type drives normalization, but MCP
            // server nodes key on the originating request's host header.
            let content_type = header_value(&response.headers, "content-type").map(str::to_string);
            let headers = request_headers(&response.request).unwrap_or(response.headers);
            (headers, content_type, response.body)
        }
    };

    let Some(body) = body else {
        return Ok(None);
    };

    let normalized = normalizers.normalize(content_type.as_deref(), &body);
    let value: Value = match serde_json::from_str(&normalized) {
        Ok(value) => value,
        Err(e) => {
            debug!("Body is not a JSON document, skipping: {}", e);
            return Ok(None);
        }
    };

    let mut ctx = ExtractContext::new(detector, checker, &headers);
    Ok(dispatch(&value, &mut ctx).map(|(_, structure)| structure))
}

fn request_headers(request: &HashMap<String, Value>) -> Option<HashMap<String, String>> {
    let headers = request.get("headers")?.as_object()?;
    Some(
        headers
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::detector::PatternDetector;
    use audient_graph::{EdgeType, NodeType};
    use audient_policy::PolicyTarget;
    use serde_json::json;

    fn request_event(body: &str, content_type: &str) -> HookEvent {
        let mut data = HashMap::new();
        data.insert("method".to_string(), json!("POST"));
        data.insert(
            "url".to_string(),
            json!("https://api.anthropic.com/v1/messages"),
        );
        data.insert(
            "headers".to_string(),
            json!({"content-type": content_type, "host": "api.anthropic.com"}),
        );
        data.insert("body".to_string(), json!(body));
        HookEvent::new(HookEventType::HttpRequest, data)
    }

    #[test]
    fn test_end_to_end_ssn_violation_lands_on_generate_edge() {
        let body = json!({
            "model": "claude-x",
            "messages": [{"role": "user", "content": "My SSN is 123-45-6789"}],
            "tools": []
        })
        .to_string();
        let event = request_event(&body, "application/json");

        // Target table knows emails but not SSNs.
        let mut checker = RuntimeChecker::new(vec![PolicyTarget {
            data_type: "email".to_string(),
            prohibited_col: false,
            collection: None,
            processing: None,
            disclosure: None,
            prohibited_dis: false,
            retention: None,
        }]);

        let structure = process_hook_event(
            &event,
            &NormalizerSet::new(),
            &PatternDetector,
            Some(&mut checker),
        )
        .unwrap()
        .unwrap();

        let (nodes, edges) = structure;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_id, "claude-x");
        assert_eq!(nodes[0].node_type, NodeType::Llm);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].edge_type, EdgeType::ModelGenerate);
        let violation = edges[0].violation_info.as_deref().unwrap();
        assert!(violation.contains("not found in target policies"));
    }

    #[test]
    fn test_event_stream_body_is_normalized_before_dispatch() {
        let inner = json!({
            "model": "claude-x",
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "done"}]
        })
        .to_string();
        let body = format!("event: message\ndata: {}\n\n", inner);
        let event = request_event(&body, "text/event-stream");

        let structure =
            process_hook_event(&event, &NormalizerSet::new(), &PatternDetector, None)
                .unwrap()
                .unwrap();
        assert_eq!(structure.1.len(), 1);
    }

    #[test]
    fn test_missing_body_is_a_noop() {
        let mut data = HashMap::new();
        data.insert("method".to_string(), json!("GET"));
        data.insert("url".to_string(), json!("https://api.anthropic.com/v1"));
        data.insert("headers".to_string(), json!({}));
        let event = HookEvent::new(HookEventType::HttpRequest, data);

        let result =
            process_hook_event(&event, &NormalizerSet::new(), &PatternDetector, None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_non_json_body_is_a_noop() {
        let event = request_event("<html>hi</html>", "text/html");
        let result =
            process_hook_event(&event, &NormalizerSet::new(), &PatternDetector, None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_undecodable_event_data_is_an_error() {
        let mut data = HashMap::new();
        data.insert("nonsense".to_string(), json!(1));
        let event = HookEvent::new(HookEventType::HttpRequest, data);

        let result = process_hook_event(&event, &NormalizerSet::new(), &PatternDetector, None);
        assert!(matches!(result, Err(ExtractError::InvalidEvent(_))));
    }

    #[test]
    fn test_response_uses_request_host_for_mcp() {
        let mut data = HashMap::new();
        data.insert("status_code".to_string(), json!(200));
        data.insert(
            "headers".to_string(),
            json!({"content-type": "application/json"}),
        );
        data.insert(
            "body".to_string(),
            json!(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"tools": [
                    {"name": "lookup", "description": "d", "inputSchema": {}}
                ]}
            })
            .to_string()),
        );
        data.insert(
            "request".to_string(),
            json!({"headers": {"host": "mcp.internal:9000"}}),
        );
        let event = HookEvent::new(HookEventType::HttpResponse, data);

        let (nodes, _) =
            process_hook_event(&event, &NormalizerSet::new(), &PatternDetector, None)
                .unwrap()
                .unwrap();
        assert!(nodes.iter().any(|n| n.node_id == "mcp.internal:9000"));
    }
}
