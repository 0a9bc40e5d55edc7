//! Anthropic messages API extraction.

use serde::Deserialize;
use serde_json::Value;

use audient_graph::{Edge, GraphStructure, Node, APP_NODE_ID};

use crate::context::ExtractContext;

#[derive(Debug, Deserialize)]
#[serde(tag = "role")]
enum AnthropicMessage {
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant { content: Vec<AssistantContent> },
    #[serde(rename = "system")]
    System { content: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AssistantContent {
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Map<String, Value>,
    },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    #[allow(dead_code)]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    tools: Vec<AnthropicTool>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    #[allow(dead_code)]
    id: String,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    message_type: String,
    #[allow(dead_code)]
    role: String,
    content: Vec<AssistantContent>,
}

/// Stringify a tool input map for PII analysis.
fn tool_input_text(input: &serde_json::Map<String, Value>) -> String {
    input
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value_text(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_content(
    content: &[AssistantContent],
    model: &str,
    ctx: &mut ExtractContext,
    edges: &mut Vec<Edge>,
) {
    for item in content {
        match item {
            AssistantContent::ToolUse { id, name, input } => {
                let text = tool_input_text(input);
                ctx.disclose_pii(&text, id);
                edges.push(
                    Edge::tool_call(
                        APP_NODE_ID,
                        name,
                        Value::Object(input.clone()),
                        Some(name.clone()),
                    )
                    .with_violation(ctx.drain_violations()),
                );
            }
            AssistantContent::Text { text } => {
                ctx.process_pii(text);
                edges.push(
                    Edge::model_generate(model, APP_NODE_ID, text)
                        .with_violation(ctx.drain_violations()),
                );
            }
        }
    }
}

pub fn try_request(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let request: AnthropicRequest = serde_json::from_value(value.clone()).ok()?;

    let mut nodes: Vec<Node> = vec![Node::llm(&request.model)];
    for tool in &request.tools {
        nodes.push(Node::tool(&tool.name, &tool.description));
    }

    // Walking the full history may duplicate edges already seen on an
    // earlier request; the graph tolerates that over-approximation.
    let mut edges: Vec<Edge> = Vec::new();
    for message in &request.messages {
        match message {
            AnthropicMessage::User { content } | AnthropicMessage::System { content } => {
                ctx.collect_pii(content);
                edges.push(
                    Edge::model_generate(APP_NODE_ID, &request.model, content)
                        .with_violation(ctx.drain_violations()),
                );
            }
            AnthropicMessage::Assistant { content } => {
                extract_content(content, &request.model, ctx, &mut edges);
            }
        }
    }
    Some((nodes, edges))
}

pub fn try_response(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let response: AnthropicResponse = serde_json::from_value(value.clone()).ok()?;

    let mut edges: Vec<Edge> = Vec::new();
    extract_content(&response.content, &response.model, ctx, &mut edges);
    Some((Vec::new(), edges))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::detector::PatternDetector;
    use audient_graph::EdgeType;
    use audient_policy::{PolicyTarget, RuntimeChecker, SERVICE_PROVIDERS};
    use serde_json::json;
    use std::collections::HashMap;

    fn no_checker_ctx(headers: &HashMap<String, String>) -> ExtractContext<'_> {
        ExtractContext::new(&PatternDetector, None, headers)
    }

    fn email_target() -> PolicyTarget {
        PolicyTarget {
            data_type: "email".to_string(),
            prohibited_col: false,
            collection: None,
            processing: None,
            disclosure: Some(SERVICE_PROVIDERS.to_string()),
            prohibited_dis: false,
            retention: None,
        }
    }

    #[test]
    fn test_request_produces_model_and_tool_nodes() {
        let headers = HashMap::new();
        let mut ctx = no_checker_ctx(&headers);
        let payload = json!({
            "model": "claude-x",
            "messages": [{"role": "user", "content": "hello"}],
            "tools": [{
                "name": "get_weather",
                "description": "Look up the weather",
                "input_schema": {"type": "object"}
            }]
        });

        let (nodes, edges) = try_request(&payload, &mut ctx).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node_id, "claude-x");
        assert_eq!(nodes[1].node_id, "get_weather");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].edge_type, EdgeType::ModelGenerate);
        assert_eq!(edges[0].source_node_id, APP_NODE_ID);
        assert_eq!(edges[0].target_node_id, "claude-x");
    }

    #[test]
    fn test_request_without_tools_field_is_rejected() {
        let headers = HashMap::new();
        let mut ctx = no_checker_ctx(&headers);
        let payload = json!({
            "model": "claude-x",
            "messages": [{"role": "user", "content": "hello"}]
        });
        assert!(try_request(&payload, &mut ctx).is_none());
    }

    #[test]
    fn test_assistant_tool_use_emits_tool_call_edge() {
        let headers = HashMap::new();
        let mut ctx = no_checker_ctx(&headers);
        let payload = json!({
            "model": "claude-x",
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "toolu_01", "name": "get_weather",
                     "input": {"city": "Berlin"}},
                    {"type": "text", "text": "Checking the weather now."}
                ]}
            ],
            "tools": []
        });

        let (_, edges) = try_request(&payload, &mut ctx).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].edge_type, EdgeType::ToolCall);
        assert_eq!(edges[0].target_node_id, "get_weather");
        assert_eq!(edges[1].edge_type, EdgeType::ModelGenerate);
        assert_eq!(edges[1].source_node_id, "claude-x");
        assert_eq!(edges[1].target_node_id, APP_NODE_ID);
    }

    #[test]
    fn test_unknown_pii_type_lands_on_edge_violation() {
        let mut checker = RuntimeChecker::new(vec![email_target()]);
        let headers = HashMap::new();
        let mut ctx = ExtractContext::new(&PatternDetector, Some(&mut checker), &headers);
        let payload = json!({
            "model": "claude-x",
            "messages": [{"role": "user", "content": "My SSN is 123-45-6789"}],
            "tools": []
        });

        let (nodes, edges) = try_request(&payload, &mut ctx).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(edges.len(), 1);
        let violation = edges[0].violation_info.as_deref().unwrap();
        assert!(violation.contains("not found in target policies"));
    }

    #[test]
    fn test_tool_use_discloses_to_tool_use_id() {
        let mut checker = RuntimeChecker::new(vec![email_target()]);
        let headers = HashMap::new();
        let mut ctx = ExtractContext::new(&PatternDetector, Some(&mut checker), &headers);
        let payload = json!({
            "model": "claude-x",
            "messages": [
                {"role": "user", "content": "mail bob@example.com"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "toolu_42", "name": "send_mail",
                     "input": {"to": "bob@example.com"}}
                ]}
            ],
            "tools": []
        });

        let result = try_request(&payload, &mut ctx);
        assert!(result.is_some());
        drop(ctx);
        let entry = checker.tracked("bob@example.com").unwrap();
        assert_eq!(entry.disclosure.as_deref(), Some("toolu_42"));
    }

    #[test]
    fn test_response_content_walk() {
        let headers = HashMap::new();
        let mut ctx = no_checker_ctx(&headers);
        let payload = json!({
            "model": "claude-x",
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "All done."}]
        });

        let (nodes, edges) = try_response(&payload, &mut ctx).unwrap();
        assert!(nodes.is_empty());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_node_id, "claude-x");
    }
}
