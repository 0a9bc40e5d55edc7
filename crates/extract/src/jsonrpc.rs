//! MCP JSON-RPC extraction.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use audient_graph::{Edge, GraphStructure, McpMethod, Node, APP_NODE_ID};

use crate::context::ExtractContext;

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    arguments: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct JsonrpcRequest {
    method: McpMethod,
    params: Option<CallParams>,
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallResult {
    content: Vec<ContentItem>,
    #[serde(rename = "isError")]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct McpToolInfo {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    #[allow(dead_code)]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ToolListResult {
    tools: Vec<McpToolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonrpcResult {
    ToolCall(ToolCallResult),
    ToolList(ToolListResult),
}

#[derive(Debug, Deserialize)]
struct JsonrpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: Value,
    result: JsonrpcResult,
}

pub fn try_request(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let request: JsonrpcRequest = serde_json::from_value(value.clone()).ok()?;
    let host = ctx.host();

    match request.method {
        McpMethod::ToolsList => {
            let nodes = vec![Node::mcp_server(&host)];
            let edges = vec![Edge::mcp_call(APP_NODE_ID, &host, McpMethod::ToolsList, None)];
            Some((nodes, edges))
        }
        McpMethod::ToolsCall => {
            let mut edges: Vec<Edge> = Vec::new();
            let payload = request
                .params
                .as_ref()
                .map(|p| serde_json::json!({"name": p.name, "arguments": p.arguments}));
            edges.push(Edge::mcp_call(
                APP_NODE_ID,
                &host,
                McpMethod::ToolsCall,
                payload,
            ));

            let (tool_name, arguments) = match &request.params {
                Some(params) => (params.name.clone(), Value::Object(params.arguments.clone())),
                None => (String::new(), Value::Object(serde_json::Map::new())),
            };
            if let Some(params) = &request.params {
                let text = params
                    .arguments
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, argument_text(v)))
                    .collect::<Vec<_>>()
                    .join(" ");
                ctx.disclose_pii(&text, &host);
            }
            edges.push(
                Edge::tool_call(&host, &tool_name, arguments, Some(tool_name.clone()))
                    .with_violation(ctx.drain_violations()),
            );

            let nodes = vec![Node::mcp_server(&host)];
            Some((nodes, edges))
        }
    }
}

pub fn try_response(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let response: JsonrpcResponse = serde_json::from_value(value.clone()).ok()?;
    let host = ctx.host();

    match response.result {
        JsonrpcResult::ToolCall(result) => {
            if result.is_error {
                debug!("Skipping MCP tool call error result");
                return Some((Vec::new(), Vec::new()));
            }
            let payload = serde_json::json!({
                "content": result
                    .content
                    .iter()
                    .map(|c| serde_json::json!({"type": "text", "text": c.text}))
                    .collect::<Vec<_>>(),
                "isError": result.is_error,
            });
            let nodes = vec![Node::mcp_server(&host)];
            let edges = vec![Edge::mcp_call(
                &host,
                APP_NODE_ID,
                McpMethod::ToolsCall,
                Some(payload),
            )];
            Some((nodes, edges))
        }
        JsonrpcResult::ToolList(result) => {
            let mut nodes = vec![Node::mcp_server(&host)];
            let payload = serde_json::json!({
                "tools": result
                    .tools
                    .iter()
                    .map(|t| serde_json::json!({"name": t.name, "description": t.description}))
                    .collect::<Vec<_>>(),
            });
            let edges = vec![Edge::mcp_call(
                &host,
                APP_NODE_ID,
                McpMethod::ToolsList,
                Some(payload),
            )];
            // Every advertised tool becomes a node hosted by this server.
            for tool in &result.tools {
                nodes.push(Node::hosted_tool(&tool.name, &tool.description, &host));
            }
            Some((nodes, edges))
        }
    }
}

fn argument_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::detector::PatternDetector;
    use audient_graph::{EdgeType, NodeType};
    use serde_json::json;
    use std::collections::HashMap;

    fn host_headers() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "mcp.example.com".to_string());
        headers
    }

    #[test]
    fn test_tools_list_request() {
        let headers = host_headers();
        let mut ctx = ExtractContext::new(&PatternDetector, None, &headers);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list"
        });

        let (nodes, edges) = try_request(&payload, &mut ctx).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_id, "mcp.example.com");
        assert_eq!(nodes[0].node_type, NodeType::McpServer);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].edge_type, EdgeType::McpCall);
    }

    #[test]
    fn test_tools_call_request_emits_call_and_tool_edges() {
        let headers = host_headers();
        let mut ctx = ExtractContext::new(&PatternDetector, None, &headers);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": "req-2",
            "method": "tools/call",
            "params": {"name": "lookup", "arguments": {"key": "value"}}
        });

        let (nodes, edges) = try_request(&payload, &mut ctx).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].edge_type, EdgeType::McpCall);
        assert_eq!(edges[1].edge_type, EdgeType::ToolCall);
        assert_eq!(edges[1].source_node_id, "mcp.example.com");
        assert_eq!(edges[1].target_node_id, "lookup");
    }

    #[test]
    fn test_unsupported_method_is_rejected() {
        let headers = host_headers();
        let mut ctx = ExtractContext::new(&PatternDetector, None, &headers);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "resources/list"
        });
        assert!(try_request(&payload, &mut ctx).is_none());
    }

    #[test]
    fn test_tool_list_response_registers_hosted_tools() {
        let headers = host_headers();
        let mut ctx = ExtractContext::new(&PatternDetector, None, &headers);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "result": {"tools": [
                {"name": "lookup", "description": "Key lookup", "inputSchema": {"type": "object"}},
                {"name": "store", "description": "Key store", "inputSchema": {"type": "object"}}
            ]}
        });

        let (nodes, edges) = try_response(&payload, &mut ctx).unwrap();
        assert_eq!(nodes.len(), 3);
        let lookup = nodes.iter().find(|n| n.node_id == "lookup").unwrap();
        assert_eq!(lookup.host_node.as_deref(), Some("mcp.example.com"));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_node_id, "mcp.example.com");
        assert_eq!(edges[0].target_node_id, APP_NODE_ID);
    }

    #[test]
    fn test_tool_call_error_result_is_skipped() {
        let headers = host_headers();
        let mut ctx = ExtractContext::new(&PatternDetector, None, &headers);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "result": {"content": [{"type": "text", "text": "boom"}], "isError": true}
        });

        let (nodes, edges) = try_response(&payload, &mut ctx).unwrap();
        assert!(nodes.is_empty());
        assert!(edges.is_empty());
    }

    #[test]
    fn test_tool_call_result_emits_return_edge() {
        let headers = host_headers();
        let mut ctx = ExtractContext::new(&PatternDetector, None, &headers);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 6,
            "result": {"content": [{"type": "text", "text": "42"}], "isError": false}
        });

        let (nodes, edges) = try_response(&payload, &mut ctx).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_node_id, APP_NODE_ID);
    }
}
