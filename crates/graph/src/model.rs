//! Node and edge models for the agent call graph.

use serde::{Deserialize, Serialize};

/// Well-known id of the application root node.
pub const APP_NODE_ID: &str = "app";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Llm,
    Tool,
    #[serde(rename = "app")]
    Application,
    McpServer,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    ModelGenerate,
    ToolCall,
    McpCall,
}

/// MCP JSON-RPC methods the audit understands.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    #[serde(rename = "tools/call")]
    ToolsCall,
    #[serde(rename = "tools/list")]
    ToolsList,
}

/// A graph node. Identity is `node_id`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Node {
    pub node_id: String,
    pub node_type: NodeType,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_node: Option<String>,
}

impl Node {
    /// The application root node.
    pub fn app() -> Self {
        Self {
            node_id: APP_NODE_ID.to_string(),
            node_type: NodeType::Application,
            created_at: unix_now(),
            tool_description: None,
            host_node: None,
        }
    }

    pub fn llm(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            node_type: NodeType::Llm,
            created_at: unix_now(),
            tool_description: None,
            host_node: None,
        }
    }

    pub fn tool(node_id: &str, description: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            node_type: NodeType::Tool,
            created_at: unix_now(),
            tool_description: Some(description.to_string()),
            host_node: None,
        }
    }

    /// A tool advertised by an MCP server; `host` back-references the server node.
    pub fn hosted_tool(node_id: &str, description: &str, host: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            node_type: NodeType::Tool,
            created_at: unix_now(),
            tool_description: Some(description.to_string()),
            host_node: Some(host.to_string()),
        }
    }

    pub fn mcp_server(host: &str) -> Self {
        Self {
            node_id: host.to_string(),
            node_type: NodeType::McpServer,
            created_at: unix_now(),
            tool_description: None,
            host_node: None,
        }
    }
}

/// Kind-specific edge payload, flattened into the serialized edge.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum EdgeDetail {
    ModelGenerate {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        history_size: Option<usize>,
    },
    ToolCall {
        tool_input: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
    },
    McpCall {
        method: McpMethod,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
}

/// A directed edge between two nodes. Edges are append-only and never
/// deduplicated; observing the same interaction on both the request and the
/// response leg may produce duplicates, which is a harmless
/// over-approximation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub source_node_id: String,
    pub target_node_id: String,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_info: Option<String>,
    #[serde(flatten)]
    pub detail: EdgeDetail,
}

impl Edge {
    pub fn model_generate(source: &str, target: &str, prompt: &str) -> Self {
        Self {
            edge_type: EdgeType::ModelGenerate,
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            created_at: unix_now(),
            violation_info: None,
            detail: EdgeDetail::ModelGenerate {
                prompt: prompt.to_string(),
                history_size: None,
            },
        }
    }

    pub fn model_generate_with_history(
        source: &str,
        target: &str,
        prompt: &str,
        history_size: usize,
    ) -> Self {
        Self {
            detail: EdgeDetail::ModelGenerate {
                prompt: prompt.to_string(),
                history_size: Some(history_size),
            },
            ..Self::model_generate(source, target, prompt)
        }
    }

    pub fn tool_call(
        source: &str,
        target: &str,
        tool_input: serde_json::Value,
        tool_name: Option<String>,
    ) -> Self {
        Self {
            edge_type: EdgeType::ToolCall,
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            created_at: unix_now(),
            violation_info: None,
            detail: EdgeDetail::ToolCall {
                tool_input,
                tool_name,
            },
        }
    }

    pub fn mcp_call(
        source: &str,
        target: &str,
        method: McpMethod,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            edge_type: EdgeType::McpCall,
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            created_at: unix_now(),
            violation_info: None,
            detail: EdgeDetail::McpCall { method, payload },
        }
    }

    /// Attach accumulated compliance issues to this edge.
    pub fn with_violation(mut self, violation_info: Option<String>) -> Self {
        self.violation_info = violation_info;
        self
    }
}

/// Nodes and edges produced by one extraction.
pub type GraphStructure = (Vec<Node>, Vec<Edge>);

pub(crate) fn unix_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
