//! Ollama chat and generate API extraction.

use serde::Deserialize;
use serde_json::Value;

use audient_graph::{Edge, GraphStructure, Node, APP_NODE_ID};

use crate::context::ExtractContext;

#[derive(Debug, Deserialize)]
#[serde(tag = "role")]
enum OllamaMessage {
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant {
        #[allow(dead_code)]
        content: String,
    },
    #[serde(rename = "system")]
    System {
        #[allow(dead_code)]
        content: String,
    },
}

#[derive(Debug, Deserialize)]
struct OllamaFunction {
    name: String,
    description: String,
    #[allow(dead_code)]
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    tool_type: String,
    function: OllamaFunction,
}

#[derive(Debug, Deserialize)]
struct OllamaChatRequest {
    model: String,
    #[allow(dead_code)]
    stream: bool,
    #[allow(dead_code)]
    options: serde_json::Map<String, Value>,
    messages: Vec<OllamaMessage>,
    #[serde(default)]
    tools: Vec<OllamaTool>,
}

#[derive(Debug, Deserialize)]
struct OllamaAssistantMessage {
    #[allow(dead_code)]
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    #[allow(dead_code)]
    created_at: String,
    message: OllamaAssistantMessage,
    #[allow(dead_code)]
    total_duration: i64,
    #[allow(dead_code)]
    load_duration: i64,
    #[allow(dead_code)]
    prompt_eval_count: i64,
    #[allow(dead_code)]
    prompt_eval_duration: i64,
    #[allow(dead_code)]
    eval_count: i64,
    #[allow(dead_code)]
    eval_duration: i64,
}

/// A tool invocation embedded as one line of assistant content.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OllamaToolCall {
    name: String,
    parameters: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[allow(dead_code)]
    options: serde_json::Map<String, Value>,
    #[allow(dead_code)]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    model: String,
    #[allow(dead_code)]
    created_at: String,
    response: String,
    #[allow(dead_code)]
    done: bool,
}

pub fn try_chat_request(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let request: OllamaChatRequest = serde_json::from_value(value.clone()).ok()?;

    let mut nodes: Vec<Node> = vec![Node::llm(&request.model)];
    let mut edges: Vec<Edge> = Vec::new();

    for message in &request.messages {
        if let OllamaMessage::User { content } = message {
            ctx.collect_pii(content);
            edges.push(
                Edge::model_generate(APP_NODE_ID, &request.model, content)
                    .with_violation(ctx.drain_violations()),
            );
        }
    }
    for tool in &request.tools {
        nodes.push(Node::tool(&tool.function.name, &tool.function.description));
    }
    Some((nodes, edges))
}

pub fn try_chat_response(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let response: OllamaChatResponse = serde_json::from_value(value.clone()).ok()?;

    let mut edges: Vec<Edge> = Vec::new();
    // Tool calls arrive as single-line JSON objects inside the content.
    for part in response.message.content.split('\n') {
        match serde_json::from_str::<OllamaToolCall>(part) {
            Ok(tool_call) => {
                edges.push(Edge::tool_call(
                    APP_NODE_ID,
                    &tool_call.name,
                    Value::Object(tool_call.parameters),
                    Some(tool_call.name.clone()),
                ));
            }
            Err(_) => {
                ctx.process_pii(&response.message.content);
                edges.push(
                    Edge::model_generate(&response.model, APP_NODE_ID, &response.message.content)
                        .with_violation(ctx.drain_violations()),
                );
            }
        }
    }
    Some((Vec::new(), edges))
}

pub fn try_generate_request(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let request: OllamaGenerateRequest = serde_json::from_value(value.clone()).ok()?;

    ctx.collect_pii(&request.prompt);
    let nodes = vec![Node::llm(&request.model)];
    let edges = vec![
        Edge::model_generate(APP_NODE_ID, &request.model, &request.prompt)
            .with_violation(ctx.drain_violations()),
    ];
    Some((nodes, edges))
}

pub fn try_generate_response(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let response: OllamaGenerateResponse = serde_json::from_value(value.clone()).ok()?;

    ctx.process_pii(&response.response);
    let edges = vec![
        Edge::model_generate(&response.model, APP_NODE_ID, &response.response)
            .with_violation(ctx.drain_violations()),
    ];
    Some((Vec::new(), edges))
}
