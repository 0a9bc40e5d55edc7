//! OpenAI chat completions extraction.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use audient_graph::{Edge, GraphStructure, Node, APP_NODE_ID};

use crate::context::ExtractContext;

#[derive(Debug, Deserialize)]
#[serde(tag = "role")]
enum OpenAiMessage {
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant {
        content: Option<String>,
        #[serde(default)]
        #[allow(dead_code)]
        tool_calls: Vec<Value>,
    },
    #[serde(rename = "system")]
    System { content: String },
    #[serde(rename = "tool")]
    Tool {
        #[allow(dead_code)]
        content: String,
        #[allow(dead_code)]
        tool_call_id: String,
    },
}

#[derive(Debug, Deserialize)]
struct FunctionDetails {
    name: String,
    description: String,
    #[allow(dead_code)]
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    tool_type: String,
    function: FunctionDetails,
}

#[derive(Debug, Deserialize)]
struct OpenAiRequest {
    messages: Vec<OpenAiMessage>,
    model: String,
    #[allow(dead_code)]
    stream: bool,
    #[serde(default)]
    tools: Vec<OpenAiTool>,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[allow(dead_code)]
    id: String,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    call_type: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[allow(dead_code)]
    role: String,
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[allow(dead_code)]
    index: i64,
    message: ResponseMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[allow(dead_code)]
    id: String,
    object: String,
    #[allow(dead_code)]
    created: i64,
    model: String,
    choices: Vec<Choice>,
}

pub fn try_request(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let request: OpenAiRequest = serde_json::from_value(value.clone()).ok()?;

    let mut nodes: Vec<Node> = vec![Node::llm(&request.model)];
    let mut edges: Vec<Edge> = Vec::new();

    for message in &request.messages {
        match message {
            OpenAiMessage::User { content } => {
                ctx.collect_pii(content);
                edges.push(
                    Edge::model_generate_with_history(
                        APP_NODE_ID,
                        &request.model,
                        content,
                        request.messages.len(),
                    )
                    .with_violation(ctx.drain_violations()),
                );
            }
            OpenAiMessage::Assistant {
                content: Some(content),
                ..
            } => {
                edges.push(Edge::model_generate(&request.model, APP_NODE_ID, content));
            }
            // Tool results echo the app's own data back to the model; the
            // tool-call edge was already recorded from the assistant turn.
            OpenAiMessage::Assistant { content: None, .. }
            | OpenAiMessage::System { .. }
            | OpenAiMessage::Tool { .. } => {}
        }
    }

    for tool in &request.tools {
        nodes.push(Node::tool(&tool.function.name, &tool.function.description));
    }
    Some((nodes, edges))
}

pub fn try_response(value: &Value, ctx: &mut ExtractContext) -> Option<GraphStructure> {
    let response: OpenAiResponse = serde_json::from_value(value.clone()).ok()?;
    if response.object != "chat.completion" {
        return None;
    }

    let mut edges: Vec<Edge> = Vec::new();
    for choice in &response.choices {
        debug!(
            "choice finished with reason {} ({} tool calls)",
            choice.finish_reason,
            choice.message.tool_calls.len()
        );
        for tool_call in &choice.message.tool_calls {
            let arguments: Value = serde_json::from_str(&tool_call.function.arguments)
                .unwrap_or_else(|e| {
                    debug!("Undecodable tool arguments: {}", e);
                    Value::Object(serde_json::Map::new())
                });
            edges.push(Edge::tool_call(
                &response.model,
                APP_NODE_ID,
                arguments.clone(),
                Some(tool_call.function.name.clone()),
            ));
            edges.push(Edge::tool_call(
                APP_NODE_ID,
                &tool_call.function.name,
                arguments,
                Some(tool_call.function.name.clone()),
            ));
        }
        if let Some(content) = &choice.message.content {
            ctx.process_pii(content);
            edges.push(
                Edge::model_generate(&response.model, APP_NODE_ID, content)
                    .with_violation(ctx.drain_violations()),
            );
        }
    }
    Some((Vec::new(), edges))
}
