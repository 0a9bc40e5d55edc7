//! Wire-format extractor registry.
//!
//! Every supported format registers a try-extract function that validates
//! the payload against its schema and, on success, produces graph structure.
//! Dispatch walks the table in fixed order and accepts the first match.

use serde_json::Value;
use tracing::{debug, warn};

use audient_graph::GraphStructure;

use crate::context::ExtractContext;
use crate::{anthropic, jsonrpc, ollama, openai};

/// Discriminator for the supported wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    AnthropicRequest,
    AnthropicResponse,
    McpJsonrpcRequest,
    McpJsonrpcResponse,
    OllamaGenerateRequest,
    OllamaGenerateResponse,
    OllamaChatRequest,
    OllamaChatResponse,
    OpenAiRequest,
    OpenAiResponse,
}

type TryExtract = fn(&Value, &mut ExtractContext) -> Option<GraphStructure>;

/// Registered formats in enumeration order. Order matters only for payloads
/// that would validate against more than one schema; required fields keep
/// the schemas mutually exclusive in practice.
const REGISTRY: &[(WireFormat, TryExtract)] = &[
    (WireFormat::AnthropicRequest, anthropic::try_request),
    (WireFormat::AnthropicResponse, anthropic::try_response),
    (WireFormat::McpJsonrpcRequest, jsonrpc::try_request),
    (WireFormat::McpJsonrpcResponse, jsonrpc::try_response),
    (WireFormat::OllamaGenerateRequest, ollama::try_generate_request),
    (WireFormat::OllamaGenerateResponse, ollama::try_generate_response),
    (WireFormat::OllamaChatRequest, ollama::try_chat_request),
    (WireFormat::OllamaChatResponse, ollama::try_chat_response),
    (WireFormat::OpenAiRequest, openai::try_request),
    (WireFormat::OpenAiResponse, openai::try_response),
];

/// Try every registered schema against a normalized JSON body.
///
/// Returns the matched format and its extraction, or `None` when no schema
/// validates (logged as unrecognized; not an error).
pub fn dispatch(value: &Value, ctx: &mut ExtractContext) -> Option<(WireFormat, GraphStructure)> {
    for (format, try_extract) in REGISTRY {
        if let Some(structure) = try_extract(value, ctx) {
            debug!("Payload matched {:?}", format);
            return Some((*format, structure));
        }
    }
    warn!("Unrecognized payload; no registered schema validated");
    None
}
