//! Audient payload extraction
//!
//! Turns heterogeneous LLM/MCP wire payloads into graph structure: content
//! normalization for chunked/streamed bodies, a PII-detection boundary, and
//! a fixed-order extractor registry dispatching by trial validation.

pub mod anthropic;
pub mod context;
pub mod detector;
pub mod jsonrpc;
pub mod normalize;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod registry;

pub use context::ExtractContext;
pub use detector::{PatternDetector, PiiAnnotation, PiiDetector};
pub use normalize::{ContentNormalizer, EventStreamNormalizer, NdjsonNormalizer, NormalizerSet};
pub use pipeline::{process_hook_event, ExtractError};
pub use registry::{dispatch, WireFormat};
