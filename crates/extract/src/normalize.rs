//! HTTP body normalizers.
//!
//! Streamed and chunked bodies are collapsed into a single JSON document
//! before parsing. Each normalizer claims a set of content types; the
//! dispatcher picks the first claimant, else passes the body through.

use serde_json::Value;
use tracing::debug;

pub trait ContentNormalizer: Send + Sync {
    fn supported_content_types(&self) -> &[String];

    fn normalize(&self, content: &str) -> String;
}

/// Extracts the first `data: `-prefixed line from server-sent-event framing.
pub struct EventStreamNormalizer {
    event_data_tag: String,
    content_types: Vec<String>,
}

impl EventStreamNormalizer {
    pub fn new() -> Self {
        Self::with_tag("data: ")
    }

    pub fn with_tag(event_data_tag: &str) -> Self {
        Self {
            event_data_tag: event_data_tag.to_string(),
            content_types: vec!["text/event-stream".to_string()],
        }
    }
}

impl Default for EventStreamNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentNormalizer for EventStreamNormalizer {
    fn supported_content_types(&self) -> &[String] {
        &self.content_types
    }

    fn normalize(&self, content: &str) -> String {
        if !content.contains(&self.event_data_tag) {
            return content.to_string();
        }
        for line in content.lines() {
            if let Some(data) = line.strip_prefix(&self.event_data_tag) {
                return data.trim().to_string();
            }
        }
        content.to_string()
    }
}

/// Merges newline-delimited JSON objects into one document.
///
/// The string value at the anchor path is concatenated across objects in
/// arrival order; every other key takes the first object's value, with later
/// objects filling in keys that are still absent.
pub struct NdjsonNormalizer {
    anchor_path: Vec<String>,
    content_types: Vec<String>,
}

impl NdjsonNormalizer {
    pub fn new() -> Self {
        Self::with_anchor("message.content")
    }

    pub fn with_anchor(anchor_path: &str) -> Self {
        Self {
            anchor_path: anchor_path.split('.').map(|s| s.to_string()).collect(),
            content_types: vec!["application/x-ndjson".to_string()],
        }
    }

    fn extract_anchor(&self, value: &Value) -> Option<String> {
        let mut current = value;
        for key in &self.anchor_path {
            current = current.get(key)?;
        }
        current.as_str().map(|s| s.to_string())
    }

    fn set_anchor(&self, value: &mut Value, new_value: String) {
        let mut current = value;
        for key in &self.anchor_path[..self.anchor_path.len() - 1] {
            match current.get_mut(key) {
                Some(next) => current = next,
                None => return,
            }
        }
        if let Some(last) = self.anchor_path.last() {
            if let Some(obj) = current.as_object_mut() {
                if obj.contains_key(last) {
                    obj.insert(last.clone(), Value::String(new_value));
                }
            }
        }
    }
}

impl Default for NdjsonNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentNormalizer for NdjsonNormalizer {
    fn supported_content_types(&self) -> &[String] {
        &self.content_types
    }

    fn normalize(&self, content: &str) -> String {
        let mut objects: Vec<Value> = Vec::new();
        for line in content.split('\n') {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(value) => objects.push(value),
                Err(e) => debug!("Skipping unparsable ndjson line: {}", e),
            }
        }
        if objects.is_empty() {
            return "{}".to_string();
        }

        let mut merged = objects[0].clone();
        self.set_anchor(&mut merged, String::new());
        for obj in &objects {
            if let Some(chunk) = self.extract_anchor(obj) {
                let previous = self.extract_anchor(&merged).unwrap_or_default();
                self.set_anchor(&mut merged, previous + &chunk);
            }
            if let (Some(merged_map), Some(obj_map)) = (merged.as_object_mut(), obj.as_object()) {
                for (k, v) in obj_map {
                    if !merged_map.contains_key(k) {
                        merged_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        merged.to_string()
    }
}

/// The default normalizer chain with content-type dispatch.
pub struct NormalizerSet {
    normalizers: Vec<Box<dyn ContentNormalizer>>,
}

impl NormalizerSet {
    pub fn new() -> Self {
        Self {
            normalizers: vec![
                Box::new(EventStreamNormalizer::new()),
                Box::new(NdjsonNormalizer::new()),
            ],
        }
    }

    /// Normalize `body` according to its content-type header; bodies with no
    /// claiming normalizer pass through unchanged.
    pub fn normalize(&self, content_type: Option<&str>, body: &str) -> String {
        let media_type = content_type
            .map(|c| c.split(';').next().unwrap_or(c).trim().to_lowercase())
            .unwrap_or_default();
        for normalizer in &self.normalizers {
            if normalizer
                .supported_content_types()
                .iter()
                .any(|t| t == &media_type)
            {
                return normalizer.normalize(body);
            }
        }
        body.to_string()
    }
}

impl Default for NormalizerSet {
    fn default() -> Self {
        Self::new()
    }
}
