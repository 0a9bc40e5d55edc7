//! Webhook notification sinks.
//!
//! Graph updates are pushed to registered sinks as two ordered payloads:
//! the node snapshot first, then the edge snapshot.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use audient_graph::GraphStructure;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventType {
    Nodes,
    Edges,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebhookEvent {
    pub event_type: WebhookEventType,
    pub data: Vec<serde_json::Value>,
}

/// A registered webhook destination.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Webhook {
    pub guid: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Webhook {
    pub fn create(url: &str) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
        }
    }
}

/// Receives graph deltas for downstream visualization.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &WebhookEvent);

    async fn close(&self) {}
}

/// HTTP sink posting events to one webhook.
pub struct WebhookSink {
    webhook: Webhook,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(webhook: Webhook) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { webhook, client }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &WebhookEvent) {
        let mut request = self
            .client
            .request(
                self.webhook.method.parse().unwrap_or(reqwest::Method::POST),
                &self.webhook.url,
            )
            .json(event);
        for (name, value) in &self.webhook.headers {
            request = request.header(name, value);
        }

        // Delivery failures never affect the audit loop.
        match request.send().await {
            Ok(response) => debug!("Webhook response: {}", response.status()),
            Err(e) => error!("Error sending webhook: {}", e),
        }
    }
}

/// Registry of active sinks.
pub struct SinkRegistry {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn register(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Push the node snapshot, then the edge snapshot, to every sink.
    pub async fn notify(&self, structure: &GraphStructure) {
        if self.sinks.is_empty() {
            return;
        }
        let (nodes, edges) = structure;
        let nodes_event = WebhookEvent {
            event_type: WebhookEventType::Nodes,
            data: nodes
                .iter()
                .filter_map(|n| serde_json::to_value(n).ok())
                .collect(),
        };
        let edges_event = WebhookEvent {
            event_type: WebhookEventType::Edges,
            data: edges
                .iter()
                .filter_map(|e| serde_json::to_value(e).ok())
                .collect(),
        };

        for sink in &self.sinks {
            sink.deliver(&nodes_event).await;
        }
        for sink in &self.sinks {
            sink.deliver(&edges_event).await;
        }
    }

    pub async fn close(&mut self) {
        for sink in &self.sinks {
            sink.close().await;
        }
        self.sinks.clear();
        debug!("Notification sinks closed");
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use audient_graph::{Edge, Node};
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        events: Arc<Mutex<Vec<WebhookEvent>>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, event: &WebhookEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_nodes_are_delivered_before_edges() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SinkRegistry::new();
        registry.register(Box::new(RecordingSink {
            events: events.clone(),
        }));

        let structure = (
            vec![Node::app(), Node::llm("claude-x")],
            vec![Edge::model_generate("app", "claude-x", "hi")],
        );
        registry.notify(&structure).await;

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, WebhookEventType::Nodes);
        assert_eq!(events[0].data.len(), 2);
        assert_eq!(events[1].event_type, WebhookEventType::Edges);
        assert_eq!(events[1].data.len(), 1);
    }

    #[tokio::test]
    async fn test_all_sinks_receive_each_event() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SinkRegistry::new();
        registry.register(Box::new(RecordingSink {
            events: first.clone(),
        }));
        registry.register(Box::new(RecordingSink {
            events: second.clone(),
        }));

        registry.notify(&(vec![Node::app()], vec![])).await;
        assert_eq!(first.lock().unwrap().len(), 2);
        assert_eq!(second.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_close_clears_registry() {
        let mut registry = SinkRegistry::new();
        registry.register(Box::new(RecordingSink {
            events: Arc::new(Mutex::new(Vec::new())),
        }));
        assert_eq!(registry.len(), 1);
        registry.close().await;
        assert!(registry.is_empty());
    }

    #[test]
    fn test_webhook_event_wire_format() {
        let event = WebhookEvent {
            event_type: WebhookEventType::Nodes,
            data: vec![],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], serde_json::json!("nodes"));
    }
}
