//! Audient audit engine
//!
//! The audit worker's event processor, the supervisor-side client handle and
//! the webhook notification boundary.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod webhooks;

pub use client::AuditClient;
pub use config::AuditConfig;
pub use error::AuditError;
pub use processor::EventProcessor;
pub use webhooks::{NotificationSink, SinkRegistry, Webhook, WebhookEvent, WebhookEventType, WebhookSink};
