pub mod client;
pub mod transport;

pub use client::{TelemetryClient, TelemetryOptions};
pub use transport::{Batch, BatchTransport, HttpTransport};

/// 一条结构化消息
pub type Message = serde_json::Map<String, serde_json::Value>;
