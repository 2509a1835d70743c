//! Sink contract

use std::future::Future;

use integrity::Event;
use tracing::info;

use crate::SinkError;

/// Destination for forwarded events
///
/// Called from the forwarder's background task, never from the tick loop.
pub trait EventSink: Send + 'static {
    fn name(&self) -> &'static str;

    fn publish(&mut self, event: &Event) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Sink that writes each event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&mut self, event: &Event) -> Result<(), SinkError> {
        let detail = serde_json::to_string(&event.detail)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        info!(target: "session_events", "{} {}", event.timestamp.to_rfc3339(), detail);
        Ok(())
    }
}
