//! Event Sink
//!
//! Best-effort delivery of session events to the persistence collaborator:
//! - Non-blocking forwarder in front of any sink
//! - MQTT publishing of JSON event envelopes
//! - Bounded in-memory event log
//! - One-shot hand-off of the session recording

mod forwarder;
mod memory;
mod mqtt;
mod recording;
mod sink;

pub use forwarder::{ForwarderStats, ForwarderTask, SinkForwarder};
pub use memory::MemorySink;
pub use mqtt::{EventEnvelope, MqttConfig, MqttSink};
pub use recording::{hand_off_once, LocalRecordingStore, RecordingHandoff};
pub use sink::{EventSink, LogSink};

use thiserror::Error;

/// Sink error types
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
