//! MQTT event publishing

use std::time::Duration;

use chrono::{DateTime, Utc};
use integrity::Event;
use rumqttc::{AsyncClient, Event as MqttEvent, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::sink::EventSink;
use crate::SinkError;

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker host
    pub broker_url: String,
    /// MQTT port
    pub broker_port: u16,
    /// Exam station ID
    pub station_id: String,
    /// Topic root
    pub topic_prefix: String,
    /// Keep-alive interval (seconds)
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: "localhost".to_string(),
            broker_port: 1883,
            station_id: "unknown".to_string(),
            topic_prefix: "proctor".to_string(),
            keep_alive_secs: 30,
        }
    }
}

/// Wire message published per event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub message_type: String,
    pub station_id: String,
    pub published_at: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(station_id: &str, event: Event) -> Self {
        Self {
            message_type: "event".to_string(),
            station_id: station_id.to_string(),
            published_at: Utc::now(),
            event,
        }
    }
}

/// Publishes JSON envelopes to `{prefix}/{station_id}/events`
pub struct MqttSink {
    config: MqttConfig,
    client: Option<AsyncClient>,
}

impl MqttSink {
    pub fn new(config: MqttConfig) -> Self {
        Self { config, client: None }
    }

    /// Connect to the broker and drive its event loop in the background
    pub async fn connect(&mut self) -> Result<(), SinkError> {
        if self.config.broker_url.is_empty() {
            return Err(SinkError::Connection("Broker host is empty".to_string()));
        }

        let mut options = MqttOptions::new(
            format!("station-{}", self.config.station_id),
            &self.config.broker_url,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(MqttEvent::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Err(e) => {
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        self.client = Some(client);
        info!(
            "Connected to MQTT broker: {}:{}",
            self.config.broker_url, self.config.broker_port
        );
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn topic(&self) -> String {
        format!("{}/{}/events", self.config.topic_prefix, self.config.station_id)
    }
}

impl EventSink for MqttSink {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn publish(&mut self, event: &Event) -> Result<(), SinkError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| SinkError::Connection("Not connected".to_string()))?;

        let message = EventEnvelope::new(&self.config.station_id, event.clone());
        let payload =
            serde_json::to_vec(&message).map_err(|e| SinkError::Serialization(e.to_string()))?;

        client
            .publish(self.topic(), QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| SinkError::Publish(e.to_string()))
    }
}
