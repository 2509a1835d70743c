//! Fire-and-forget forwarding in front of a sink

use integrity::{Event, EventOutlet};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::sink::EventSink;

/// Delivery totals reported when the forwarder drains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Cloneable submit handle; never blocks the caller
#[derive(Debug, Clone)]
pub struct SinkForwarder {
    tx: UnboundedSender<Event>,
}

/// Background task draining the queue into the sink
#[derive(Debug)]
pub struct ForwarderTask {
    handle: JoinHandle<ForwarderStats>,
}

impl SinkForwarder {
    /// Spawn the delivery task on the current runtime
    ///
    /// Failed publishes are logged and counted, never retried.
    pub fn spawn<S: EventSink>(mut sink: S) -> (Self, ForwarderTask) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let name = sink.name();

        let handle = tokio::spawn(async move {
            let mut stats = ForwarderStats::default();
            while let Some(event) = rx.recv().await {
                match sink.publish(&event).await {
                    Ok(()) => {
                        stats.delivered += 1;
                        debug!("Forwarded {} to {}", event.kind(), name);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        warn!("Sink {} rejected {}: {}", name, event.kind(), e);
                        metrics::counter!("integrity_sink_failures_total", "sink" => name).increment(1);
                    }
                }
            }
            info!(
                "Sink {} drained: {} delivered, {} failed",
                name, stats.delivered, stats.failed
            );
            stats
        });

        (Self { tx }, ForwarderTask { handle })
    }
}

impl EventOutlet for SinkForwarder {
    fn submit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("Sink forwarder stopped; event dropped");
        }
    }
}

impl ForwarderTask {
    /// Wait for every submitted event to be attempted
    ///
    /// Completes once all `SinkForwarder` handles have been dropped.
    pub async fn finish(self) -> ForwarderStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Sink forwarder task failed: {}", e);
                ForwarderStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use crate::SinkError;
    use chrono::{DateTime, Utc};
    use integrity::{EventDetail, EventKind};
    use std::time::Duration;

    fn event(count: usize) -> Event {
        Event::new(
            DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
            EventDetail::MultipleFaces { count },
        )
    }

    /// Rejects every other event
    struct FlakySink {
        calls: u64,
    }

    impl EventSink for FlakySink {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn publish(&mut self, _event: &Event) -> Result<(), SinkError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Err(SinkError::Connection("broker unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    /// Takes a long time per event
    struct SlowSink;

    impl EventSink for SlowSink {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn publish(&mut self, _event: &Event) -> Result<(), SinkError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let sink = MemorySink::new(100);
        let (forwarder, task) = SinkForwarder::spawn(sink.clone());
        for i in 2..6 {
            forwarder.submit(event(i));
        }
        drop(forwarder);

        let stats = task.finish().await;
        assert_eq!(stats, ForwarderStats { delivered: 4, failed: 0 });
        let counts: Vec<_> = sink
            .events(10)
            .unwrap()
            .into_iter()
            .rev()
            .map(|e| match e.detail {
                EventDetail::MultipleFaces { count } => count,
                _ => 0,
            })
            .collect();
        assert_eq!(counts, vec![2, 3, 4, 5]);
        assert_eq!(sink.by_kind(EventKind::MultipleFaces, 10).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_retried() {
        let (forwarder, task) = SinkForwarder::spawn(FlakySink { calls: 0 });
        for i in 0..6 {
            forwarder.submit(event(i));
        }
        drop(forwarder);
        assert_eq!(task.finish().await, ForwarderStats { delivered: 3, failed: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_never_waits_on_sink() {
        let (forwarder, _task) = SinkForwarder::spawn(SlowSink);
        let started = tokio::time::Instant::now();
        for i in 0..100 {
            forwarder.submit(event(i));
        }
        assert!(started.elapsed() < Duration::from_millis(1));
    }
}
