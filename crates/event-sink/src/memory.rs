//! In-memory event log

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use integrity::{Event, EventKind};
use tracing::info;

use crate::sink::EventSink;
use crate::SinkError;

/// Bounded event log; clones share the same storage
#[derive(Debug, Clone)]
pub struct MemorySink {
    log: Arc<Mutex<VecDeque<Event>>>,
    max_events: usize,
}

impl MemorySink {
    pub fn new(max_events: usize) -> Self {
        info!("Creating in-memory event log (max {} events)", max_events);
        Self {
            log: Arc::new(Mutex::new(VecDeque::new())),
            max_events: max_events.max(1),
        }
    }

    /// Insert an event, enforcing retention
    pub fn insert(&self, event: Event) -> Result<(), SinkError> {
        let mut log = self
            .log
            .lock()
            .map_err(|e| SinkError::Storage(format!("Lock error: {}", e)))?;

        while log.len() >= self.max_events {
            log.pop_front();
        }
        log.push_back(event);
        Ok(())
    }

    /// Most recent events first
    pub fn events(&self, limit: usize) -> Result<Vec<Event>, SinkError> {
        let log = self
            .log
            .lock()
            .map_err(|e| SinkError::Storage(format!("Lock error: {}", e)))?;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }

    /// Most recent events of one kind first
    pub fn by_kind(&self, kind: EventKind, limit: usize) -> Result<Vec<Event>, SinkError> {
        let log = self
            .log
            .lock()
            .map_err(|e| SinkError::Storage(format!("Lock error: {}", e)))?;
        Ok(log
            .iter()
            .rev()
            .filter(|e| e.kind() == kind)
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.log.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&mut self, event: &Event) -> Result<(), SinkError> {
        self.insert(event.clone())
    }
}
