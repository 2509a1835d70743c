//! Session record and event aggregation

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::event::{Event, EventCounts};
use crate::IntegrityError;

/// Bounded buffer of recent events, most recent first
#[derive(Debug, Clone)]
pub struct RecentEvents {
    data: VecDeque<Event>,
    capacity: usize,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Push an event, dropping the oldest when full
    pub fn push(&mut self, event: Event) {
        if self.data.len() >= self.capacity {
            self.data.pop_back();
        }
        self.data.push_front(event);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate most recent first
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.data.iter()
    }

    /// Read the last N events (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<Event> {
        self.data.iter().take(count).cloned().collect()
    }
}

/// Monitored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Candidate name
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub counts: EventCounts,
}

impl Session {
    pub fn is_frozen(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Sole owner and mutator of the live session
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    session: Session,
    recent: RecentEvents,
}

impl SessionAggregator {
    /// Open a fresh session with zeroed counters
    pub fn start(name: impl Into<String>, recent_capacity: usize, now: DateTime<Utc>) -> Self {
        let session = Session {
            id: Uuid::new_v4(),
            name: name.into(),
            started_at: now,
            ended_at: None,
            duration_ms: 0,
            counts: EventCounts::new(),
        };
        info!("Session {} started for '{}'", session.id, session.name);
        Self {
            session,
            recent: RecentEvents::new(recent_capacity),
        }
    }

    /// Append an event and bump its counter
    pub fn record(&mut self, event: Event) -> Result<(), IntegrityError> {
        if self.session.is_frozen() {
            return Err(IntegrityError::SessionNotActive);
        }
        self.session.counts.increment(event.kind());
        self.recent.push(event);
        Ok(())
    }

    /// Stamp the end time and freeze; returns false if already frozen
    pub fn freeze(&mut self, now: DateTime<Utc>) -> bool {
        if self.session.is_frozen() {
            return false;
        }
        let ended_at = now.max(self.session.started_at);
        self.session.ended_at = Some(ended_at);
        self.session.duration_ms = (ended_at - self.session.started_at)
            .num_milliseconds()
            .max(0) as u64;
        info!(
            "Session {} stopped after {} ms ({} events)",
            self.session.id,
            self.session.duration_ms,
            self.session.counts.total()
        );
        true
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn counts(&self) -> &EventCounts {
        &self.session.counts
    }

    pub fn recent(&self) -> &RecentEvents {
        &self.recent
    }

    pub fn is_frozen(&self) -> bool {
        self.session.is_frozen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventDetail, EventKind};

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn multi(count: usize, ms: i64) -> Event {
        Event::new(at(ms), EventDetail::MultipleFaces { count })
    }

    #[test]
    fn test_recent_events_most_recent_first() {
        let mut recent = RecentEvents::new(3);
        for i in 0..5 {
            recent.push(multi(i + 2, i as i64));
        }
        assert_eq!(recent.len(), 3);
        let last = recent.read_last(2);
        assert_eq!(last[0], multi(6, 4));
        assert_eq!(last[1], multi(5, 3));
    }

    #[test]
    fn test_record_increments_counter() {
        let mut aggregator = SessionAggregator::start("alice", 10, at(0));
        aggregator.record(multi(2, 100)).unwrap();
        aggregator.record(multi(3, 200)).unwrap();
        aggregator
            .record(Event::new(at(300), EventDetail::NoFace { duration_ms: 11_000 }))
            .unwrap();

        assert_eq!(aggregator.counts().get(EventKind::MultipleFaces), 2);
        assert_eq!(aggregator.counts().get(EventKind::NoFace), 1);
        assert_eq!(aggregator.recent().len(), 3);
    }

    #[test]
    fn test_freeze_is_final() {
        let mut aggregator = SessionAggregator::start("alice", 10, at(0));
        aggregator.record(multi(2, 100)).unwrap();

        assert!(aggregator.freeze(at(65_000)));
        assert_eq!(aggregator.session().duration_ms, 65_000);
        assert_eq!(aggregator.session().ended_at, Some(at(65_000)));

        assert!(!aggregator.freeze(at(90_000)));
        assert_eq!(aggregator.session().duration_ms, 65_000);

        assert!(matches!(
            aggregator.record(multi(2, 70_000)),
            Err(IntegrityError::SessionNotActive)
        ));
        assert_eq!(aggregator.counts().get(EventKind::MultipleFaces), 1);
    }

    #[test]
    fn test_freeze_before_start_clamps_duration() {
        let mut aggregator = SessionAggregator::start("bob", 10, at(1_000));
        aggregator.freeze(at(0));
        assert_eq!(aggregator.session().duration_ms, 0);
    }
}
