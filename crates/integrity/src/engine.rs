//! Per-session integrity engine

use chrono::{DateTime, Utc};
use perception::{BoxEncoding, RawDetection, VideoFrame};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IntegrityConfig;
use crate::event::{Event, EventCounts, EventDetail};
use crate::objects::ObjectDebouncer;
use crate::presence::{PresenceTracker, TimerState};
use crate::report::Report;
use crate::score::integrity_score;
use crate::session::{RecentEvents, Session, SessionAggregator};
use crate::status::DetectionStatus;
use crate::IntegrityError;

/// Owns all state of one monitored session: condition timers, debounce
/// table, and the session record. Built on start, discarded after stop.
#[derive(Debug)]
pub struct IntegrityEngine {
    config: IntegrityConfig,
    presence: PresenceTracker,
    objects: ObjectDebouncer,
    aggregator: SessionAggregator,
    report: Option<Report>,
}

impl IntegrityEngine {
    /// Open a session; returns the engine and the recorded `session_start`
    pub fn start(
        config: IntegrityConfig,
        candidate: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(Self, Event), IntegrityError> {
        config.validate()?;

        let mut engine = Self {
            presence: PresenceTracker::new(&config),
            objects: ObjectDebouncer::new(&config),
            aggregator: SessionAggregator::start(candidate, config.recent_event_capacity, now),
            report: None,
            config,
        };

        let session = engine.aggregator.session();
        let start = EventDetail::SessionStart {
            session_id: session.id,
            candidate: session.name.clone(),
        };
        let mut events = engine.commit(vec![start], now);
        let start = events.pop().ok_or(IntegrityError::SessionNotActive)?;
        Ok((engine, start))
    }

    pub fn is_active(&self) -> bool {
        !self.aggregator.is_frozen()
    }

    pub fn session_id(&self) -> Uuid {
        self.aggregator.session().id
    }

    /// Feed one tick's face boxes
    pub fn observe_faces(
        &mut self,
        faces: &[BoxEncoding],
        frame_width: u32,
        frame_height: u32,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        if !self.is_active() {
            return Vec::new();
        }
        let details = self.presence.observe(faces, frame_width, frame_height, now);
        self.commit(details, now)
    }

    /// Feed one tick's object detections; `frame` enables the region heuristic
    pub fn observe_objects(
        &mut self,
        detections: &[RawDetection],
        frame: Option<&VideoFrame>,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        if !self.is_active() {
            return Vec::new();
        }
        let details = self.objects.observe(detections, frame, now);
        self.commit(details, now)
    }

    fn commit(&mut self, details: Vec<EventDetail>, now: DateTime<Utc>) -> Vec<Event> {
        let mut committed = Vec::with_capacity(details.len());
        for detail in details {
            let event = Event::new(now, detail);
            let kind = event.kind();
            if self.aggregator.record(event.clone()).is_ok() {
                debug!("Event {} at {}", kind, now);
                metrics::counter!("integrity_events_total", "kind" => kind.as_str()).increment(1);
                committed.push(event);
            }
        }
        committed
    }

    /// Freeze the session and build its report
    ///
    /// Idempotent: only the first call returns a report.
    pub fn stop(&mut self, now: DateTime<Utc>, status: DetectionStatus) -> Option<Report> {
        if !self.aggregator.freeze(now) {
            debug!("Stop ignored: session already stopped");
            return None;
        }

        let report = Report::build(
            &self.aggregator,
            &self.config.weights,
            self.config.report_event_limit,
            status,
        )
        .ok()?;

        info!(
            "Session {} score {} ({})",
            report.session_id, report.integrity_score, report.duration
        );
        metrics::gauge!("integrity_score").set(report.integrity_score as f64);

        self.report = Some(report.clone());
        Some(report)
    }

    /// Live score from the counters so far
    pub fn score(&self) -> u8 {
        integrity_score(self.aggregator.counts(), &self.config.weights)
    }

    pub fn session(&self) -> &Session {
        self.aggregator.session()
    }

    pub fn counts(&self) -> &EventCounts {
        self.aggregator.counts()
    }

    pub fn recent(&self) -> &RecentEvents {
        self.aggregator.recent()
    }

    pub fn timers(&self) -> &TimerState {
        self.presence.timers()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }
}
