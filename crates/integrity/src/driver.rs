//! Tick driver: one perception pass, fully awaited, per frame

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use perception::{FaceModel, FrameSource, ObjectModel, PerceptionError, VideoFrame};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::IntegrityConfig;
use crate::engine::IntegrityEngine;
use crate::event::Event;
use crate::report::Report;
use crate::status::DetectionStatus;
use crate::IntegrityError;

/// Non-blocking destination for committed events
///
/// Implementations must return immediately; delivery is best effort.
pub trait EventOutlet {
    fn submit(&self, event: Event);
}

impl EventOutlet for UnboundedSender<Event> {
    fn submit(&self, event: Event) {
        if self.send(event).is_err() {
            warn!("Event outlet closed; event dropped");
        }
    }
}

/// Outlet that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardOutlet;

impl EventOutlet for DiscardOutlet {
    fn submit(&self, _event: Event) {}
}

/// Cloneable "session active" flag checked at the top of every tick
///
/// One flag lives as long as its driver, so a handle taken before `start`
/// still controls every later session.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn activate(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Request the session to stop; later ticks become no-ops
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives a single live session from a frame stream
pub struct SessionDriver<F, O> {
    config: IntegrityConfig,
    face_model: Option<F>,
    object_model: Option<O>,
    outlet: Box<dyn EventOutlet + Send>,
    engine: Option<IntegrityEngine>,
    stop: StopHandle,
    ticks: u64,
    last_seen: Option<DateTime<Utc>>,
}

impl<F: FaceModel, O: ObjectModel> SessionDriver<F, O> {
    /// Models that failed to initialize disable their checks instead of
    /// failing the session
    pub fn new(
        config: IntegrityConfig,
        face_model: Result<F, PerceptionError>,
        object_model: Result<O, PerceptionError>,
        outlet: impl EventOutlet + Send + 'static,
    ) -> Self {
        let face_model = face_model
            .map_err(|e| warn!("Face model unavailable, presence checks disabled: {}", e))
            .ok();
        let object_model = object_model
            .map_err(|e| warn!("Object model unavailable, object checks disabled: {}", e))
            .ok();

        let status = DetectionStatus::from_availability(face_model.is_some(), object_model.is_some());
        if status == DetectionStatus::Disabled {
            error!("No detectors available; detection disabled, session will still be recorded");
        }

        Self {
            config,
            face_model,
            object_model,
            outlet: Box::new(outlet),
            engine: None,
            stop: StopHandle::new(),
            ticks: 0,
            last_seen: None,
        }
    }

    pub fn status(&self) -> DetectionStatus {
        DetectionStatus::from_availability(self.face_model.is_some(), self.object_model.is_some())
    }

    /// Handle for stopping the current session from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_active() && self.engine.as_ref().is_some_and(|e| e.is_active())
    }

    pub fn engine(&self) -> Option<&IntegrityEngine> {
        self.engine.as_ref()
    }

    /// Start a new session; fails while another is live
    pub fn start(&mut self, candidate: impl Into<String>, now: DateTime<Utc>) -> Result<Uuid, IntegrityError> {
        if self.engine.as_ref().is_some_and(|e| e.is_active()) {
            return Err(IntegrityError::SessionActive);
        }

        let (engine, start_event) = IntegrityEngine::start(self.config.clone(), candidate, now)?;
        let id = engine.session_id();
        if self.status().is_degraded() {
            warn!("Session {} running with degraded detection: {:?}", id, self.status());
        }

        self.engine = Some(engine);
        self.stop.activate();
        self.ticks = 0;
        self.last_seen = Some(now);
        self.outlet.submit(start_event);
        Ok(id)
    }

    /// Run one tick over `frame`; returns the events it committed
    pub async fn tick(&mut self, frame: &VideoFrame) -> Vec<Event> {
        if !self.is_active() {
            return Vec::new();
        }

        let now = frame.captured_at();
        let run_objects = self.ticks % self.config.object_every_n_ticks.max(1) == 0;
        self.ticks += 1;
        self.last_seen = Some(now);

        let faces = match self.face_model.as_mut() {
            Some(model) => match model.detect(frame).await {
                Ok(faces) => Some(faces),
                Err(e) => {
                    warn!("Face model failed on frame {}: {}", frame.sequence(), e);
                    None
                }
            },
            None => None,
        };

        let detections = match self.object_model.as_mut() {
            Some(model) if run_objects => match model.detect(frame).await {
                Ok(detections) => Some(detections),
                Err(e) => {
                    warn!("Object model failed on frame {}: {}", frame.sequence(), e);
                    None
                }
            },
            _ => None,
        };

        // A stop may have landed while the models were running
        if !self.stop.is_active() {
            return Vec::new();
        }
        let Some(engine) = self.engine.as_mut() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if let Some(faces) = faces {
            events.extend(engine.observe_faces(&faces, frame.width(), frame.height(), now));
        }
        if let Some(detections) = detections {
            events.extend(engine.observe_objects(&detections, Some(frame), now));
        }

        for event in &events {
            self.outlet.submit(event.clone());
        }
        events
    }

    /// Stop the session and forward its `session_report`
    ///
    /// Idempotent: returns the report only on the first call.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Report> {
        self.stop.stop();
        let status = self.status();
        let report = self.engine.as_mut()?.stop(now, status)?;
        self.outlet.submit(report.summary_event());
        Some(report)
    }

    /// Tick until the source ends or a stop is requested, then stop
    ///
    /// A stop requested before `run` freezes the session without ticking.
    pub async fn run<S: FrameSource>(&mut self, source: &mut S) -> Result<Option<Report>, IntegrityError> {
        if !self.engine.as_ref().is_some_and(|e| e.is_active()) {
            return Err(IntegrityError::SessionNotActive);
        }

        while self.stop.is_active() {
            match source.next_frame().await {
                Ok(Some(frame)) => {
                    self.tick(&frame).await;
                }
                Ok(None) => {
                    info!("Frame source ended after {} ticks", self.ticks);
                    break;
                }
                Err(e) => {
                    warn!("Skipping unreadable frame: {}", e);
                }
            }
        }

        let now = self.last_seen.unwrap_or_else(Utc::now);
        Ok(self.stop(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use perception::{BoxEncoding, FaceBox, RawDetection, Scripted};
    use tokio::sync::mpsc;

    type Driver = SessionDriver<Scripted<BoxEncoding>, Scripted<RawDetection>>;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn frame(sequence: u64) -> VideoFrame {
        VideoFrame::blank(640, 480, at(sequence as i64 * 500), sequence)
    }

    fn face() -> BoxEncoding {
        FaceBox::new(270.0, 190.0, 100.0, 100.0).unwrap().into()
    }

    fn phone() -> RawDetection {
        RawDetection::new("cell phone", 0.9, FaceBox::new(0.0, 0.0, 20.0, 20.0).unwrap())
    }

    #[tokio::test]
    async fn test_start_forwards_session_start() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut driver = Driver::new(IntegrityConfig::default(), Ok(Scripted::new()), Ok(Scripted::new()), tx);

        driver.start("alice", at(0)).unwrap();
        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::SessionStart);
        assert!(matches!(driver.start("bob", at(10)), Err(IntegrityError::SessionActive)));
    }

    #[tokio::test]
    async fn test_object_model_runs_every_other_tick() {
        let mut objects = Scripted::new();
        for seq in 0..4 {
            objects.insert(seq, vec![]);
        }
        let mut driver = Driver::new(IntegrityConfig::default(), Ok(Scripted::new()), Ok(objects), DiscardOutlet);
        driver.start("alice", at(0)).unwrap();

        for seq in 0..4 {
            driver.tick(&frame(seq)).await;
        }
        assert_eq!(driver.face_model.as_ref().unwrap().calls(), 4);
        assert_eq!(driver.object_model.as_ref().unwrap().calls(), 2);
    }

    #[tokio::test]
    async fn test_events_forwarded_in_tick_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut faces = Scripted::new();
        faces.insert(0, vec![face(), face()]);
        let mut objects = Scripted::new();
        objects.insert(0, vec![phone()]);

        let mut driver = Driver::new(IntegrityConfig::default(), Ok(faces), Ok(objects), tx);
        driver.start("alice", at(0)).unwrap();
        let events = driver.tick(&frame(0)).await;

        assert_eq!(events.len(), 2);
        let forwarded: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind()).collect();
        assert_eq!(
            forwarded,
            vec![EventKind::SessionStart, EventKind::MultipleFaces, EventKind::ObjectDetected]
        );
    }

    #[tokio::test]
    async fn test_face_model_failure_skips_presence_only() {
        let mut faces = Scripted::new();
        faces.fail(0, "timeout");
        let mut objects = Scripted::new();
        objects.insert(0, vec![phone()]);

        let mut driver = Driver::new(IntegrityConfig::default(), Ok(faces), Ok(objects), DiscardOutlet);
        driver.start("alice", at(0)).unwrap();
        let events = driver.tick(&frame(0)).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::ObjectDetected);
        assert!(!driver.engine().unwrap().timers().no_face.is_running());
    }

    #[tokio::test]
    async fn test_degraded_without_detectors() {
        let mut driver = Driver::new(
            IntegrityConfig::default(),
            Err(PerceptionError::ModelUnavailable("no weights".into())),
            Err(PerceptionError::ModelUnavailable("no weights".into())),
            DiscardOutlet,
        );
        assert_eq!(driver.status(), DetectionStatus::Disabled);

        driver.start("alice", at(0)).unwrap();
        for seq in 0..40 {
            assert!(driver.tick(&frame(seq)).await.is_empty());
        }
        let report = driver.stop(at(20_000)).unwrap();
        assert_eq!(report.detection_status, DetectionStatus::Disabled);
        assert_eq!(report.integrity_score, 100);
    }

    #[tokio::test]
    async fn test_stop_handle_makes_ticks_noops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut faces = Scripted::new();
        faces.insert(1, vec![face(), face()]);
        let mut driver = Driver::new(IntegrityConfig::default(), Ok(faces), Ok(Scripted::new()), tx);
        driver.start("alice", at(0)).unwrap();

        driver.stop_handle().stop();
        assert!(driver.tick(&frame(1)).await.is_empty());
        assert_eq!(driver.engine().unwrap().counts().get(EventKind::MultipleFaces), 0);

        let report = driver.stop(at(1_000)).unwrap();
        assert!(driver.stop(at(2_000)).is_none());

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::SessionStart, EventKind::SessionReport]);
        assert_eq!(report.count(EventKind::SessionReport), 0);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let mut driver = Driver::new(IntegrityConfig::default(), Ok(Scripted::new()), Ok(Scripted::new()), DiscardOutlet);
        let first = driver.start("alice", at(0)).unwrap();
        driver.stop(at(1_000));
        let second = driver.start("bob", at(2_000)).unwrap();
        assert_ne!(first, second);
        assert!(driver.is_active());
    }

    #[tokio::test]
    async fn test_handle_taken_before_start_stops_session() {
        let mut faces = Scripted::new();
        faces.insert(0, vec![face(), face()]);
        let mut driver = Driver::new(IntegrityConfig::default(), Ok(faces), Ok(Scripted::new()), DiscardOutlet);
        let handle = driver.stop_handle();
        assert!(!handle.is_active());

        driver.start("alice", at(0)).unwrap();
        assert!(handle.is_active());

        handle.stop();
        assert!(!driver.is_active());
        assert!(driver.tick(&frame(0)).await.is_empty());
        assert_eq!(driver.engine().unwrap().counts().get(EventKind::MultipleFaces), 0);
    }

    #[tokio::test]
    async fn test_run_after_stop_request_freezes_session() {
        let mut faces = Scripted::new();
        faces.insert(0, vec![face(), face()]);
        let mut driver = Driver::new(IntegrityConfig::default(), Ok(faces), Ok(Scripted::new()), DiscardOutlet);
        driver.start("alice", at(0)).unwrap();
        driver.stop_handle().stop();

        let mut source = Frames(0..3);
        let report = driver.run(&mut source).await.unwrap().unwrap();
        assert_eq!(report.count(EventKind::MultipleFaces), 0);
        assert_eq!(source.0.start, 0);
        assert!(!driver.engine().unwrap().is_active());

        // Frozen session no longer blocks a new one
        driver.start("bob", at(5_000)).unwrap();
        assert!(driver.is_active());
        assert!(matches!(
            Driver::new(IntegrityConfig::default(), Ok(Scripted::new()), Ok(Scripted::new()), DiscardOutlet)
                .run(&mut Frames(0..1))
                .await,
            Err(IntegrityError::SessionNotActive)
        ));
    }

    /// Blank frames for a range of sequence numbers
    struct Frames(std::ops::Range<u64>);

    impl FrameSource for Frames {
        async fn next_frame(&mut self) -> Result<Option<VideoFrame>, PerceptionError> {
            Ok(self.0.next().map(frame))
        }
    }
}
