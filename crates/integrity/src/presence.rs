//! Presence and gaze state tracking

use chrono::{DateTime, TimeDelta, Utc};
use perception::BoxEncoding;
use tracing::{debug, warn};

use crate::config::IntegrityConfig;
use crate::event::EventDetail;

/// Hysteresis timer for one condition
///
/// `since` is set when the condition starts holding. Once the condition has
/// held longer than the threshold the timer fires and `since` is pushed to
/// `now + cooldown`, so the next firing needs `threshold + cooldown` more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionTimer {
    since: Option<DateTime<Utc>>,
}

impl ConditionTimer {
    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn is_running(&self) -> bool {
        self.since.is_some()
    }

    /// Condition no longer holds
    pub fn clear(&mut self) {
        self.since = None;
    }

    /// Condition holds at `now`; returns the elapsed milliseconds when it fires
    pub fn observe(
        &mut self,
        now: DateTime<Utc>,
        threshold: TimeDelta,
        cooldown: TimeDelta,
    ) -> Option<u64> {
        match self.since {
            None => {
                self.since = Some(now);
                None
            }
            Some(since) => {
                let elapsed = now - since;
                if elapsed > threshold {
                    self.since = Some(
                        now.checked_add_signed(cooldown)
                            .unwrap_or(DateTime::<Utc>::MAX_UTC),
                    );
                    Some(elapsed.num_milliseconds().max(0) as u64)
                } else {
                    None
                }
            }
        }
    }
}

/// Condition timers owned by the presence tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    pub no_face: ConditionTimer,
    pub looking_away: ConditionTimer,
}

/// Converts per-tick face sets into `no_face`, `multiple_faces` and
/// `looking_away` events
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    timers: TimerState,
    no_face_threshold: TimeDelta,
    looking_away_threshold: TimeDelta,
    cooldown: TimeDelta,
    gaze_deviation_ratio: f32,
}

impl PresenceTracker {
    pub fn new(config: &IntegrityConfig) -> Self {
        Self {
            timers: TimerState::default(),
            no_face_threshold: millis(config.no_face_threshold_ms),
            looking_away_threshold: millis(config.looking_away_threshold_ms),
            cooldown: millis(config.hysteresis_cooldown_ms),
            gaze_deviation_ratio: config.gaze_deviation_ratio,
        }
    }

    pub fn timers(&self) -> &TimerState {
        &self.timers
    }

    /// Process one tick's raw face set
    ///
    /// Presence and multi-face checks use the raw entry count; boxes that fail
    /// to normalize are left out of the gaze check only.
    pub fn observe(
        &mut self,
        faces: &[BoxEncoding],
        frame_width: u32,
        frame_height: u32,
        now: DateTime<Utc>,
    ) -> Vec<EventDetail> {
        let mut events = Vec::new();

        if faces.is_empty() {
            if let Some(duration_ms) =
                self.timers
                    .no_face
                    .observe(now, self.no_face_threshold, self.cooldown)
            {
                debug!("Face absent for {} ms", duration_ms);
                events.push(EventDetail::NoFace { duration_ms });
            }
            self.timers.looking_away.clear();
            return events;
        }

        self.timers.no_face.clear();

        if faces.len() > 1 {
            events.push(EventDetail::MultipleFaces { count: faces.len() });
        }

        let center_x = frame_width as f32 / 2.0;
        let center_y = frame_height as f32 / 2.0;
        let max_deviation = frame_width as f32 * self.gaze_deviation_ratio;

        for encoding in faces {
            let face = match encoding.normalize() {
                Ok(face) => face,
                Err(e) => {
                    warn!("Skipping face box: {}", e);
                    metrics::counter!("integrity_detections_skipped_total", "source" => "face")
                        .increment(1);
                    continue;
                }
            };

            let (fx, fy) = face.center();
            let deviation = (fx - center_x).hypot(fy - center_y);

            if deviation > max_deviation {
                if let Some(duration_ms) = self.timers.looking_away.observe(
                    now,
                    self.looking_away_threshold,
                    self.cooldown,
                ) {
                    debug!("Gaze deviated for {} ms", duration_ms);
                    events.push(EventDetail::LookingAway { duration_ms });
                }
            } else {
                self.timers.looking_away.clear();
            }
        }

        events
    }
}

fn millis(ms: u64) -> TimeDelta {
    TimeDelta::milliseconds(ms.min(i64::MAX as u64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perception::FaceBox;

    const W: u32 = 640;
    const H: u32 = 480;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn centered() -> BoxEncoding {
        FaceBox::new(270.0, 190.0, 100.0, 100.0).unwrap().into()
    }

    fn far_left() -> BoxEncoding {
        FaceBox::new(0.0, 190.0, 100.0, 100.0).unwrap().into()
    }

    fn tracker() -> PresenceTracker {
        PresenceTracker::new(&IntegrityConfig::default())
    }

    fn no_face_count(events: &[EventDetail]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, EventDetail::NoFace { .. }))
            .count()
    }

    #[test]
    fn test_timer_fires_once_then_cools_down() {
        let mut timer = ConditionTimer::default();
        let threshold = TimeDelta::milliseconds(100);
        let cooldown = TimeDelta::milliseconds(50);

        assert_eq!(timer.observe(at(0), threshold, cooldown), None);
        assert_eq!(timer.observe(at(100), threshold, cooldown), None);
        assert_eq!(timer.observe(at(101), threshold, cooldown), Some(101));
        assert_eq!(timer.since(), Some(at(151)));
        // Next fire needs threshold past the pushed-forward instant
        assert_eq!(timer.observe(at(251), threshold, cooldown), None);
        assert_eq!(timer.observe(at(252), threshold, cooldown), Some(101));
    }

    #[test]
    fn test_no_face_sustained_emits_once() {
        let mut tracker = tracker();
        let mut events = Vec::new();
        for t in (0..=10_600).step_by(500) {
            events.extend(tracker.observe(&[], W, H, at(t)));
        }
        assert_eq!(no_face_count(&events), 1);
        assert_eq!(events[0], EventDetail::NoFace { duration_ms: 10_500 });
    }

    #[test]
    fn test_no_face_exact_threshold_does_not_fire() {
        let mut tracker = tracker();
        assert!(tracker.observe(&[], W, H, at(0)).is_empty());
        assert!(tracker.observe(&[], W, H, at(10_000)).is_empty());
        assert_eq!(no_face_count(&tracker.observe(&[], W, H, at(10_001))), 1);
    }

    #[test]
    fn test_face_returns_before_threshold() {
        let mut tracker = tracker();
        assert!(tracker.observe(&[], W, H, at(0)).is_empty());
        assert!(tracker.observe(&[centered()], W, H, at(9_999)).is_empty());
        assert!(!tracker.timers().no_face.is_running());
        // Absence restarts from scratch
        assert!(tracker.observe(&[], W, H, at(10_500)).is_empty());
        assert!(tracker.observe(&[], W, H, at(20_000)).is_empty());
    }

    #[test]
    fn test_sustained_absence_refires_after_threshold_plus_cooldown() {
        let mut tracker = tracker();
        let mut fired_at = Vec::new();
        for t in (0..=32_000).step_by(500) {
            if no_face_count(&tracker.observe(&[], W, H, at(t))) > 0 {
                fired_at.push(t);
            }
        }
        assert_eq!(fired_at, vec![10_500, 22_000]);
    }

    #[test]
    fn test_multiple_faces_every_tick() {
        let mut tracker = tracker();
        let faces = [centered(), centered(), centered()];
        for t in [0, 500, 1_000] {
            let events = tracker.observe(&faces, W, H, at(t));
            assert_eq!(events, vec![EventDetail::MultipleFaces { count: 3 }]);
        }
    }

    #[test]
    fn test_looking_away_hysteresis() {
        let mut tracker = tracker();
        let mut events = Vec::new();
        for t in (0..=5_500).step_by(500) {
            events.extend(tracker.observe(&[far_left()], W, H, at(t)));
        }
        assert_eq!(events, vec![EventDetail::LookingAway { duration_ms: 5_500 }]);

        // Looking back clears the timer
        tracker.observe(&[centered()], W, H, at(6_000));
        assert!(!tracker.timers().looking_away.is_running());
    }

    #[test]
    fn test_absence_clears_gaze_timer() {
        let mut tracker = tracker();
        tracker.observe(&[far_left()], W, H, at(0));
        assert!(tracker.timers().looking_away.is_running());
        tracker.observe(&[], W, H, at(500));
        assert!(!tracker.timers().looking_away.is_running());
    }

    #[test]
    fn test_malformed_box_counts_toward_presence() {
        let mut tracker = tracker();
        let malformed = BoxEncoding::Array(vec![1.0]);
        tracker.observe(&[], W, H, at(0));

        let events = tracker.observe(&[malformed.clone(), centered()], W, H, at(500));
        assert_eq!(events, vec![EventDetail::MultipleFaces { count: 2 }]);
        assert!(!tracker.timers().no_face.is_running());

        // A lone malformed box still means a face is present
        assert!(tracker.observe(&[malformed], W, H, at(20_000)).is_empty());
    }

    #[test]
    fn test_gaze_deviation_boundary_is_strict() {
        // 0.18 * 50 = 9 px allowed from the center of a 50x50 frame
        let on_limit: BoxEncoding = FaceBox::new(33.0, 24.0, 2.0, 2.0).unwrap().into();
        let past_limit: BoxEncoding = FaceBox::new(33.5, 24.0, 2.0, 2.0).unwrap().into();

        let mut tracker = tracker();
        tracker.observe(&[on_limit.clone()], 50, 50, at(0));
        assert!(!tracker.timers().looking_away.is_running());
        assert!(tracker.observe(&[on_limit], 50, 50, at(6_000)).is_empty());

        tracker.observe(&[past_limit], 50, 50, at(6_500));
        assert!(tracker.timers().looking_away.is_running());
    }
}
