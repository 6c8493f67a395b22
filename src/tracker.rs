use std::collections::HashMap;

use log::debug;
use nalgebra as na;

use crate::circular_queue::CircularQueue;
use crate::config::{Config, HISTORY_CAPACITY, STILLNESS_WINDOW};
use crate::frame::TrackId;
use crate::keypoints::{Keypoints, Landmark};
use crate::math;

// absorbs drift from summing 1/fps steps
const TIMER_EPSILON: f64 = 1e-9;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    HeadDown,
    EyeClosed,
    Stillness,
}

/// A sustained behaviour together with how long it has held so far.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Behavior {
    pub kind: BehaviorKind,
    pub duration: f64,
}

/// Accumulates while a condition holds, drops to zero the first frame it does not.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DurationTimer {
    elapsed: f64,
}

impl DurationTimer {
    #[inline]
    pub fn advance(&mut self, held: bool, fps: f64) {
        if held {
            self.elapsed += 1.0 / fps;
        } else {
            self.elapsed = 0.0;
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[inline(always)]
    pub fn reached(&self, duration: f64) -> bool {
        self.elapsed > 0.0 && self.elapsed + TIMER_EPSILON >= duration
    }

    #[inline]
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

#[derive(Debug, Clone)]
pub struct TrackState {
    pub head_positions: CircularQueue<na::Point2<f32>>,
    pub eye_openness: CircularQueue<f32>,
    pub gaze_positions: CircularQueue<na::Point2<f32>>,
    pub head_down: DurationTimer,
    pub eye_closed: DurationTimer,
    pub stillness: DurationTimer,
    pub updates: u64,

    // stream time of the last observation, drives eviction
    pub last_seen: f64,
}

impl TrackState {
    pub fn new(now: f64) -> Self {
        Self {
            head_positions: CircularQueue::with_capacity(HISTORY_CAPACITY),
            eye_openness: CircularQueue::with_capacity(HISTORY_CAPACITY),
            gaze_positions: CircularQueue::with_capacity(HISTORY_CAPACITY),
            head_down: DurationTimer::default(),
            eye_closed: DurationTimer::default(),
            stillness: DurationTimer::default(),
            updates: 0,
            last_seen: now,
        }
    }

    fn record(&mut self, kps: &Keypoints) {
        if let Some(nose) = kps.observed(Landmark::Nose) {
            self.head_positions.push(nose);
        }

        if let Some(ear) = kps.eye_openness() {
            self.eye_openness.push(ear);
        }

        if let Some(gaze) = kps.eye_center() {
            self.gaze_positions.push(gaze);
        }

        self.updates += 1;
    }

    fn head_is_down(kps: &Keypoints, threshold: f32) -> bool {
        let (nose, left, right) = match (
            kps.observed(Landmark::Nose),
            kps.observed(Landmark::LeftShoulder),
            kps.observed(Landmark::RightShoulder),
        ) {
            (Some(n), Some(l), Some(r)) => (n, l, r),
            _ => return false,
        };

        let shoulder_center_y = (left.y + right.y) / 2.0;

        nose.y - shoulder_center_y > threshold
    }

    fn eyes_are_closed(kps: &Keypoints, threshold: f32) -> bool {
        matches!(kps.eye_openness(), Some(ear) if ear < threshold)
    }

    fn head_is_still(&self, kps: &Keypoints, threshold: f32) -> bool {
        // no fresh head sample this frame means stillness was not observed
        if kps.observed(Landmark::Nose).is_none() || self.head_positions.len() < STILLNESS_WINDOW {
            return false;
        }

        math::path_length(self.head_positions.recent(STILLNESS_WINDOW)) < threshold
    }

    fn check(&mut self, kps: &Keypoints, fps: f64, config: &Config) -> Vec<Behavior> {
        let mut behaviors = Vec::new();

        self.head_down
            .advance(Self::head_is_down(kps, config.head_down_threshold), fps);
        if self.head_down.reached(config.head_down_duration) {
            behaviors.push(Behavior {
                kind: BehaviorKind::HeadDown,
                duration: self.head_down.elapsed(),
            });
        }

        self.eye_closed
            .advance(Self::eyes_are_closed(kps, config.eye_closed_threshold), fps);
        if self.eye_closed.reached(config.eye_closed_duration) {
            behaviors.push(Behavior {
                kind: BehaviorKind::EyeClosed,
                duration: self.eye_closed.elapsed(),
            });
        }

        let still = self.head_is_still(kps, config.stillness_threshold);
        self.stillness.advance(still, fps);
        if self.stillness.reached(config.stillness_duration) {
            behaviors.push(Behavior {
                kind: BehaviorKind::Stillness,
                duration: self.stillness.elapsed(),
            });
        }

        behaviors
    }
}

/// Owns the rolling histories and behaviour timers of every live track.
///
/// State is created on first sight and dropped once a track has been silent
/// for longer than `max_age` seconds of stream time.
#[derive(Debug)]
pub struct StateTracker {
    states: HashMap<TrackId, TrackState>,
    now: f64,
    max_age: f64,
}

impl StateTracker {
    pub fn new(max_age: f64) -> Self {
        Self {
            states: HashMap::new(),
            now: 0.0,
            max_age,
        }
    }

    pub fn with_config(config: &Config) -> Self {
        Self::new(config.track_max_age_secs)
    }

    /// Moves the stream clock forward and evicts tracks that went silent.
    /// Returns the number of evicted tracks.
    pub fn advance(&mut self, now: f64) -> usize {
        if now > self.now {
            self.now = now;
        }

        let (now, max_age) = (self.now, self.max_age);
        let before = self.states.len();

        self.states.retain(|id, state| {
            let keep = now - state.last_seen <= max_age;
            if !keep {
                debug!("evicting track {} (silent since {:.2}s)", id, state.last_seen);
            }

            keep
        });

        before - self.states.len()
    }

    fn state_mut(&mut self, track_id: TrackId) -> &mut TrackState {
        let now = self.now;
        let state = self
            .states
            .entry(track_id)
            .or_insert_with(|| TrackState::new(now));
        state.last_seen = now;

        state
    }

    /// Appends this observation to the track's histories. Signals whose
    /// landmarks are not visible are skipped rather than zero-filled.
    ///
    /// Returns the track-local time of this sample.
    pub fn update(&mut self, track_id: TrackId, kps: &Keypoints, fps: f64) -> f64 {
        let state = self.state_mut(track_id);
        state.record(kps);

        (state.updates - 1) as f64 / fps
    }

    /// Advances the three behaviour timers and reports every behaviour that
    /// has held for at least its configured duration.
    pub fn check_behaviors(
        &mut self,
        track_id: TrackId,
        kps: &Keypoints,
        fps: f64,
        config: &Config,
    ) -> Vec<Behavior> {
        self.state_mut(track_id).check(kps, fps, config)
    }

    #[inline]
    pub fn state(&self, track_id: TrackId) -> Option<&TrackState> {
        self.states.get(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::with_config(&Config::default())
    }
}
