use log::debug;
use serde_derive::Serialize;

use crate::bbox::BBox;
use crate::frame::TrackId;
use crate::reason::{self, Reason};
use crate::scorer::Assessment;

/// One low-attention observation. Never mutated after recording.
#[derive(Debug, Clone, PartialEq)]
pub struct InattentionEvent {
    pub track_id: TrackId,
    pub frame: u64,
    pub time_sec: f64,
    pub score: i32,
    pub reasons: Vec<Reason>,
    pub bbox: BBox,
}

impl InattentionEvent {
    /// Event time at the 2-decimal precision of the report rows.
    #[inline]
    pub fn rounded_time(&self) -> f64 {
        (self.time_sec * 100.0).round() / 100.0
    }

    pub fn row(&self) -> EventRow {
        EventRow {
            student_id: self.track_id,
            time_sec: self.rounded_time(),
            time_str: format_hms(self.time_sec),
            frame: self.frame,
            score: self.score,
            reason: reason::join(&self.reasons),
            bbox: self.bbox,
        }
    }
}

/// Flat, text-rendered form of an event for CSV/JSON sinks.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EventRow {
    pub student_id: TrackId,
    pub time_sec: f64,
    pub time_str: String,
    pub frame: u64,
    pub score: i32,
    pub reason: String,
    pub bbox: BBox,
}

/// Renders whole seconds as `H:MM:SS`; fractions are truncated.
pub fn format_hms(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    };

    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Appends an event for every assessment below the attention threshold.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    threshold: i32,
    events: Vec<InattentionEvent>,
}

impl EventRecorder {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold,
            events: Vec::new(),
        }
    }

    /// Returns whether an event was recorded.
    pub fn record(
        &mut self,
        track_id: TrackId,
        frame: u64,
        fps: f64,
        assessment: &Assessment,
        bbox: BBox,
    ) -> bool {
        if assessment.score >= self.threshold {
            return false;
        }

        let event = InattentionEvent {
            track_id,
            frame,
            time_sec: frame as f64 / fps,
            score: assessment.score,
            reasons: assessment.reasons.clone(),
            bbox,
        };

        debug!(
            "track {} inattentive at frame {} (score {}): {}",
            track_id,
            frame,
            event.score,
            reason::join(&event.reasons)
        );

        self.events.push(event);

        true
    }

    #[inline]
    pub fn events(&self) -> &[InattentionEvent] {
        &self.events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn into_events(self) -> Vec<InattentionEvent> {
        self.events
    }
}
