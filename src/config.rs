use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Events further apart than this (seconds) start a new segment.
pub const GAP_THRESHOLD_SECS: f64 = 3.0;

/// Segments shorter than this (seconds) are dropped as transients.
pub const MIN_SEGMENT_DURATION_SECS: f64 = 1.0;

/// A landmark counts as visible only above this confidence.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Capacity of every per-track rolling history.
pub const HISTORY_CAPACITY: usize = 30;

/// Number of most recent head positions the stillness check looks at.
pub const STILLNESS_WINDOW: usize = 5;

/// Tunable thresholds of the behaviour engine.
///
/// Every field has a default, so a JSON file only has to name the values it
/// overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Scores strictly below this are recorded as inattention events.
    pub attention_score_threshold: i32,

    /// Nose-below-shoulder-centre drop, in keypoint units.
    pub head_down_threshold: f32,
    pub head_down_duration: f64,

    /// Eye-openness proxy below which the eyes count as closed.
    pub eye_closed_threshold: f32,
    pub eye_closed_duration: f64,

    /// Head path length over the stillness window, in keypoint units.
    pub stillness_threshold: f32,
    pub stillness_duration: f64,

    /// Degrees.
    pub shoulder_tilt_threshold: f32,
    pub hand_below_hip_threshold: f32,

    /// Process one frame, then skip this many.
    pub skip_frames: u32,

    /// Per-track state is dropped after this much stream time without an observation.
    pub track_max_age_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            attention_score_threshold: 50,
            head_down_threshold: 0.03,
            head_down_duration: 3.0,
            eye_closed_threshold: 0.18,
            eye_closed_duration: 2.0,
            stillness_threshold: 5.0,
            stillness_duration: 4.0,
            shoulder_tilt_threshold: 25.0,
            hand_below_hip_threshold: 0.02,
            skip_frames: 2,
            track_max_age_secs: 30.0,
        }
    }
}

impl Config {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: Config = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("head_down_duration", self.head_down_duration),
            ("eye_closed_duration", self.eye_closed_duration),
            ("stillness_duration", self.stillness_duration),
        ];

        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!("{} must be >= 0, got {}", name, value)));
            }
        }

        let thresholds = [
            ("head_down_threshold", self.head_down_threshold),
            ("eye_closed_threshold", self.eye_closed_threshold),
            ("stillness_threshold", self.stillness_threshold),
            ("shoulder_tilt_threshold", self.shoulder_tilt_threshold),
            ("hand_below_hip_threshold", self.hand_below_hip_threshold),
        ];

        for (name, value) in thresholds {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{} must be finite", name)));
            }
        }

        if !(self.track_max_age_secs > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "track_max_age_secs must be > 0, got {}",
                self.track_max_age_secs
            )));
        }

        Ok(())
    }

    #[inline]
    pub fn frame_stride(&self) -> u64 {
        self.skip_frames as u64 + 1
    }
}
