use log::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::TrackId;
use crate::keypoints::{Keypoints, Landmark};
use crate::math;
use crate::reason::Reason;
use crate::tracker::{BehaviorKind, StateTracker};

pub const MAX_SCORE: i32 = 100;

const HEAD_DOWN_PENALTY: i32 = 80;
const EYE_CLOSED_PENALTY: i32 = 70;
const STILLNESS_PENALTY: i32 = 50;
const BRIEF_HEAD_DOWN_PENALTY: i32 = 30;
const SHOULDER_TILT_PENALTY: i32 = 20;
const HAND_ANOMALY_PENALTY: i32 = 15;

/// Attention score of one observation and the reasons it lost points, in the
/// order they were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: i32,
    pub reasons: Vec<Reason>,
}

impl Assessment {
    fn invalid() -> Self {
        Self {
            score: 0,
            reasons: Vec::new(),
        }
    }
}

struct Tally {
    score: i32,
    reasons: Vec<Reason>,
}

impl Tally {
    fn new() -> Self {
        Self {
            score: MAX_SCORE,
            reasons: Vec::new(),
        }
    }

    #[inline]
    fn deduct(&mut self, penalty: i32, reason: Reason) {
        self.score -= penalty;
        self.reasons.push(reason);
    }

    fn finish(self) -> Assessment {
        Assessment {
            score: self.score.clamp(0, MAX_SCORE),
            reasons: self.reasons,
        }
    }

    // keeps the deductions made so far, replaces the reasons
    fn fail(self) -> Assessment {
        Assessment {
            score: self.score.clamp(0, MAX_SCORE),
            reasons: vec![Reason::ComputationError],
        }
    }
}

/// Scores raw keypoint rows. A set with too few landmarks scores 0 and
/// leaves the tracker untouched.
pub fn score(
    rows: &[[f32; 3]],
    bbox_height: f32,
    config: &Config,
    tracker: &mut StateTracker,
    track_id: TrackId,
    fps: f64,
) -> Assessment {
    match Keypoints::from_rows(rows) {
        Ok(kps) => score_keypoints(&kps, bbox_height, config, tracker, track_id, fps),
        Err(err) => {
            debug!("track {}: invalid observation: {}", track_id, err);
            Assessment::invalid()
        }
    }
}

/// Feeds the observation to the tracker, then applies the sustained and
/// single-frame rules in order. Never fails: a fault part-way through keeps
/// the deductions already made and reports a single computation error.
pub fn score_keypoints(
    kps: &Keypoints,
    bbox_height: f32,
    config: &Config,
    tracker: &mut StateTracker,
    track_id: TrackId,
    fps: f64,
) -> Assessment {
    let mut tally = Tally::new();

    match evaluate(&mut tally, kps, bbox_height, config, tracker, track_id, fps) {
        Ok(()) => tally.finish(),
        Err(err) => {
            warn!("track {}: attention scoring failed: {}", track_id, err);
            tally.fail()
        }
    }
}

fn evaluate(
    tally: &mut Tally,
    kps: &Keypoints,
    bbox_height: f32,
    config: &Config,
    tracker: &mut StateTracker,
    track_id: TrackId,
    fps: f64,
) -> Result<()> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(Error::InvalidFrameRate(fps));
    }

    tracker.update(track_id, kps, fps);

    let mut sustained_head_down = false;
    for behavior in tracker.check_behaviors(track_id, kps, fps, config) {
        let penalty = match behavior.kind {
            BehaviorKind::HeadDown => {
                sustained_head_down = true;
                HEAD_DOWN_PENALTY
            }
            BehaviorKind::EyeClosed => EYE_CLOSED_PENALTY,
            BehaviorKind::Stillness => STILLNESS_PENALTY,
        };

        tally.deduct(penalty, behavior.into());
    }

    let nose = kps.visible(Landmark::Nose)?;
    let left_shoulder = kps.visible(Landmark::LeftShoulder)?;
    let right_shoulder = kps.visible(Landmark::RightShoulder)?;

    // scaled by bbox height, unlike the sustained rule
    if !sustained_head_down {
        if let (Some(nose), Some(ls), Some(rs)) = (nose, left_shoulder, right_shoulder) {
            let shoulder_center_y = (ls.y + rs.y) / 2.0;
            let head_drop = (nose.y - shoulder_center_y) * bbox_height;

            if head_drop > config.head_down_threshold * bbox_height {
                tally.deduct(BRIEF_HEAD_DOWN_PENALTY, Reason::BriefHeadDown);
            }
        }
    }

    if let (Some(ls), Some(rs)) = (left_shoulder, right_shoulder) {
        let angle = math::tilt_degrees(&ls, &rs);
        if angle > config.shoulder_tilt_threshold {
            tally.deduct(SHOULDER_TILT_PENALTY, Reason::ShoulderTilt(angle));
        }
    }

    let sides = [
        (Landmark::LeftWrist, Landmark::LeftHip),
        (Landmark::RightWrist, Landmark::RightHip),
    ];

    let mut hand_low = false;
    for (wrist, hip) in sides {
        if let (Some(w), Some(h)) = (kps.visible(wrist)?, kps.visible(hip)?) {
            hand_low |= w.y > h.y + config.hand_below_hip_threshold;
        }
    }

    if hand_low {
        tally.deduct(HAND_ANOMALY_PENALTY, Reason::HandAnomaly);
    }

    Ok(())
}
