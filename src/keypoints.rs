use nalgebra as na;
use ndarray::ArrayView2;

use crate::config::VISIBILITY_THRESHOLD;
use crate::error::{Error, Result};

/// Number of landmarks the pose estimator emits per person.
pub const REQUIRED_LANDMARKS: usize = 17;

/// Landmark positions in the 17-point pose layout. Only the ones the
/// behaviour engine reads are named.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Landmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
}

impl Landmark {
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Contains (x,y) of the landmark and the estimator confidence in [0,1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    #[inline(always)]
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    // NaN confidence is never visible
    #[inline(always)]
    pub fn is_visible(&self) -> bool {
        self.confidence > VISIBILITY_THRESHOLD
    }

    #[inline(always)]
    pub fn point(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }
}

impl From<[f32; 3]> for Keypoint {
    #[inline]
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// A validated, full-size keypoint set for one person in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoints([Keypoint; REQUIRED_LANDMARKS]);

impl Keypoints {
    /// Builds a set from `(x, y, confidence)` rows. Rows beyond the required
    /// count are ignored; fewer rows is an invalid observation.
    pub fn from_rows(rows: &[[f32; 3]]) -> Result<Self> {
        if rows.len() < REQUIRED_LANDMARKS {
            return Err(Error::TooFewLandmarks {
                got: rows.len(),
                required: REQUIRED_LANDMARKS,
            });
        }

        let mut points = [Keypoint::default(); REQUIRED_LANDMARKS];
        for (dst, src) in points.iter_mut().zip(rows) {
            *dst = (*src).into();
        }

        Ok(Self(points))
    }

    /// Builds a set straight from a pose model output of shape `(N, 3)`.
    pub fn from_array(view: ArrayView2<'_, f32>) -> Result<Self> {
        let (nrows, ncols) = view.dim();
        if ncols != 3 {
            return Err(Error::InvalidKeypointShape(nrows, ncols));
        }

        if nrows < REQUIRED_LANDMARKS {
            return Err(Error::TooFewLandmarks {
                got: nrows,
                required: REQUIRED_LANDMARKS,
            });
        }

        let mut points = [Keypoint::default(); REQUIRED_LANDMARKS];
        for (dst, row) in points.iter_mut().zip(view.rows()) {
            *dst = Keypoint::new(row[0], row[1], row[2]);
        }

        Ok(Self(points))
    }

    #[inline(always)]
    pub fn get(&self, lm: Landmark) -> &Keypoint {
        &self.0[lm.index()]
    }

    /// Position of a visible landmark, `None` when it is not visible.
    ///
    /// A visible landmark with NaN or infinite coordinates is a fault, not a
    /// miss: callers decide whether to contain it or treat it as unobserved.
    pub fn visible(&self, lm: Landmark) -> Result<Option<na::Point2<f32>>> {
        let kp = self.get(lm);
        if !kp.is_visible() {
            return Ok(None);
        }

        if !(kp.x.is_finite() && kp.y.is_finite()) {
            return Err(Error::NonFiniteLandmark(lm));
        }

        Ok(Some(kp.point()))
    }

    /// Same as [`Keypoints::visible`], with faults folded into "not observed".
    #[inline]
    pub fn observed(&self, lm: Landmark) -> Option<na::Point2<f32>> {
        self.visible(lm).ok().flatten()
    }

    /// Eye-openness proxy: mean confidence of both eyes, only when both are visible.
    pub fn eye_openness(&self) -> Option<f32> {
        let left = self.get(Landmark::LeftEye);
        let right = self.get(Landmark::RightEye);

        if left.is_visible() && right.is_visible() {
            Some((left.confidence + right.confidence) / 2.0)
        } else {
            None
        }
    }

    /// Midpoint of the eyes, used as the gaze sample.
    pub fn eye_center(&self) -> Option<na::Point2<f32>> {
        let left = self.observed(Landmark::LeftEye)?;
        let right = self.observed(Landmark::RightEye)?;

        Some(na::center(&left, &right))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Keypoint> {
        self.0.iter()
    }
}
