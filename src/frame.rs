use serde_derive::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::Result;
use crate::keypoints::Keypoints;

/// Externally assigned track identity, stable only while the upstream tracker
/// keeps continuity.
pub type TrackId = i32;

/// One tracked person in one frame, as delivered by the perception stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observation {
    pub track_id: TrackId,
    pub bbox: BBox,

    // (x, y, confidence) rows in pose-layout order
    pub keypoints: Vec<[f32; 3]>,
}

impl Observation {
    #[inline]
    pub fn keypoints(&self) -> Result<Keypoints> {
        Keypoints::from_rows(&self.keypoints)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub index: u64,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl Frame {
    #[inline]
    pub fn new(index: u64, observations: Vec<Observation>) -> Self {
        Self {
            index,
            observations,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Stream time of this frame.
    #[inline]
    pub fn time_secs(&self, fps: f64) -> f64 {
        self.index as f64 / fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_line() {
        let line = r#"{"index": 12, "observations": [{"track_id": 3, "bbox": [0, 0, 50, 100], "keypoints": [[0.5, 0.2, 0.9]]}]}"#;
        let frame: Frame = serde_json::from_str(line).unwrap();

        assert_eq!(frame.index, 12);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.observations[0].bbox.height(), 100);
        assert!(frame.observations[0].keypoints().is_err());
        assert_eq!(frame.time_secs(6.0), 2.0);
    }

    #[test]
    fn observations_default_to_empty() {
        let frame: Frame = serde_json::from_str(r#"{"index": 0}"#).unwrap();
        assert!(frame.is_empty());
    }
}
