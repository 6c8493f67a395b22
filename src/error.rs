use thiserror::Error;

use crate::keypoints::Landmark;

#[derive(Debug, Error)]
pub enum Error {
    #[error("keypoint set has {got} landmarks, {required} required")]
    TooFewLandmarks { got: usize, required: usize },

    #[error("keypoint array of shape ({0}, {1}) is not (N, 3)")]
    InvalidKeypointShape(usize, usize),

    #[error("visible landmark {0:?} has non-finite coordinates")]
    NonFiniteLandmark(Landmark),

    #[error("invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("frame {got} arrived after frame {last}")]
    FrameOutOfOrder { last: u64, got: u64 },

    #[error("processing worker panicked")]
    WorkerPanicked,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
