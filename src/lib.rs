pub mod bbox;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod keypoints;
pub mod math;
pub mod monitor;
pub mod reason;
pub mod scorer;
pub mod segment;
pub mod tracker;

mod circular_queue;

pub use bbox::BBox;
pub use config::Config;
pub use event::{EventRow, InattentionEvent};
pub use frame::{Frame, Observation, TrackId};
pub use keypoints::{Keypoints, Landmark};
pub use monitor::{AttentionMonitor, Progress, Report, Worker};
pub use reason::Reason;
pub use scorer::Assessment;
pub use segment::Summary;
pub use tracker::StateTracker;

use error::Error;

/// Frame-sequential consumer of pose observations.
pub trait Monitoring {
    fn update(&mut self, frame: &Frame) -> Result<(), Error>;
    fn events(&self) -> &[InattentionEvent];
    fn summary(&self) -> Summary;
}
