use std::fmt;

use serde::{Serialize, Serializer};

use crate::tracker::{Behavior, BehaviorKind};

/// Why a frame lost attention points. Payloads stay typed until the report
/// boundary renders them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reason {
    /// Seconds the head has been down.
    HeadDown(f64),
    /// Seconds the eyes have been closed.
    EyeClosed(f64),
    /// Seconds the head has been still.
    Stillness(f64),
    BriefHeadDown,
    /// Shoulder line angle in degrees.
    ShoulderTilt(f32),
    HandAnomaly,
    ComputationError,
}

impl Reason {
    /// Payload-free name, the prefix of the rendered token.
    pub fn label(&self) -> &'static str {
        match self {
            Reason::HeadDown(_) => "sustained head-down",
            Reason::EyeClosed(_) => "eyes closed",
            Reason::Stillness(_) => "zoning out",
            Reason::BriefHeadDown => "brief head-down",
            Reason::ShoulderTilt(_) => "shoulder tilt",
            Reason::HandAnomaly => "hand anomaly",
            Reason::ComputationError => "computation error",
        }
    }

    #[inline]
    pub fn is_sustained(&self) -> bool {
        matches!(
            self,
            Reason::HeadDown(_) | Reason::EyeClosed(_) | Reason::Stillness(_)
        )
    }
}

impl From<Behavior> for Reason {
    fn from(b: Behavior) -> Self {
        match b.kind {
            BehaviorKind::HeadDown => Reason::HeadDown(b.duration),
            BehaviorKind::EyeClosed => Reason::EyeClosed(b.duration),
            BehaviorKind::Stillness => Reason::Stillness(b.duration),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::HeadDown(secs) | Reason::EyeClosed(secs) | Reason::Stillness(secs) => {
                write!(f, "{} ({:.1}s)", self.label(), secs)
            }
            Reason::ShoulderTilt(angle) => write!(f, "{} ({}°)", self.label(), *angle as i32),
            _ => f.write_str(self.label()),
        }
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Text form used in event rows: tokens joined with `;`.
pub fn join(reasons: &[Reason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}
