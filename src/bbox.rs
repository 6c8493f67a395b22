use serde_derive::{Deserialize, Serialize};

/// Left-top-right-bottom box in pixels, as delivered by the person tracker.
///
/// Serialized as a plain `[x1, y1, x2, y2]` array.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl From<[i32; 4]> for BBox {
    #[inline]
    fn from(v: [i32; 4]) -> Self {
        Self::ltrb(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [i32; 4] {
    #[inline]
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BBox {
    #[inline]
    pub fn ltrb(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    // Not clamped: an inverted box yields a negative height.
    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn as_array(&self) -> [i32; 4] {
        (*self).into()
    }
}
