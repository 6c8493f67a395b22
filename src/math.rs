use nalgebra as na;

/// Sum of euclidean steps between consecutive points.
pub fn path_length<'a, I>(points: I) -> f32
where
    I: IntoIterator<Item = &'a na::Point2<f32>>,
{
    let mut iter = points.into_iter();
    let mut prev = match iter.next() {
        Some(p) => p,
        None => return 0.0,
    };

    let mut total = 0.0;
    for p in iter {
        total += na::distance(prev, p);
        prev = p;
    }

    total
}

/// Angle in degrees between the segment `a -> b` and the horizontal axis,
/// folded into [0, 90].
#[inline]
pub fn tilt_degrees(a: &na::Point2<f32>, b: &na::Point2<f32>) -> f32 {
    let d = b - a;

    d.y.abs().atan2(d.x.abs()).to_degrees()
}
