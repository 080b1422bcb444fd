//! Plane geometry over normalized keypoints.
//!
//! Everything here is pure: no state, no I/O. Degenerate input never panics
//! and never yields NaN.

use super::keypoint::Point;

/// Angle in degrees at vertex `b` between the rays `b→a` and `b→c`.
///
/// Returns a value in `[0, 180]`. If either ray has zero length the angle is
/// undefined and `0.0` is returned.
pub fn angle_at(a: Point, b: Point, c: Point) -> f64 {
    let v1 = (a.x - b.x, a.y - b.y);
    let v2 = (c.x - b.x, c.y - b.y);

    let mag1 = v1.0.hypot(v1.1);
    let mag2 = v2.0.hypot(v2.1);
    if mag1 == 0.0 || mag2 == 0.0 || !mag1.is_finite() || !mag2.is_finite() {
        tracing::debug!("[geometry] degenerate angle input, returning 0");
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    // float drift can push |cos| slightly past 1
    let cos = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Direction in degrees of the vector from `b` to `a`, `atan2(dy, dx)`.
///
/// Used for levelness of a joint pair rather than a bend. Result is in
/// `(-180, 180]`; coincident points give `0.0`.
pub fn alignment_angle(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    dy.atan2(dx).to_degrees()
}

/// Absolute difference between two angles in degrees, wrapped into
/// `[0, 180]`.
///
/// Directions from [`alignment_angle`] meet at ±180, so 179° and -179° are
/// 2° apart. Bend angles from [`angle_at`] never wrap and come out as
/// `|a - b|`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}
