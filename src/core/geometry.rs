// Angle computation over 2D landmarks

use crate::models::pose::Landmark;
use crate::models::workout::{WorkoutError, WorkoutResult};

/// Unsigned angle at `p2`, in degrees, between rays `p2->p1` and `p2->p3`
///
/// Fails with `Geometry` when either ray has zero length and with
/// `InvalidInput` when a coordinate is not finite.
pub fn compute_angle(p1: &Landmark, p2: &Landmark, p3: &Landmark) -> WorkoutResult<f32> {
    for (i, p) in [p1, p2, p3].iter().enumerate() {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(WorkoutError::InvalidInput(format!(
                "point {} has non-finite coordinates ({}, {})",
                i + 1,
                p.x,
                p.y
            )));
        }
    }

    let (v1x, v1y) = ((p1.x - p2.x) as f64, (p1.y - p2.y) as f64);
    let (v2x, v2y) = ((p3.x - p2.x) as f64, (p3.y - p2.y) as f64);

    let mag1 = (v1x * v1x + v1y * v1y).sqrt();
    let mag2 = (v2x * v2x + v2y * v2y).sqrt();
    if mag1 == 0.0 || mag2 == 0.0 {
        return Err(WorkoutError::Geometry(
            "zero-length vector in angle computation".to_string(),
        ));
    }

    let cos_angle = ((v1x * v2x + v1y * v2y) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Ok(cos_angle.acos().to_degrees() as f32)
}

/// Absolute difference of x positions
pub fn horizontal_offset(a: &Landmark, b: &Landmark) -> f32 {
    (a.x - b.x).abs()
}
