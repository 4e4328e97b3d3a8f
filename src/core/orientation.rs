// Decides which side of the body faces the camera

use crate::models::pose::{landmark_at, BodyLandmark, Landmark, Side};
use crate::models::workout::WorkoutResult;

/// Minimum landmarks needed to compare elbows (indices 0-14)
pub const MIN_ORIENTATION_LANDMARKS: usize = BodyLandmark::RightElbow as usize + 1;

/// True when the left elbow is strictly more visible than the right one
pub fn is_left_side(frame: &[Landmark]) -> WorkoutResult<bool> {
    let left_index = BodyLandmark::LeftElbow.index();
    let right_index = BodyLandmark::RightElbow.index();

    let left = landmark_at(frame, left_index)?;
    let right = landmark_at(frame, right_index)?;
    left.validate(left_index)?;
    right.validate(right_index)?;

    tracing::debug!(
        left_visibility = left.visibility,
        right_visibility = right.visibility,
        "comparing elbow visibility"
    );

    Ok(left.visibility > right.visibility)
}

/// Resolve the facing side; ties resolve to `Side::Right`
pub fn detect_side(frame: &[Landmark]) -> WorkoutResult<Side> {
    is_left_side(frame).map(Side::from_left_visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workout::WorkoutError;

    fn frame_with_elbows(left: f32, right: f32) -> Vec<Landmark> {
        let mut frame = vec![Landmark::new(0.0, 0.0, 0.0); MIN_ORIENTATION_LANDMARKS];
        frame[13].visibility = left;
        frame[14].visibility = right;
        frame
    }

    #[test]
    fn test_left_side() {
        assert!(is_left_side(&frame_with_elbows(0.75, 0.23)).unwrap());
        assert_eq!(detect_side(&frame_with_elbows(0.75, 0.23)).unwrap(), Side::Left);
    }

    #[test]
    fn test_right_side() {
        assert!(!is_left_side(&frame_with_elbows(0.25, 0.63)).unwrap());
        assert_eq!(detect_side(&frame_with_elbows(0.25, 0.63)).unwrap(), Side::Right);
    }

    #[test]
    fn test_tie_resolves_right() {
        assert_eq!(detect_side(&frame_with_elbows(0.5, 0.5)).unwrap(), Side::Right);
    }

    #[test]
    fn test_too_few_landmarks() {
        let short = vec![Landmark::at(0.0, 0.0); 12];
        assert!(matches!(
            is_left_side(&short),
            Err(WorkoutError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            is_left_side(&[]),
            Err(WorkoutError::IndexOutOfRange { index: 13, len: 0 })
        ));
    }

    #[test]
    fn test_malformed_visibility() {
        let frame = frame_with_elbows(f32::NAN, 0.5);
        assert!(matches!(
            is_left_side(&frame),
            Err(WorkoutError::MalformedLandmark { index: 13, .. })
        ));
    }
}
