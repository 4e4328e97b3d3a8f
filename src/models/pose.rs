// Data models for body landmarks as produced by the pose-estimation model

use serde::{Deserialize, Serialize};

use crate::models::workout::{WorkoutError, WorkoutResult};

/// Number of landmarks in one MediaPipe body pose frame
pub const POSE_LANDMARK_COUNT: usize = 33;

// ==============================================================================
// Landmark
// ==============================================================================

fn default_visibility() -> f32 {
    1.0
}

/// A 2D body landmark with a visibility confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32, // Normalized [0, 1] image coordinates
    pub y: f32, // Normalized [0, 1], 0 is the top of the image
    #[serde(default = "default_visibility")]
    pub visibility: f32, // Confidence [0, 1], absent means fully visible
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    /// Landmark with the default (fully visible) confidence
    pub fn at(x: f32, y: f32) -> Self {
        Self::new(x, y, default_visibility())
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    /// Reject coordinates or confidences the state machine cannot use
    pub fn validate(&self, index: usize) -> WorkoutResult<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(WorkoutError::InvalidInput(format!(
                "landmark {} has non-finite coordinates ({}, {})",
                index, self.x, self.y
            )));
        }

        if !self.visibility.is_finite() || !(0.0..=1.0).contains(&self.visibility) {
            return Err(WorkoutError::MalformedLandmark {
                index,
                reason: format!("visibility {} outside [0, 1]", self.visibility),
            });
        }

        Ok(())
    }
}

/// Fetch a landmark by index, failing instead of panicking on short frames
pub fn landmark_at(frame: &[Landmark], index: usize) -> WorkoutResult<&Landmark> {
    frame.get(index).ok_or(WorkoutError::IndexOutOfRange {
        index,
        len: frame.len(),
    })
}

/// Flatten a frame into `[x0, y0, x1, y1, ...]` for raw landmark archival
pub fn flatten_xy(frame: &[Landmark]) -> Vec<f32> {
    frame.iter().flat_map(|lm| [lm.x, lm.y]).collect()
}

// ==============================================================================
// Body Landmark indices (33 keypoints)
// ==============================================================================

/// MediaPipe Pose Landmark indices (33 total)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

// ==============================================================================
// Side
// ==============================================================================

/// Which half of the body faces the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub fn from_left_visible(left_visible: bool) -> Self {
        if left_visible {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn is_left(self) -> bool {
        matches!(self, Side::Left)
    }

    /// Select the landmark on this side of the body
    pub fn pick(self, left: BodyLandmark, right: BodyLandmark) -> usize {
        match self {
            Side::Left => left.index(),
            Side::Right => right.index(),
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}
