// Data models for workout sessions, per-frame results, and persisted records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Issue text reported when every form rule holds
pub const GOOD_FORM: &str = "Good form";

// ==============================================================================
// Exercise selection
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseKind {
    #[serde(rename = "push-ups")]
    PushUps,
    #[serde(rename = "squats")]
    Squats,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::PushUps => "push-ups",
            ExerciseKind::Squats => "squats",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseKind::PushUps => "Push-ups",
            ExerciseKind::Squats => "Squats",
        }
    }
}

impl FromStr for ExerciseKind {
    type Err = WorkoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "push-ups" => Ok(ExerciseKind::PushUps),
            "squats" => Ok(ExerciseKind::Squats),
            _ => Err(WorkoutError::UnknownExercise(s.to_string())),
        }
    }
}

/// Tolerance applied to form-angle checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    Strict,
    Moderate,
    Loose,
}

impl Strictness {
    /// Allowed deviation in degrees
    pub fn deviation_degrees(&self) -> f32 {
        match self {
            Strictness::Strict => 5.0,
            Strictness::Moderate => 10.0,
            Strictness::Loose => 15.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strictness::Strict => "strict",
            Strictness::Moderate => "moderate",
            Strictness::Loose => "loose",
        }
    }
}

impl FromStr for Strictness {
    type Err = WorkoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The mobile client sends "medium" for the intermediate level
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Strictness::Strict),
            "moderate" | "medium" => Ok(Strictness::Moderate),
            "loose" => Ok(Strictness::Loose),
            _ => Err(WorkoutError::UnknownStrictness(s.to_string())),
        }
    }
}

// ==============================================================================
// State machine values
// ==============================================================================

/// Hysteresis phase of the primary joint angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Up,
    Down,
}

impl Phase {
    pub fn is_down(self) -> bool {
        matches!(self, Phase::Down)
    }
}

/// Named angle for UI overlays, referencing its three defining landmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayAngle {
    pub name: String,
    pub value: f32,
    pub joint_indices: [usize; 3],
}

/// Outcome of one posture evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCheck {
    pub ok: bool,
    pub message: String,
}

impl FormCheck {
    /// Build from collected issues; no issues means good form
    pub fn from_issues(issues: Vec<&str>) -> Self {
        if issues.is_empty() {
            Self {
                ok: true,
                message: GOOD_FORM.to_string(),
            }
        } else {
            Self {
                ok: false,
                message: issues.join(", "),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameStatus {
    Idle,
    Analyzed,
    Skipped { reason: String },
    NoLandmarks,
    Completed,
}

/// Per-frame output consumed by renderers and telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub rep_count: u32,
    pub form_ok: bool,
    pub form_message: String,
    pub display_angles: Vec<DisplayAngle>,
    pub is_down_phase: bool,
    pub status: FrameStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    InProgress,
    Completed,
}

// ==============================================================================
// Records for the persistence collaborator
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub frame: u64,
    pub timestamp_ms: i64,
    pub series_number: u32,
    pub rep_count: u32,
    pub down: bool,
    pub form_issues: String,
    pub angles: Vec<DisplayAngle>,
    pub landmarks_of_interest: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLandmarkRecord {
    pub frame: u64,
    pub timestamp_ms: i64,
    pub coordinates: Vec<f32>, // Flattened [x0, y0, x1, y1, ...]
}

/// Values of a set that do not change while it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutMetadata {
    pub id: String,
    pub exercise: ExerciseKind,
    pub started_at: i64,
    pub rep_goal: u32,
    pub strictness: Strictness,
    pub strictness_definition: f32,
    pub left_side: bool,
    pub series_number: u32,
    pub device_id: String,
    pub landmarks_of_interest: BTreeMap<String, usize>,
}

/// Buffers drained from the driver when a set reaches its goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedWorkout {
    pub metadata: WorkoutMetadata,
    pub analysis: Vec<AnalysisRecord>,
    pub raw_landmarks: Vec<RawLandmarkRecord>,
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Landmark index {index} out of range for frame of {len} landmarks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Degenerate geometry: {0}")]
    Geometry(String),

    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("Unknown strictness level: {0}")]
    UnknownStrictness(String),

    #[error("Malformed landmark {index}: {reason}")]
    MalformedLandmark { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid target reps: {0}")]
    InvalidTargetReps(u32),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkoutError {
    /// Errors confined to a single frame; the session survives them
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            WorkoutError::InvalidInput(_)
                | WorkoutError::IndexOutOfRange { .. }
                | WorkoutError::Geometry(_)
                | WorkoutError::MalformedLandmark { .. }
        )
    }
}

impl From<sqlx::Error> for WorkoutError {
    fn from(e: sqlx::Error) -> Self {
        WorkoutError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for WorkoutError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        WorkoutError::DatabaseError(format!("migration failed: {}", e))
    }
}

pub type WorkoutResult<T> = Result<T, WorkoutError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("push-ups", ExerciseKind::PushUps)]
    #[case("Push-Ups", ExerciseKind::PushUps)]
    #[case(" squats ", ExerciseKind::Squats)]
    fn test_exercise_from_str(#[case] input: &str, #[case] expected: ExerciseKind) {
        assert_eq!(input.parse::<ExerciseKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_exercise() {
        assert!(matches!(
            "abs".parse::<ExerciseKind>(),
            Err(WorkoutError::UnknownExercise(name)) if name == "abs"
        ));
    }

    #[rstest]
    #[case(Strictness::Strict, 5.0)]
    #[case(Strictness::Moderate, 10.0)]
    #[case(Strictness::Loose, 15.0)]
    fn test_strictness_deviation(#[case] level: Strictness, #[case] degrees: f32) {
        assert_eq!(level.deviation_degrees(), degrees);
        assert_eq!(level.as_str().parse::<Strictness>().unwrap(), level);
    }

    #[test]
    fn test_strictness_aliases() {
        assert_eq!("medium".parse::<Strictness>().unwrap(), Strictness::Moderate);
        assert!(matches!(
            "lenient".parse::<Strictness>(),
            Err(WorkoutError::UnknownStrictness(_))
        ));
    }

    #[test]
    fn test_form_check_from_issues() {
        let good = FormCheck::from_issues(vec![]);
        assert!(good.ok);
        assert_eq!(good.message, GOOD_FORM);

        let bad = FormCheck::from_issues(vec!["knees on floor", "back not straight"]);
        assert!(!bad.ok);
        assert_eq!(bad.message, "knees on floor, back not straight");
    }

    #[test]
    fn test_frame_error_classification() {
        assert!(WorkoutError::Geometry("zero".into()).is_frame_error());
        assert!(WorkoutError::IndexOutOfRange { index: 1, len: 0 }.is_frame_error());
        assert!(!WorkoutError::UnknownExercise("abs".into()).is_frame_error());
        assert!(!WorkoutError::InvalidTargetReps(0).is_frame_error());
    }

    #[test]
    fn test_frame_result_serialization() {
        let result = FrameResult {
            rep_count: 2,
            form_ok: true,
            form_message: GOOD_FORM.to_string(),
            display_angles: vec![],
            is_down_phase: false,
            status: FrameStatus::Skipped {
                reason: "geometry".to_string(),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"]["kind"], "skipped");
        assert_eq!(json["rep_count"], 2);
        assert_eq!(
            serde_json::to_value(ExerciseKind::PushUps).unwrap(),
            "push-ups"
        );
    }
}
