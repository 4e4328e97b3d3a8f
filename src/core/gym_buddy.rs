// Session driver: owns the active workout and feeds it one frame at a time

use std::mem;

use uuid::Uuid;

use crate::core::config::Config;
use crate::core::orientation::detect_side;
use crate::core::workouts::Workout;
use crate::models::pose::{flatten_xy, Landmark, Side, POSE_LANDMARK_COUNT};
use crate::models::workout::{
    AnalysisRecord, CompletedWorkout, ExerciseKind, FrameResult, FrameStatus, RawLandmarkRecord,
    SessionStatus, Strictness, WorkoutError, WorkoutMetadata, WorkoutResult,
};

/// Drives one exercise set from start to goal
///
/// Calls must be serialized per instance; the driver holds no locks and
/// performs no I/O.
pub struct GymBuddy {
    workout: Workout,
    goal_reps: u32,
    max_goal_reps: u32,
    rep_count: u32,
    frame_count: u64,
    side: Option<Side>,
    status: SessionStatus,
    series_number: u32,
    workout_id: String,
    started_at: i64,
    device_id: String,
    persist_raw_landmarks: bool,
    analysis_buffer: Vec<AnalysisRecord>,
    raw_landmarks_buffer: Vec<RawLandmarkRecord>,
}

impl GymBuddy {
    pub fn new(config: &Config) -> Self {
        Self {
            workout: Workout::new(config.default_exercise, config.default_strictness),
            goal_reps: config.default_goal_reps,
            max_goal_reps: config.max_goal_reps,
            rep_count: 0,
            frame_count: 0,
            side: None,
            status: SessionStatus::Idle,
            series_number: 1,
            workout_id: String::new(),
            started_at: 0,
            device_id: Self::get_device_id(),
            persist_raw_landmarks: config.persist_raw_landmarks,
            analysis_buffer: Vec::new(),
            raw_landmarks_buffer: Vec::new(),
        }
    }

    // ==========================================================================
    // Session lifecycle
    // ==========================================================================

    /// Replace the active workout; the current set, if any, is abandoned
    pub fn select_exercise(&mut self, kind: ExerciseKind) {
        let strictness = self.workout.strictness();
        self.workout = Workout::new(kind, strictness);
        self.clear_set();
        self.status = SessionStatus::Idle;
        tracing::info!(exercise = kind.as_str(), "exercise selected");
    }

    pub fn select_exercise_by_name(&mut self, name: &str) -> WorkoutResult<()> {
        let kind = name.parse::<ExerciseKind>()?;
        self.select_exercise(kind);
        Ok(())
    }

    pub fn set_target_reps(&mut self, reps: u32) -> WorkoutResult<()> {
        if reps == 0 || reps > self.max_goal_reps {
            return Err(WorkoutError::InvalidTargetReps(reps));
        }
        // A running set completes on reaching the goal exactly
        if self.status == SessionStatus::InProgress && reps <= self.rep_count {
            return Err(WorkoutError::InvalidTargetReps(reps));
        }
        self.goal_reps = reps;
        tracing::info!(reps, "target reps set");
        Ok(())
    }

    pub fn set_strictness(&mut self, strictness: Strictness) {
        self.workout.set_strictness(strictness);
        tracing::info!(strictness = strictness.as_str(), "strictness set");
    }

    pub fn set_strictness_by_name(&mut self, name: &str) -> WorkoutResult<()> {
        let strictness = name.parse::<Strictness>()?;
        self.set_strictness(strictness);
        Ok(())
    }

    /// Begin a new set with the current exercise, goal and strictness
    pub fn start(&mut self) {
        self.workout = Workout::new(self.workout.kind(), self.workout.strictness());
        self.clear_set();
        self.workout_id = Uuid::new_v4().to_string();
        self.started_at = chrono::Utc::now().timestamp_millis();
        self.status = SessionStatus::InProgress;

        tracing::info!(
            exercise = self.workout.kind().as_str(),
            goal = self.goal_reps,
            series = self.series_number,
            "workout started"
        );
    }

    /// Abandon the current set and return to idle
    pub fn reset(&mut self) {
        self.workout = Workout::new(self.workout.kind(), self.workout.strictness());
        self.clear_set();
        self.status = SessionStatus::Idle;
    }

    fn clear_set(&mut self) {
        self.rep_count = 0;
        self.frame_count = 0;
        self.side = None;
        self.analysis_buffer.clear();
        self.raw_landmarks_buffer.clear();
    }

    // ==========================================================================
    // Frame processing
    // ==========================================================================

    /// Feed one frame of landmarks captured at `timestamp_ms`
    ///
    /// Errors confined to the frame never end the session: the frame is
    /// reported as skipped and all state is left as it was.
    pub fn process_frame(&mut self, landmarks: &[Landmark], timestamp_ms: i64) -> FrameResult {
        match self.status {
            SessionStatus::Idle => return self.frame_result(FrameStatus::Idle),
            SessionStatus::Completed => return self.frame_result(FrameStatus::Completed),
            SessionStatus::InProgress => {}
        }

        if landmarks.is_empty() {
            return self.frame_result(FrameStatus::NoLandmarks);
        }

        let snapshot = self.workout.clone();
        match self.analyze(landmarks, timestamp_ms) {
            Ok(()) if self.status == SessionStatus::Completed => {
                self.frame_result(FrameStatus::Completed)
            }
            Ok(()) => self.frame_result(FrameStatus::Analyzed),
            Err(e) => {
                self.workout = snapshot;
                if e.is_frame_error() {
                    tracing::warn!(frame = self.frame_count, error = %e, "frame skipped");
                } else {
                    tracing::error!(frame = self.frame_count, error = %e, "frame failed");
                }
                self.frame_result(FrameStatus::Skipped {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn analyze(&mut self, landmarks: &[Landmark], timestamp_ms: i64) -> WorkoutResult<()> {
        if landmarks.len() < POSE_LANDMARK_COUNT {
            return Err(WorkoutError::InvalidInput(format!(
                "expected {} landmarks, got {}",
                POSE_LANDMARK_COUNT,
                landmarks.len()
            )));
        }

        // Side is resolved on the first analyzed frame of the set
        let resolved_side = match self.side {
            Some(side) => side,
            None => {
                let side = detect_side(landmarks)?;
                self.workout.update_indices(side);
                side
            }
        };

        let reps = self.workout.count_reps(landmarks)?;
        self.workout.get_form(landmarks)?;

        if self.side.is_none() {
            tracing::info!(side = resolved_side.to_string(), "side resolved");
            self.side = Some(resolved_side);
        }
        self.rep_count += reps;

        self.analysis_buffer.push(AnalysisRecord {
            frame: self.frame_count,
            timestamp_ms,
            series_number: self.series_number,
            rep_count: self.rep_count,
            down: self.workout.phase().is_down(),
            form_issues: self.workout.fix_form().to_string(),
            angles: self.workout.get_display_angles(),
            landmarks_of_interest: self.workout.get_indices(),
        });
        if self.persist_raw_landmarks {
            self.raw_landmarks_buffer.push(RawLandmarkRecord {
                frame: self.frame_count,
                timestamp_ms,
                coordinates: flatten_xy(landmarks),
            });
        }

        tracing::debug!(
            frame = self.frame_count,
            reps = self.rep_count,
            down = self.workout.phase().is_down(),
            form = self.workout.form(),
            "frame analyzed"
        );
        self.frame_count += 1;

        if self.rep_count == self.goal_reps {
            self.status = SessionStatus::Completed;
            tracing::info!(
                reps = self.rep_count,
                exercise = self.workout.kind().as_str(),
                "workout complete"
            );
        }

        Ok(())
    }

    fn frame_result(&self, status: FrameStatus) -> FrameResult {
        FrameResult {
            rep_count: self.rep_count,
            form_ok: self.workout.form(),
            form_message: self.workout.fix_form().to_string(),
            display_angles: self.workout.get_display_angles(),
            is_down_phase: self.workout.phase().is_down(),
            status,
        }
    }

    // ==========================================================================
    // Completion
    // ==========================================================================

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Drain the buffered records of a completed set
    ///
    /// Returns `None` until the goal is reached, and after the buffers
    /// have been taken once. Taking a set moves the session on to the next
    /// series number; abandoned sets never consume one.
    pub fn take_completed(&mut self) -> Option<CompletedWorkout> {
        if !self.is_completed() || self.analysis_buffer.is_empty() {
            return None;
        }

        let completed = CompletedWorkout {
            metadata: self.metadata(),
            analysis: mem::take(&mut self.analysis_buffer),
            raw_landmarks: mem::take(&mut self.raw_landmarks_buffer),
        };
        self.series_number += 1;
        Some(completed)
    }

    pub fn metadata(&self) -> WorkoutMetadata {
        let strictness = self.workout.strictness();
        WorkoutMetadata {
            id: self.workout_id.clone(),
            exercise: self.workout.kind(),
            started_at: self.started_at,
            rep_goal: self.goal_reps,
            strictness,
            strictness_definition: strictness.deviation_degrees(),
            left_side: self.side.map(Side::is_left).unwrap_or(false),
            series_number: self.series_number,
            device_id: self.device_id.clone(),
            landmarks_of_interest: self.workout.get_indices(),
        }
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn goal_reps(&self) -> u32 {
        self.goal_reps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn series_number(&self) -> u32 {
        self.series_number
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.workout.kind()
    }

    pub fn strictness(&self) -> Strictness {
        self.workout.strictness()
    }

    pub fn workout(&self) -> &Workout {
        &self.workout
    }

    fn get_device_id() -> String {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
