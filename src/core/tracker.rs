// Async front for the session driver: frame analysis off the runtime threads,
// completed sets persisted in the background

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::core::config::Config;
use crate::core::database::WorkoutStore;
use crate::core::gym_buddy::GymBuddy;
use crate::core::metrics::SessionMetrics;
use crate::models::pose::Landmark;
use crate::models::workout::{
    CompletedWorkout, ExerciseKind, FrameResult, SessionStatus, WorkoutError, WorkoutResult,
};

/// Completed sets waiting for the store
const PERSIST_QUEUE_CAPACITY: usize = 16;

/// One finished set in the session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub workout_id: String,
    pub exercise: ExerciseKind,
    pub reps: u32,
    pub series_number: u32,
    pub metrics: SessionMetrics,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.exercise.display_name(), self.reps)
    }
}

pub struct WorkoutTracker {
    buddy: Arc<Mutex<GymBuddy>>,
    history: Arc<RwLock<Vec<HistoryEntry>>>,
    warmup_backtrack_frames: u64,
    workout_tx: mpsc::Sender<CompletedWorkout>,
    persist_task: JoinHandle<()>,
}

impl WorkoutTracker {
    /// Spawns the persistence task; must be called from within a tokio runtime
    pub fn new(config: &Config, store: Arc<dyn WorkoutStore>) -> Self {
        let (workout_tx, workout_rx) = mpsc::channel(PERSIST_QUEUE_CAPACITY);
        let persist_task = tokio::spawn(Self::persist_completed(workout_rx, store));

        Self {
            buddy: Arc::new(Mutex::new(GymBuddy::new(config))),
            history: Arc::new(RwLock::new(Vec::new())),
            warmup_backtrack_frames: config.warmup_backtrack_frames,
            workout_tx,
            persist_task,
        }
    }

    // ==========================================================================
    // Session lifecycle
    // ==========================================================================

    pub async fn select_exercise(&self, name: &str) -> WorkoutResult<()> {
        self.buddy.lock().await.select_exercise_by_name(name)
    }

    pub async fn set_target_reps(&self, reps: u32) -> WorkoutResult<()> {
        self.buddy.lock().await.set_target_reps(reps)
    }

    pub async fn set_strictness(&self, name: &str) -> WorkoutResult<()> {
        self.buddy.lock().await.set_strictness_by_name(name)
    }

    pub async fn start(&self) {
        self.buddy.lock().await.start();
    }

    pub async fn reset(&self) {
        self.buddy.lock().await.reset();
    }

    pub async fn status(&self) -> SessionStatus {
        self.buddy.lock().await.status()
    }

    pub async fn rep_count(&self) -> u32 {
        self.buddy.lock().await.rep_count()
    }

    /// Finished sets of this session, oldest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().await.clone()
    }

    // ==========================================================================
    // Frame processing
    // ==========================================================================

    /// Analyze one frame; the set that reaches its goal is queued for storage
    pub async fn process_frame(
        &self,
        landmarks: Vec<Landmark>,
        timestamp_ms: i64,
    ) -> WorkoutResult<FrameResult> {
        let buddy = self.buddy.clone();

        let (result, completed) = tokio::task::spawn_blocking(move || {
            let mut buddy = buddy.blocking_lock();
            let result = buddy.process_frame(&landmarks, timestamp_ms);
            (result, buddy.take_completed())
        })
        .await
        .map_err(|e| WorkoutError::TaskFailed(e.to_string()))?;

        if let Some(workout) = completed {
            self.record_completed(workout).await;
        }

        Ok(result)
    }

    async fn record_completed(&self, workout: CompletedWorkout) {
        let metrics = SessionMetrics::calculate(&workout, self.warmup_backtrack_frames);
        let entry = HistoryEntry {
            workout_id: workout.metadata.id.clone(),
            exercise: workout.metadata.exercise,
            reps: metrics.total_repetitions,
            series_number: workout.metadata.series_number,
            metrics,
        };
        tracing::info!(
            series = entry.series_number,
            average_rep_ms = entry.metrics.average_rep_duration_ms,
            "{}",
            entry
        );
        self.history.write().await.push(entry);

        if let Err(e) = self.workout_tx.send(workout).await {
            tracing::error!("persistence task gone, dropping completed workout: {}", e);
        }
    }

    /// Background task storing completed sets until the tracker shuts down
    async fn persist_completed(
        mut rx: mpsc::Receiver<CompletedWorkout>,
        store: Arc<dyn WorkoutStore>,
    ) {
        while let Some(workout) = rx.recv().await {
            if let Err(e) = store.save_completed_workout(&workout).await {
                tracing::error!(workout_id = %workout.metadata.id, "error storing workout: {}", e);
            }
        }
        tracing::debug!("persistence task stopped");
    }

    /// Flush queued sets to the store and stop the background task
    pub async fn shutdown(self) -> WorkoutResult<()> {
        let Self {
            workout_tx,
            persist_task,
            ..
        } = self;

        drop(workout_tx);
        persist_task
            .await
            .map_err(|e| WorkoutError::TaskFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::Database;
    use crate::core::gym_buddy::test_frames::{push_up, push_up_rep};
    use crate::models::workout::FrameStatus;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingStore {
        saved: std::sync::Mutex<Vec<CompletedWorkout>>,
    }

    #[async_trait]
    impl WorkoutStore for RecordingStore {
        async fn save_completed_workout(&self, workout: &CompletedWorkout) -> WorkoutResult<()> {
            self.saved.lock().unwrap().push(workout.clone());
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl WorkoutStore for FailingStore {
        async fn save_completed_workout(&self, _workout: &CompletedWorkout) -> WorkoutResult<()> {
            Err(WorkoutError::DatabaseError("disk full".to_string()))
        }
    }

    async fn run_set(tracker: &WorkoutTracker, reps: usize) -> Vec<FrameResult> {
        let mut results = Vec::new();
        let mut ts = 0;
        for _ in 0..reps {
            for frame in push_up_rep() {
                results.push(tracker.process_frame(frame, ts).await.unwrap());
                ts += 33;
            }
        }
        results
    }

    #[tokio::test]
    async fn test_frames_ignored_before_start() {
        let store = Arc::new(RecordingStore::default());
        let tracker = WorkoutTracker::new(&Config::default(), store);

        let result = tracker.process_frame(push_up(170.0), 0).await.unwrap();
        assert_eq!(result.status, FrameStatus::Idle);
        assert_eq!(tracker.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_completed_set_recorded_and_persisted() {
        let store = Arc::new(RecordingStore::default());
        let tracker = WorkoutTracker::new(&Config::default(), store.clone());

        tracker.set_target_reps(2).await.unwrap();
        tracker.start().await;
        let results = run_set(&tracker, 2).await;

        assert_eq!(results.last().unwrap().status, FrameStatus::Completed);
        assert_eq!(tracker.status().await, SessionStatus::Completed);

        let history = tracker.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reps, 2);
        assert_eq!(history[0].to_string(), "Push-ups: 2");

        tracker.shutdown().await.unwrap();
        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].analysis.len(), 6);
    }

    #[tokio::test]
    async fn test_history_accumulates_across_series() {
        let store = Arc::new(RecordingStore::default());
        let tracker = WorkoutTracker::new(&Config::default(), store.clone());
        tracker.set_target_reps(1).await.unwrap();

        tracker.start().await;
        run_set(&tracker, 1).await;
        tracker.start().await;
        run_set(&tracker, 1).await;

        let history = tracker.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].series_number, 2);
        assert_ne!(history[0].workout_id, history[1].workout_id);
    }

    #[tokio::test]
    async fn test_lifecycle_errors_propagate() {
        let store = Arc::new(RecordingStore::default());
        let tracker = WorkoutTracker::new(&Config::default(), store);

        assert!(matches!(
            tracker.select_exercise("jumping jacks").await,
            Err(WorkoutError::UnknownExercise(_))
        ));
        assert!(matches!(
            tracker.set_target_reps(0).await,
            Err(WorkoutError::InvalidTargetReps(0))
        ));
        assert!(tracker.set_strictness("medium").await.is_ok());
        assert!(tracker.select_exercise("squats").await.is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_session() {
        let tracker = WorkoutTracker::new(&Config::default(), Arc::new(FailingStore));
        tracker.set_target_reps(1).await.unwrap();
        tracker.start().await;
        run_set(&tracker, 1).await;

        assert_eq!(tracker.history().await.len(), 1);
        tracker.reset().await;
        assert_eq!(tracker.rep_count().await, 0);
        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_persists_to_database() {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let tracker = WorkoutTracker::new(&Config::default(), db.clone());
        tracker.set_target_reps(1).await.unwrap();
        tracker.start().await;
        run_set(&tracker, 1).await;
        tracker.shutdown().await.unwrap();

        let workouts = db.list_workouts().await.unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].exercise, ExerciseKind::PushUps);
        let analysis = db.get_analysis(&workouts[0].id).await.unwrap();
        assert_eq!(analysis.len(), 3);
    }
}
