use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::workout::{
    AnalysisRecord, CompletedWorkout, RawLandmarkRecord, WorkoutMetadata, WorkoutResult,
};

/// Persistence seam for completed sets
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    async fn save_completed_workout(&self, workout: &CompletedWorkout) -> WorkoutResult<()>;
}

#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations
    pub async fn init(path: &Path) -> WorkoutResult<Self> {
        let db_url = format!("sqlite://{}", path.display());

        // Create database directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !Sqlite::database_exists(&db_url).await? {
            Sqlite::create_database(&db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        tracing::info!(path = %path.display(), "database ready");
        Ok(db)
    }

    /// Private database living as long as the returned handle
    pub async fn in_memory() -> WorkoutResult<Self> {
        // A single connection that never idles out keeps the memory db alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> WorkoutResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// ==============================================================================
// Row models
// ==============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct WorkoutRow {
    id: String,
    workout_name: String,
    started_at: i64,
    rep_goal: i64,
    strictness: String,
    strictness_definition: f64,
    left_side: bool,
    series_number: i64,
    device_id: String,
    landmarks_of_interest: String,
}

impl WorkoutRow {
    fn into_metadata(self) -> WorkoutResult<WorkoutMetadata> {
        Ok(WorkoutMetadata {
            id: self.id,
            exercise: self.workout_name.parse()?,
            started_at: self.started_at,
            rep_goal: self.rep_goal as u32,
            strictness: self.strictness.parse()?,
            strictness_definition: self.strictness_definition as f32,
            left_side: self.left_side,
            series_number: self.series_number as u32,
            device_id: self.device_id,
            landmarks_of_interest: serde_json::from_str(&self.landmarks_of_interest)?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AnalysisRow {
    frame: i64,
    timestamp_ms: i64,
    series_number: i64,
    rep_count: i64,
    down: bool,
    form_issues: String,
    angles: String,
    landmarks_of_interest: String,
}

impl AnalysisRow {
    fn into_record(self) -> WorkoutResult<AnalysisRecord> {
        let landmarks_of_interest: BTreeMap<String, usize> =
            serde_json::from_str(&self.landmarks_of_interest)?;
        Ok(AnalysisRecord {
            frame: self.frame as u64,
            timestamp_ms: self.timestamp_ms,
            series_number: self.series_number as u32,
            rep_count: self.rep_count as u32,
            down: self.down,
            form_issues: self.form_issues,
            angles: serde_json::from_str(&self.angles)?,
            landmarks_of_interest,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RawLandmarkRow {
    frame: i64,
    timestamp_ms: i64,
    coordinates: String,
}

// ==============================================================================
// Workout operations
// ==============================================================================

impl Database {
    /// Store a completed set with all of its records in one transaction
    pub async fn save_completed_workout(&self, workout: &CompletedWorkout) -> WorkoutResult<()> {
        let meta = &workout.metadata;
        let created_at = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO workouts (id, workout_name, started_at, rep_goal, strictness,
                strictness_definition, left_side, series_number, device_id,
                landmarks_of_interest, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meta.id)
        .bind(meta.exercise.as_str())
        .bind(meta.started_at)
        .bind(meta.rep_goal as i64)
        .bind(meta.strictness.as_str())
        .bind(meta.strictness_definition as f64)
        .bind(meta.left_side)
        .bind(meta.series_number as i64)
        .bind(&meta.device_id)
        .bind(serde_json::to_string(&meta.landmarks_of_interest)?)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for record in &workout.analysis {
            sqlx::query(
                "INSERT INTO workout_analysis (workout_id, frame, timestamp_ms, series_number,
                    rep_count, down, form_issues, angles, landmarks_of_interest)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&meta.id)
            .bind(record.frame as i64)
            .bind(record.timestamp_ms)
            .bind(record.series_number as i64)
            .bind(record.rep_count as i64)
            .bind(record.down)
            .bind(&record.form_issues)
            .bind(serde_json::to_string(&record.angles)?)
            .bind(serde_json::to_string(&record.landmarks_of_interest)?)
            .execute(&mut *tx)
            .await?;
        }

        for record in &workout.raw_landmarks {
            sqlx::query(
                "INSERT INTO raw_landmarks (workout_id, frame, timestamp_ms, coordinates)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&meta.id)
            .bind(record.frame as i64)
            .bind(record.timestamp_ms)
            .bind(serde_json::to_string(&record.coordinates)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            workout_id = %meta.id,
            frames = workout.analysis.len(),
            "saved completed workout"
        );
        Ok(())
    }

    pub async fn get_workout(&self, id: &str) -> WorkoutResult<Option<WorkoutMetadata>> {
        let row = sqlx::query_as::<_, WorkoutRow>("SELECT * FROM workouts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WorkoutRow::into_metadata).transpose()
    }

    /// All stored sets, most recent first
    pub async fn list_workouts(&self) -> WorkoutResult<Vec<WorkoutMetadata>> {
        let rows = sqlx::query_as::<_, WorkoutRow>(
            "SELECT * FROM workouts ORDER BY started_at DESC, series_number DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkoutRow::into_metadata).collect()
    }

    pub async fn get_analysis(&self, workout_id: &str) -> WorkoutResult<Vec<AnalysisRecord>> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            "SELECT frame, timestamp_ms, series_number, rep_count, down, form_issues,
                    angles, landmarks_of_interest
             FROM workout_analysis WHERE workout_id = ? ORDER BY frame",
        )
        .bind(workout_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AnalysisRow::into_record).collect()
    }

    pub async fn get_raw_landmarks(
        &self,
        workout_id: &str,
    ) -> WorkoutResult<Vec<RawLandmarkRecord>> {
        let rows = sqlx::query_as::<_, RawLandmarkRow>(
            "SELECT frame, timestamp_ms, coordinates
             FROM raw_landmarks WHERE workout_id = ? ORDER BY frame",
        )
        .bind(workout_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(RawLandmarkRecord {
                    frame: row.frame as u64,
                    timestamp_ms: row.timestamp_ms,
                    coordinates: serde_json::from_str(&row.coordinates)?,
                })
            })
            .collect()
    }

    /// Delete a set and its records; returns whether it existed
    pub async fn delete_workout(&self, id: &str) -> WorkoutResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM workout_analysis WHERE workout_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM raw_landmarks WHERE workout_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM workouts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WorkoutStore for Database {
    async fn save_completed_workout(&self, workout: &CompletedWorkout) -> WorkoutResult<()> {
        Database::save_completed_workout(self, workout).await
    }
}
