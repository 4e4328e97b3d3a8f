use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::workout::{ExerciseKind, Strictness, WorkoutError, WorkoutResult};

/// Upper bound the mobile client accepts for a set
const MAX_GOAL_REPS_LIMIT: u32 = 100;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Exercise selected when a session opens
    pub default_exercise: ExerciseKind,
    /// Form tolerance selected when a session opens
    pub default_strictness: Strictness,
    /// Rep goal used until the client sets one
    pub default_goal_reps: u32,
    /// Largest rep goal a client may request
    pub max_goal_reps: u32,
    /// Frames kept before the first good-form frame when summarising a set
    pub warmup_backtrack_frames: u64,
    /// SQLite file for completed sets
    pub database_path: PathBuf,
    /// Archive every frame's landmark coordinates alongside the analysis
    pub persist_raw_landmarks: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut database_path = Self::data_dir();
        database_path.push("database");
        database_path.push("gymbuddy.db");

        Self {
            default_exercise: ExerciseKind::PushUps,
            default_strictness: Strictness::Moderate,
            default_goal_reps: 10,
            max_goal_reps: MAX_GOAL_REPS_LIMIT,
            warmup_backtrack_frames: 10,
            database_path,
            persist_raw_landmarks: true,
        }
    }
}

impl Config {
    /// Load configuration from file, creating with defaults if it doesn't exist
    pub fn load() -> WorkoutResult<Self> {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> WorkoutResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> WorkoutResult<()> {
        self.save_to(&Self::get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> WorkoutResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        tracing::debug!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> WorkoutResult<()> {
        if self.max_goal_reps == 0 || self.max_goal_reps > MAX_GOAL_REPS_LIMIT {
            return Err(WorkoutError::InvalidConfig(format!(
                "Invalid max goal reps: {}. Must be between 1 and {}",
                self.max_goal_reps, MAX_GOAL_REPS_LIMIT
            )));
        }

        if self.default_goal_reps == 0 || self.default_goal_reps > self.max_goal_reps {
            return Err(WorkoutError::InvalidConfig(format!(
                "Invalid default goal reps: {}. Must be between 1 and {}",
                self.default_goal_reps, self.max_goal_reps
            )));
        }

        if self.warmup_backtrack_frames > 300 {
            return Err(WorkoutError::InvalidConfig(format!(
                "Invalid warmup backtrack: {} frames. Must be at most 300",
                self.warmup_backtrack_frames
            )));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(WorkoutError::InvalidConfig(
                "Database path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> WorkoutResult<Self> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    fn data_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        let mut path = PathBuf::from(home);
        path.push(".gymbuddy");
        path
    }

    /// Get the configuration file path
    fn get_config_path() -> PathBuf {
        let mut path = Self::data_dir();
        path.push("config");
        path.push("settings.json");
        path
    }
}
