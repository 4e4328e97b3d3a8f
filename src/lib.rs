pub mod core;
pub mod models;

pub use crate::core::config::Config;
pub use crate::core::database::{Database, WorkoutStore};
pub use crate::core::gym_buddy::GymBuddy;
pub use crate::core::metrics::SessionMetrics;
pub use crate::core::tracker::{HistoryEntry, WorkoutTracker};
pub use crate::models::pose::{Landmark, Side};
pub use crate::models::workout::{
    CompletedWorkout, ExerciseKind, FrameResult, FrameStatus, SessionStatus, Strictness,
    WorkoutError, WorkoutResult,
};
