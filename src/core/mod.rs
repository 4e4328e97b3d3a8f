pub mod config;
pub mod database;
pub mod geometry;
pub mod metrics;
pub mod orientation;

// Rep counting and the per-set state machine
pub mod workouts;
pub mod gym_buddy;

// Async service over the driver
pub mod tracker;
