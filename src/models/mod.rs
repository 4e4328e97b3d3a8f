// Data models for pose landmarks, workout sessions, and persisted records

pub mod pose;
pub mod workout;
