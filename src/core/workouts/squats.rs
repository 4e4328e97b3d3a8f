use std::collections::BTreeMap;

use super::{point, WorkoutState};
use crate::core::geometry::{compute_angle, horizontal_offset};
use crate::models::pose::{BodyLandmark, Landmark, Side};
use crate::models::workout::{DisplayAngle, FormCheck, Strictness, WorkoutResult};

/// Max normalized x distance for two joints to count as stacked
const ALIGNMENT_TOLERANCE: f32 = 0.05;
/// Hip angle window while rising through the dead zone, before strictness
const MID_HIP_MIN: f32 = 45.0;
const MID_HIP_MAX: f32 = 90.0;

/// Squats: knee angle drives reps, joint stacking and hip hinge drive form
#[derive(Debug, Clone, PartialEq)]
pub struct Squats {
    pub(super) state: WorkoutState,
    shoulder: usize,
    hip: usize,
    knee: usize,
    ankle: usize,
    toe: usize,
}

impl Squats {
    pub fn new(strictness: Strictness) -> Self {
        let mut workout = Self {
            state: WorkoutState::new(strictness),
            shoulder: 0,
            hip: 0,
            knee: 0,
            ankle: 0,
            toe: 0,
        };
        workout.update_indices(Side::default());
        workout
    }

    pub fn update_indices(&mut self, side: Side) {
        use BodyLandmark::*;
        self.state.side = side;
        self.shoulder = side.pick(LeftShoulder, RightShoulder);
        self.hip = side.pick(LeftHip, RightHip);
        self.knee = side.pick(LeftKnee, RightKnee);
        self.ankle = side.pick(LeftAnkle, RightAnkle);
        self.toe = side.pick(LeftFootIndex, RightFootIndex);
    }

    pub fn count_reps(&mut self, frame: &[Landmark]) -> WorkoutResult<u32> {
        let angle = compute_angle(
            point(frame, self.ankle)?,
            point(frame, self.knee)?,
            point(frame, self.hip)?,
        )?;
        self.state.angles.insert("knee", angle);
        Ok(self.state.counter.advance(angle))
    }

    pub(super) fn primary_angle(&self) -> Option<f32> {
        self.state.angles.get("knee").copied()
    }

    /// Standing: knees over ankles and, once extended, a straight hip.
    /// Descended: knees over toes and, while rising, a hip angle inside
    /// the mid-squat window. Shoulders stay over the ankles throughout.
    pub(super) fn check_form(&mut self, frame: &[Landmark]) -> WorkoutResult<FormCheck> {
        let shoulder = point(frame, self.shoulder)?;
        let hip = point(frame, self.hip)?;
        let knee = point(frame, self.knee)?;
        let ankle = point(frame, self.ankle)?;
        let toe = point(frame, self.toe)?;

        let knee_angle = compute_angle(ankle, knee, hip)?;
        let hip_angle = compute_angle(shoulder, hip, knee)?;
        self.state.angles.insert("knee", knee_angle);
        self.state.angles.insert("hip", hip_angle);

        let deviation = self.state.strictness.deviation_degrees();
        let counter = &self.state.counter;
        let mut issues = Vec::new();

        if counter.phase().is_down() {
            if horizontal_offset(knee, toe) > ALIGNMENT_TOLERANCE {
                issues.push("knees not aligned with toes");
            }
            let window = (MID_HIP_MIN - deviation)..(MID_HIP_MAX + deviation);
            if counter.in_dead_zone(knee_angle) && !window.contains(&hip_angle) {
                issues.push("hips not bent enough");
            }
        } else {
            if horizontal_offset(knee, ankle) > ALIGNMENT_TOLERANCE {
                issues.push("knees not aligned with ankles");
            }
            if knee_angle > counter.up_threshold() && 180.0 - hip_angle > deviation {
                issues.push("back not straight");
            }
        }

        if horizontal_offset(shoulder, ankle) >= ALIGNMENT_TOLERANCE {
            issues.push("shoulders not over ankles");
        }

        Ok(FormCheck::from_issues(issues))
    }

    pub(super) fn display_angles(&self) -> Vec<DisplayAngle> {
        self.state.display_angles(&[
            ("knee", [self.ankle, self.knee, self.hip]),
            ("hip", [self.shoulder, self.hip, self.knee]),
        ])
    }

    pub(super) fn indices(&self) -> BTreeMap<String, usize> {
        [
            ("shoulder", self.shoulder),
            ("hip", self.hip),
            ("knee", self.knee),
            ("ankle", self.ankle),
            ("toe", self.toe),
        ]
        .into_iter()
        .map(|(name, idx)| (name.to_string(), idx))
        .collect()
    }
}
