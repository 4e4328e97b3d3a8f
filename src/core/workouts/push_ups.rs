use std::collections::BTreeMap;

use super::{point, WorkoutState};
use crate::core::geometry::compute_angle;
use crate::models::pose::{BodyLandmark, Landmark, Side};
use crate::models::workout::{DisplayAngle, FormCheck, Strictness, WorkoutResult};

/// Elbow angle at or below which shoulders may drift off the wrists
const BENT_ARM_TOLERANCE: f32 = 165.0;
/// Extra slack on top of the strictness deviation for the body line
const BODY_LINE_MARGIN: f32 = 5.0;

/// Push-ups: elbow angle drives reps, body line and knees drive form
#[derive(Debug, Clone, PartialEq)]
pub struct PushUps {
    pub(super) state: WorkoutState,
    shoulder: usize,
    elbow: usize,
    wrist: usize,
    hip: usize,
    knee: usize,
    ankle: usize,
    toe: usize,
}

impl PushUps {
    pub fn new(strictness: Strictness) -> Self {
        let mut workout = Self {
            state: WorkoutState::new(strictness),
            shoulder: 0,
            elbow: 0,
            wrist: 0,
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
        self.elbow = side.pick(LeftElbow, RightElbow);
        self.wrist = side.pick(LeftWrist, RightWrist);
        self.hip = side.pick(LeftHip, RightHip);
        self.knee = side.pick(LeftKnee, RightKnee);
        self.ankle = side.pick(LeftAnkle, RightAnkle);
        self.toe = side.pick(LeftFootIndex, RightFootIndex);
    }

    pub fn count_reps(&mut self, frame: &[Landmark]) -> WorkoutResult<u32> {
        let angle = compute_angle(
            point(frame, self.wrist)?,
            point(frame, self.elbow)?,
            point(frame, self.shoulder)?,
        )?;
        self.state.angles.insert("elbow", angle);
        Ok(self.state.counter.advance(angle))
    }

    pub(super) fn primary_angle(&self) -> Option<f32> {
        self.state.angles.get("elbow").copied()
    }

    /// Rules, all required:
    /// 1. shoulders over wrists (to one decimal of x), unless the arms are bent
    /// 2. shoulder-hip-ankle line within the strictness deviation of straight
    /// 3. knees higher than both wrists and toes
    pub(super) fn check_form(&mut self, frame: &[Landmark]) -> WorkoutResult<FormCheck> {
        let shoulder = point(frame, self.shoulder)?;
        let elbow = point(frame, self.elbow)?;
        let wrist = point(frame, self.wrist)?;
        let hip = point(frame, self.hip)?;
        let knee = point(frame, self.knee)?;
        let ankle = point(frame, self.ankle)?;
        let toe = point(frame, self.toe)?;

        let elbow_angle = compute_angle(wrist, elbow, shoulder)?;
        let body_angle = compute_angle(shoulder, hip, ankle)?;
        self.state.angles.insert("elbow", elbow_angle);
        self.state.angles.insert("body", body_angle);

        let mut issues = Vec::new();

        let shoulders_over_wrists = (wrist.x * 10.0).round() == (shoulder.x * 10.0).round();
        if !shoulders_over_wrists && elbow_angle > BENT_ARM_TOLERANCE {
            issues.push("shoulders not above wrists");
        }

        let allowed = self.state.strictness.deviation_degrees() + BODY_LINE_MARGIN;
        if 180.0 - body_angle > allowed {
            issues.push("hips not in line with body");
        }

        // y grows downwards
        if !(knee.y < wrist.y && knee.y < toe.y) {
            issues.push("knees on floor");
        }

        Ok(FormCheck::from_issues(issues))
    }

    pub(super) fn display_angles(&self) -> Vec<DisplayAngle> {
        self.state.display_angles(&[
            ("elbow", [self.wrist, self.elbow, self.shoulder]),
            ("body", [self.shoulder, self.hip, self.ankle]),
        ])
    }

    pub(super) fn indices(&self) -> BTreeMap<String, usize> {
        [
            ("shoulder", self.shoulder),
            ("elbow", self.elbow),
            ("wrist", self.wrist),
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
