//! Per-exercise repetition counting and form evaluation
//!
//! Every exercise shares the same shape: landmark indices chosen from the
//! resolved [`Side`], a [`RepCounter`] over one primary joint angle, and a set
//! of posture rules that produce a [`FormCheck`]. [`Workout`] is the closed set
//! of supported exercises, selected by [`ExerciseKind`].

mod push_ups;
mod rep_counter;
mod squats;

pub use push_ups::PushUps;
pub use rep_counter::RepCounter;
pub use squats::Squats;

use std::collections::BTreeMap;

use crate::models::pose::{landmark_at, Landmark, Side};
use crate::models::workout::{
    DisplayAngle, ExerciseKind, FormCheck, Phase, Strictness, WorkoutResult, GOOD_FORM,
};

/// Both exercises enter the down phase at 90° and close the rep at 150°
pub const DOWN_THRESHOLD: f32 = 90.0;
pub const UP_THRESHOLD: f32 = 150.0;

/// State common to every exercise
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutState {
    pub side: Side,
    pub strictness: Strictness,
    pub counter: RepCounter,
    pub angles: BTreeMap<&'static str, f32>,
    pub form: bool,
    pub fix_form: String,
}

impl WorkoutState {
    fn new(strictness: Strictness) -> Self {
        Self {
            side: Side::default(),
            strictness,
            counter: RepCounter::new(DOWN_THRESHOLD, UP_THRESHOLD),
            angles: BTreeMap::new(),
            form: false,
            fix_form: String::new(),
        }
    }

    /// Store the check and feed it to the counter along with the primary angle
    fn apply_form(&mut self, check: FormCheck, primary_angle: Option<f32>) -> bool {
        if let Some(angle) = primary_angle {
            self.counter.observe_form(angle, check.ok);
        }
        self.form = check.ok;
        self.fix_form = check.message;
        self.form
    }

    /// Overlay entries for whichever named angles have been computed
    fn display_angles(&self, joints: &[(&'static str, [usize; 3])]) -> Vec<DisplayAngle> {
        joints
            .iter()
            .filter_map(|(name, joint_indices)| {
                self.angles.get(name).map(|value| DisplayAngle {
                    name: name.to_string(),
                    value: *value,
                    joint_indices: *joint_indices,
                })
            })
            .collect()
    }
}

/// Fetch and validate the landmark at `index`
pub(crate) fn point(frame: &[Landmark], index: usize) -> WorkoutResult<&Landmark> {
    let lm = landmark_at(frame, index)?;
    lm.validate(index)?;
    Ok(lm)
}

/// The supported exercises
#[derive(Debug, Clone, PartialEq)]
pub enum Workout {
    PushUps(PushUps),
    Squats(Squats),
}

impl Workout {
    pub fn new(kind: ExerciseKind, strictness: Strictness) -> Self {
        match kind {
            ExerciseKind::PushUps => Workout::PushUps(PushUps::new(strictness)),
            ExerciseKind::Squats => Workout::Squats(Squats::new(strictness)),
        }
    }

    pub fn kind(&self) -> ExerciseKind {
        match self {
            Workout::PushUps(_) => ExerciseKind::PushUps,
            Workout::Squats(_) => ExerciseKind::Squats,
        }
    }

    fn state(&self) -> &WorkoutState {
        match self {
            Workout::PushUps(w) => &w.state,
            Workout::Squats(w) => &w.state,
        }
    }

    fn state_mut(&mut self) -> &mut WorkoutState {
        match self {
            Workout::PushUps(w) => &mut w.state,
            Workout::Squats(w) => &mut w.state,
        }
    }

    /// Fix the landmark indices for the resolved side
    pub fn update_indices(&mut self, side: Side) {
        match self {
            Workout::PushUps(w) => w.update_indices(side),
            Workout::Squats(w) => w.update_indices(side),
        }
    }

    /// Returns 1 when this frame closes a rep whose bottom was performed
    /// with good form
    pub fn count_reps(&mut self, frame: &[Landmark]) -> WorkoutResult<u32> {
        match self {
            Workout::PushUps(w) => w.count_reps(frame),
            Workout::Squats(w) => w.count_reps(frame),
        }
    }

    /// Evaluate posture rules, updating `form` and `fix_form`
    pub fn get_form(&mut self, frame: &[Landmark]) -> WorkoutResult<bool> {
        let (check, primary_angle) = match self {
            Workout::PushUps(w) => (w.check_form(frame)?, w.primary_angle()),
            Workout::Squats(w) => (w.check_form(frame)?, w.primary_angle()),
        };
        Ok(self.state_mut().apply_form(check, primary_angle))
    }

    pub fn get_display_angles(&self) -> Vec<DisplayAngle> {
        match self {
            Workout::PushUps(w) => w.display_angles(),
            Workout::Squats(w) => w.display_angles(),
        }
    }

    /// Semantic joint name to landmark index
    pub fn get_indices(&self) -> BTreeMap<String, usize> {
        match self {
            Workout::PushUps(w) => w.indices(),
            Workout::Squats(w) => w.indices(),
        }
    }

    pub fn set_strictness(&mut self, strictness: Strictness) {
        self.state_mut().strictness = strictness;
    }

    pub fn strictness(&self) -> Strictness {
        self.state().strictness
    }

    pub fn side(&self) -> Side {
        self.state().side
    }

    pub fn phase(&self) -> Phase {
        self.state().counter.phase()
    }

    pub fn form(&self) -> bool {
        self.state().form
    }

    /// Issue summary from the last form check, `GOOD_FORM` when none
    pub fn fix_form(&self) -> &str {
        let fix_form = &self.state().fix_form;
        if fix_form.is_empty() && self.state().form {
            GOOD_FORM
        } else {
            fix_form
        }
    }

    pub fn angles(&self) -> &BTreeMap<&'static str, f32> {
        &self.state().angles
    }
}
