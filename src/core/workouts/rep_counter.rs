use crate::models::workout::Phase;

/// Two-threshold hysteresis on an exercise's primary joint angle
///
/// Entering `Down` needs `angle <= down_threshold`; leaving it needs
/// `angle >= up_threshold`. Angles in between never change the phase.
/// A completed rep is credited only if every form check made at the bottom
/// of the rep (down phase, angle at or below `down_threshold`) passed.
#[derive(Debug, Clone, PartialEq)]
pub struct RepCounter {
    down_threshold: f32,
    up_threshold: f32,
    phase: Phase,
    bottom_form_ok: bool,
}

impl RepCounter {
    pub fn new(down_threshold: f32, up_threshold: f32) -> Self {
        debug_assert!(up_threshold > down_threshold);
        Self {
            down_threshold,
            up_threshold,
            phase: Phase::Up,
            bottom_form_ok: true,
        }
    }

    /// Feed one angle sample; returns 1 when a down->up transition is credited
    ///
    /// The transition always completes, but only counts when the bottom of
    /// the rep was performed with good form.
    pub fn advance(&mut self, angle: f32) -> u32 {
        match self.phase {
            Phase::Up if angle <= self.down_threshold => {
                self.phase = Phase::Down;
                self.bottom_form_ok = true;
                0
            }
            Phase::Down if angle >= self.up_threshold => {
                self.phase = Phase::Up;
                if self.bottom_form_ok {
                    1
                } else {
                    tracing::debug!(angle, "rep completed with bad form, not counted");
                    0
                }
            }
            _ => 0,
        }
    }

    /// Record a form check taken with the primary joint at `angle`
    pub fn observe_form(&mut self, angle: f32, form_ok: bool) {
        if self.phase.is_down() && angle <= self.down_threshold {
            self.bottom_form_ok &= form_ok;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn down_threshold(&self) -> f32 {
        self.down_threshold
    }

    pub fn up_threshold(&self) -> f32 {
        self.up_threshold
    }

    /// Between the thresholds, where the phase is held
    pub fn in_dead_zone(&self, angle: f32) -> bool {
        angle > self.down_threshold && angle < self.up_threshold
    }
}
