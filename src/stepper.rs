use nalgebra::{Point3, Vector3};

use crate::track::FreeTrack;

/// Samples the magnetic field at a position. Field sources are opaque to
/// the steppers.
pub trait FieldSampler {
    fn at(&self, pos: &Point3<f64>) -> Vector3<f64>;
}

/// A homogeneous magnetic field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstField {
    pub b: Vector3<f64>,
}

impl ConstField {
    pub fn new(b: Vector3<f64>) -> Self {
        Self { b }
    }
}

impl FieldSampler for ConstField {
    fn at(&self, _pos: &Point3<f64>) -> Vector3<f64> {
        self.b
    }
}

/// Mutable stepping state owned by one propagation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteppingState {
    pub track: FreeTrack,
    pub path_length: f64, // accumulated signed arc length
    pub step_size: f64,   // size of the last step taken
    pub constraint: f64,  // external bound on the next step magnitude
}

impl SteppingState {
    pub fn new(track: FreeTrack) -> Self {
        Self {
            track,
            path_length: 0.0,
            step_size: 0.0,
            constraint: f64::INFINITY,
        }
    }

    /// Clamps a proposed step to the external constraint.
    fn clamp(&self, proposed: f64) -> (f64, StepOutcome) {
        if proposed.abs() > self.constraint {
            (self.constraint.copysign(proposed), StepOutcome::Constrained)
        } else {
            (proposed, StepOutcome::ToTarget)
        }
    }
}

/// Whether a step landed on the proposed target or was clipped short by a
/// constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    ToTarget,
    Constrained,
}

/// Advances a track state by a controlled path length.
///
/// The stepper consumes from the navigator only the proposed step size (the
/// distance to the next candidate); the navigator consumes from the stepper
/// only the updated track.
pub trait Stepper {
    fn step(&self, stepping: &mut SteppingState, proposed: f64) -> StepOutcome;
}

/// Straight-line stepper for field-free propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineStepper;

impl Stepper for LineStepper {
    fn step(&self, stepping: &mut SteppingState, proposed: f64) -> StepOutcome {
        let (h, outcome) = stepping.clamp(proposed);
        stepping.track.pos += h * stepping.track.dir;
        stepping.path_length += h;
        stepping.step_size = h;
        outcome
    }
}

/// Runge-Kutta-Nystrom 4th order stepper in a magnetic field.
///
/// Integrates dt/ds = (q/p) t x B with field samples at the start, middle
/// and end of the step. Momentum magnitude is conserved.
#[derive(Debug, Clone, Copy)]
pub struct RkStepper<F: FieldSampler> {
    pub field: F,
}

impl<F: FieldSampler> RkStepper<F> {
    pub fn new(field: F) -> Self {
        Self { field }
    }
}

impl<F: FieldSampler> Stepper for RkStepper<F> {
    fn step(&self, stepping: &mut SteppingState, proposed: f64) -> StepOutcome {
        let (h, outcome) = stepping.clamp(proposed);
        let track = &mut stepping.track;
        let qop = track.qop;
        let (pos, dir) = (track.pos, track.dir);

        let b_first = self.field.at(&pos);
        let k1 = qop * dir.cross(&b_first);

        let mid = pos + 0.5 * h * dir + 0.125 * h * h * k1;
        let b_middle = self.field.at(&mid);
        let k2 = qop * (dir + 0.5 * h * k1).cross(&b_middle);
        let k3 = qop * (dir + 0.5 * h * k2).cross(&b_middle);

        let end = pos + h * dir + 0.5 * h * h * k3;
        let b_last = self.field.at(&end);
        let k4 = qop * (dir + h * k3).cross(&b_last);

        track.pos = pos + h * dir + h * h / 6.0 * (k1 + k2 + k3);
        track.dir = (dir + h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4)).normalize();

        stepping.path_length += h;
        stepping.step_size = h;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{GEV, TESLA};
    use crate::track::Helix;
    use approx::assert_relative_eq;

    #[test]
    fn line_stepper_advances_along_the_direction() {
        let track = FreeTrack::new(Point3::origin(), 0.0, Vector3::new(0.0, 3.0, 4.0), 1.0);
        let mut stepping = SteppingState::new(track);
        let outcome = LineStepper.step(&mut stepping, 10.0);
        assert_eq!(outcome, StepOutcome::ToTarget);
        assert_relative_eq!(stepping.track.pos.y, 6.0, epsilon = 1e-12);
        assert_relative_eq!(stepping.track.pos.z, 8.0, epsilon = 1e-12);
        assert_eq!(stepping.path_length, 10.0);
    }

    #[test]
    fn constraint_clips_the_step() {
        let track = FreeTrack::new(Point3::origin(), 0.0, Vector3::z(), 1.0);
        let mut stepping = SteppingState::new(track);
        stepping.constraint = 2.5;
        let outcome = LineStepper.step(&mut stepping, 10.0);
        assert_eq!(outcome, StepOutcome::Constrained);
        assert_relative_eq!(stepping.track.pos.z, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn rk_stepper_follows_the_helix() {
        let track = FreeTrack::new(
            Point3::origin(),
            0.0,
            Vector3::new(1.0, 0.0, 1.0) * GEV,
            -1.0,
        );
        let b = Vector3::new(0.0, 0.0, 1.0 * TESLA);
        let helix = Helix::new(&track, &b);
        let stepper = RkStepper::new(ConstField::new(b));

        let mut stepping = SteppingState::new(track);
        let n_steps = 100;
        let h = 10.0;
        for _ in 0..n_steps {
            stepper.step(&mut stepping, h);
        }
        let s = n_steps as f64 * h;
        let reference = helix.pos_at(s);
        assert_relative_eq!(stepping.track.pos, reference, epsilon = 1e-4);
        assert_relative_eq!(stepping.track.dir, helix.dir_at(s), epsilon = 1e-6);
        assert_relative_eq!(stepping.track.dir.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rk_stepper_without_field_is_straight() {
        let track = FreeTrack::new(Point3::origin(), 0.0, Vector3::new(1.0, 2.0, 2.0), 1.0);
        let stepper = RkStepper::new(ConstField::new(Vector3::zeros()));
        let mut stepping = SteppingState::new(track);
        stepper.step(&mut stepping, 9.0);
        assert_relative_eq!(
            stepping.track.pos,
            Point3::new(3.0, 6.0, 6.0),
            epsilon = 1e-12
        );
    }
}
