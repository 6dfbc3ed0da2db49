use crate::geometry::Detector;
use crate::navigator::{Inspector, NavState, NoopInspector};
use crate::settings::Settings;
use crate::stepper::{StepOutcome, Stepper, SteppingState};
use crate::track::FreeTrack;

/// Side channel for aborters and other observers of the propagation flow.
///
/// Actors run once after navigation init and once after every step. They
/// may constrain the next step size and lower the navigation trust level,
/// but can never raise it.
pub trait Actor {
    fn act<I: Inspector>(
        &mut self,
        stepping: &mut SteppingState,
        navigation: &mut NavState<'_, I>,
    );
}

impl Actor for () {
    fn act<I: Inspector>(&mut self, _: &mut SteppingState, _: &mut NavState<'_, I>) {}
}

impl<A: Actor, B: Actor> Actor for (A, B) {
    fn act<I: Inspector>(
        &mut self,
        stepping: &mut SteppingState,
        navigation: &mut NavState<'_, I>,
    ) {
        self.0.act(stepping, navigation);
        self.1.act(stepping, navigation);
    }
}

/// Aborts the propagation once the accumulated path length exceeds a limit,
/// and constrains the step size on the way there.
#[derive(Debug, Clone, Copy)]
pub struct PathLimitAborter {
    pub limit: f64,
}

impl PathLimitAborter {
    pub fn new(limit: f64) -> Self {
        Self { limit }
    }
}

impl Actor for PathLimitAborter {
    fn act<I: Inspector>(
        &mut self,
        stepping: &mut SteppingState,
        navigation: &mut NavState<'_, I>,
    ) {
        let remaining = self.limit - stepping.path_length.abs();
        if remaining <= 0.0 {
            navigation.abort();
        } else {
            stepping.constraint = stepping.constraint.min(remaining);
        }
    }
}

/// The per-track states threaded through one propagation, returned for
/// inspection when the flow terminates.
pub struct Propagation<'d, I: Inspector = NoopInspector> {
    pub stepping: SteppingState,
    pub navigation: NavState<'d, I>,
}

/// Drives the stepper -> navigator -> actors loop until the navigation
/// heartbeat stops.
#[derive(Debug, Clone, Copy)]
pub struct Propagator<S: Stepper> {
    pub stepper: S,
}

impl<S: Stepper> Propagator<S> {
    pub fn new(stepper: S) -> Self {
        Self { stepper }
    }

    /// Propagates a track through the detector, starting in `start_volume`.
    pub fn propagate<'d, I: Inspector, A: Actor>(
        &self,
        track: FreeTrack,
        detector: &'d Detector,
        start_volume: u32,
        cfg: &Settings,
        inspector: I,
        actors: &mut A,
    ) -> Propagation<'d, I> {
        let mut navigation = NavState::with_inspector(detector, inspector);
        navigation.set_volume(start_volume);
        let mut stepping = SteppingState::new(track);

        let mut heartbeat = navigation.init(&stepping.track, cfg);
        actors.act(&mut stepping, &mut navigation);
        heartbeat &= navigation.heartbeat();

        while heartbeat {
            let proposed = navigation.distance_to_next();
            match self.stepper.step(&mut stepping, proposed) {
                // the step landed on the target surface, only its own
                // record may have drifted
                StepOutcome::ToTarget => navigation.set_high_trust(),
                // the step was clipped short, all distances are stale
                StepOutcome::Constrained => navigation.set_fair_trust(),
            }
            heartbeat = navigation.update(&stepping.track, cfg);
            actors.act(&mut stepping, &mut navigation);
            heartbeat = heartbeat && navigation.heartbeat();
        }

        Propagation {
            stepping,
            navigation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::NavStatus;
    use crate::stepper::LineStepper;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn pathlimit_constrains_then_aborts() {
        let det = crate::detectors::telescope(&[0.0, 10.0, 20.0, 30.0], 20.0, 0.2);
        let cfg = Settings::default();
        let track = FreeTrack::new(Point3::origin(), 0.0, Vector3::z(), -1.0);

        let propagator = Propagator::new(LineStepper);
        let mut aborter = PathLimitAborter::new(15.0);
        let result = propagator.propagate(track, &det, 0, &cfg, NoopInspector, &mut aborter);

        assert_eq!(result.navigation.status(), NavStatus::Abort);
        assert!(!result.navigation.heartbeat());
        // the track was stopped at the limit, between the second and the
        // third plane
        assert!(result.stepping.path_length <= 15.0 + 1e-9);
        assert!(result.stepping.track.pos.z < 20.0);
    }

    #[test]
    fn unlimited_propagation_completes() {
        let det = crate::detectors::telescope(&[0.0, 10.0, 20.0], 20.0, 0.2);
        let cfg = Settings::default();
        let track = FreeTrack::new(Point3::origin(), 0.0, Vector3::z(), -1.0);

        let propagator = Propagator::new(LineStepper);
        let result =
            propagator.propagate(track, &det, 0, &cfg, NoopInspector, &mut ());
        assert!(result.navigation.is_complete());
    }
}
