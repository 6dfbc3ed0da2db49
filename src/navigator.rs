use crate::geometry::{AccelLink, Barcode, Detector, SurfaceDesc, INVALID_LINK};
use crate::intersect::Candidate;
use crate::kernel;
use crate::settings::{Settings, CANDIDATE_RESERVE};
use crate::track::{FreeTrack, Ray};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{SurfaceKind, Transform3, Volume};
    use crate::mask::Mask;
    use nalgebra::{Point3, Vector3};

    /// Single volume with plane modules at the given z positions and two
    /// exit portals just beyond the first and last plane.
    fn plane_stack(positions: &[f64], envelope: f64) -> Detector {
        let mut det = Detector::default();
        let n = positions.len() as u32;

        for (i, &z) in positions.iter().enumerate() {
            det.transforms.push(Transform3::translation(0.0, 0.0, z));
            det.masks.push(Mask::Rectangle {
                half_x: 20.0,
                half_y: 20.0,
                volume_link: 0,
            });
            det.surfaces.push(SurfaceDesc {
                barcode: Barcode::new(0, SurfaceKind::Sensitive, i as u32)
                    .with_transform(i as u32),
                transform: i as u32,
                mask: i as u32,
                material: None,
            });
        }
        let z_lo = positions.first().unwrap() - envelope;
        let z_hi = positions.last().unwrap() + envelope;
        for (k, z) in [z_hi, z_lo].into_iter().enumerate() {
            let idx = n + k as u32;
            det.transforms.push(Transform3::translation(0.0, 0.0, z));
            det.masks.push(Mask::Rectangle {
                half_x: f64::INFINITY,
                half_y: f64::INFINITY,
                volume_link: INVALID_LINK,
            });
            det.surfaces.push(SurfaceDesc {
                barcode: Barcode::new(0, SurfaceKind::Portal, idx).with_transform(idx),
                transform: idx,
                mask: idx,
                material: None,
            });
        }
        det.volumes.push(Volume {
            index: 0,
            transform: 0,
            portals: n..n + 2,
            sensitives: 0..n,
            passives: 0..0,
            accel: AccelLink::BruteForce,
        });
        det
    }

    fn start_track() -> FreeTrack {
        FreeTrack::new(Point3::new(0.0, 0.0, 5.0), 0.0, Vector3::z(), -1.0)
    }

    #[test]
    fn init_fills_a_sorted_reachable_cache() {
        let det = plane_stack(&[0.0, 10.0, 20.0, 30.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);

        let heartbeat = nav.init(&start_track(), &cfg);
        assert!(heartbeat);
        assert_eq!(nav.status(), NavStatus::TowardsObject);
        assert_eq!(nav.trust_level(), TrustLevel::Full);

        // plane at z = 0 is behind the track, the three ahead plus the
        // forward portal are cached in ascending path order
        let paths: Vec<f64> = nav.candidates().iter().map(|c| c.path).collect();
        assert_eq!(paths.len(), 4);
        assert!(paths.windows(2).all(|w| w[0] < w[1]));
        for c in nav.candidates() {
            assert!(c.is_reachable(cfg.overstep_tolerance));
        }
        assert_eq!(nav.distance_to_next(), 5.0);
    }

    #[test]
    fn init_on_a_surface_reports_on_module_without_stepping() {
        let det = plane_stack(&[0.0, 10.0, 20.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);

        let track = FreeTrack::new(Point3::origin(), 0.0, Vector3::z(), -1.0);
        assert!(nav.init(&track, &cfg));
        assert!(nav.is_on_module());
        assert!(nav.is_on_sensitive());
        assert_eq!(nav.barcode(), det.surfaces[0].barcode);
        assert_eq!(nav.trust_level(), TrustLevel::Full);
    }

    #[test]
    fn trust_setters_only_lower() {
        let det = plane_stack(&[0.0, 10.0], 0.2);
        let mut nav = NavState::new(&det);
        nav.init(&start_track(), &Settings::default());
        assert_eq!(nav.trust_level(), TrustLevel::Full);

        nav.set_full_trust();
        assert_eq!(nav.trust_level(), TrustLevel::Full);
        nav.set_high_trust();
        assert_eq!(nav.trust_level(), TrustLevel::High);
        // raising again has no effect
        nav.set_full_trust();
        assert_eq!(nav.trust_level(), TrustLevel::High);
        nav.set_fair_trust();
        assert_eq!(nav.trust_level(), TrustLevel::Fair);
        nav.set_high_trust();
        assert_eq!(nav.trust_level(), TrustLevel::Fair);
        nav.set_no_trust();
        assert_eq!(nav.trust_level(), TrustLevel::NoTrust);
    }

    #[test]
    fn update_at_full_trust_is_a_no_op() {
        let det = plane_stack(&[0.0, 10.0, 20.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);
        let track = start_track();
        nav.init(&track, &cfg);

        let before = nav.clone();
        assert!(nav.update(&track, &cfg));
        assert_eq!(nav.candidates_all(), before.candidates_all());
        assert_eq!(nav.status(), before.status());
        assert_eq!(nav.trust_level(), before.trust_level());
        assert_eq!(nav.volume(), before.volume());
        assert_eq!(nav.distance_to_next(), before.distance_to_next());
    }

    #[test]
    fn repeated_updates_without_stepping_are_stable() {
        let det = plane_stack(&[0.0, 10.0, 20.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);
        let track = start_track();
        nav.init(&track, &cfg);

        nav.set_high_trust();
        assert!(nav.update(&track, &cfg));
        let trust = nav.trust_level();
        let dist = nav.distance_to_next();

        nav.set_high_trust();
        assert!(nav.update(&track, &cfg));
        assert_eq!(nav.trust_level(), trust);
        assert_eq!(nav.distance_to_next(), dist);
    }

    #[test]
    fn high_trust_walks_the_telescope() {
        let det = plane_stack(&[0.0, 10.0, 20.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);
        let mut track = FreeTrack::new(Point3::origin(), 0.0, Vector3::z(), -1.0);
        nav.init(&track, &cfg);
        assert!(nav.is_on_module());

        // step to the next plane
        track.pos += nav.distance_to_next() * track.dir;
        nav.set_high_trust();
        assert!(nav.update(&track, &cfg));
        assert!(nav.is_on_module());
        assert_eq!(nav.barcode(), det.surfaces[1].barcode);

        // and to the last one
        track.pos += nav.distance_to_next() * track.dir;
        nav.set_high_trust();
        assert!(nav.update(&track, &cfg));
        assert!(nav.is_on_module());
        assert_eq!(nav.barcode(), det.surfaces[2].barcode);
    }

    #[test]
    fn leaving_through_a_portal_exits() {
        let det = plane_stack(&[0.0, 10.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);
        let mut track = FreeTrack::new(Point3::new(0.0, 0.0, 5.0), 0.0, Vector3::z(), -1.0);
        nav.init(&track, &cfg);

        // walk until the navigation terminates
        let mut guard = 0;
        loop {
            track.pos += nav.distance_to_next() * track.dir;
            nav.set_high_trust();
            if !nav.update(&track, &cfg) {
                break;
            }
            guard += 1;
            assert!(guard < 10, "navigation failed to terminate");
        }
        assert!(nav.is_complete());
        assert_eq!(nav.status(), NavStatus::OnTarget);
        assert!(nav.candidates_all().is_empty());
    }

    #[test]
    fn abort_keeps_the_cache_for_inspection() {
        let det = plane_stack(&[0.0, 10.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::new(&det);
        nav.init(&start_track(), &cfg);

        assert!(!nav.abort());
        assert_eq!(nav.status(), NavStatus::Abort);
        assert!(!nav.heartbeat());
        assert!(!nav.candidates_all().is_empty());
        assert!(!nav.is_complete());
    }

    #[test]
    fn object_tracer_records_encounters() {
        let det = plane_stack(&[0.0, 10.0, 20.0], 0.2);
        let cfg = Settings::default();
        let mut nav = NavState::with_inspector(&det, ObjectTracer::default());
        let mut track = FreeTrack::new(Point3::origin(), 0.0, Vector3::z(), -1.0);
        nav.init(&track, &cfg);
        loop {
            track.pos += nav.distance_to_next() * track.dir;
            nav.set_high_trust();
            if !nav.update(&track, &cfg) {
                break;
            }
        }
        let trace: Vec<Barcode> = nav.inspector().trace.iter().map(|c| c.sf.barcode).collect();
        assert_eq!(trace.len(), 4);
        for (i, bcd) in trace.iter().enumerate() {
            assert_eq!(*bcd, det.surfaces[i].barcode);
        }
    }
}

/// Status of a navigation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    /// An unrecoverable error occurred, the propagation must stop.
    Abort,
    /// The navigation exited successfully.
    OnTarget,
    /// Not initialized or lost the current target.
    Unknown,
    /// Moving towards the next candidate surface.
    TowardsObject,
    /// Reached a module (sensitive or passive) surface.
    OnModule,
    /// Reached a portal surface.
    OnPortal,
}

/// Freshness of the candidate cache, a bounded lattice with monotone
/// downgrades: `NoTrust < Fair < High < Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrustLevel {
    /// Cache is invalid, the volume must be re-initialized.
    NoTrust = 0,
    /// Distances and order of all cached candidates must be restored.
    Fair = 1,
    /// Only the distance to the current target must be restored.
    High = 3,
    /// The cache exactly reflects the geometry, nothing to do.
    Full = 4,
}

/// Sense of travel with respect to the track momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Forward,
    Backward,
}

impl NavDirection {
    pub fn sign(&self) -> f64 {
        match self {
            NavDirection::Forward => 1.0,
            NavDirection::Backward => -1.0,
        }
    }
}

/// Snapshot of the navigation state handed to inspectors.
pub struct InspectorFrame<'a> {
    pub status: NavStatus,
    pub trust: TrustLevel,
    pub direction: NavDirection,
    pub volume: u32,
    pub candidates: &'a [Candidate],
    pub next: usize,
    pub last: usize,
}

impl InspectorFrame<'_> {
    /// The candidate that was just reached, if any.
    pub fn current(&self) -> Option<&Candidate> {
        (self.next > 0).then(|| &self.candidates[self.next - 1])
    }
}

/// Observation hook into the navigation flow. Called after init, after each
/// update branch and on the terminal transitions.
pub trait Inspector {
    fn inspect(&mut self, frame: &InspectorFrame, message: &str);
}

/// The default inspector: compiles away entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopInspector;

impl Inspector for NoopInspector {
    #[inline]
    fn inspect(&mut self, _frame: &InspectorFrame, _message: &str) {}
}

/// Writes one debug log line per navigation call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInspector;

impl Inspector for LogInspector {
    fn inspect(&mut self, frame: &InspectorFrame, message: &str) {
        log::debug!(
            "{}volume={} status={:?} trust={:?} candidates={} next_path={:?}",
            message,
            frame.volume,
            frame.status,
            frame.trust,
            frame.last.saturating_sub(frame.next),
            (frame.next < frame.last).then(|| frame.candidates[frame.next].path),
        );
    }
}

/// Records every surface encounter for later validation.
#[derive(Debug, Clone, Default)]
pub struct ObjectTracer {
    pub trace: Vec<Candidate>,
}

impl Inspector for ObjectTracer {
    fn inspect(&mut self, frame: &InspectorFrame, _message: &str) {
        if matches!(frame.status, NavStatus::OnModule | NavStatus::OnPortal) {
            if let Some(current) = frame.current() {
                self.trace.push(*current);
            }
        }
    }
}

impl<A: Inspector, B: Inspector> Inspector for (A, B) {
    fn inspect(&mut self, frame: &InspectorFrame, message: &str) {
        self.0.inspect(frame, message);
        self.1.inspect(frame, message);
    }
}

/// Per-track navigation state and engine.
///
/// Keeps a cache of surface candidates for the current volume, with two
/// cursors into it: `next` points at the current target, `last` marks the
/// end of the reachable region. Candidates in `[next, last)` are sorted by
/// ascending path while trust is maintained; candidates before `next` have
/// been consumed. The geometry store is borrowed read-only for the whole
/// propagation.
///
/// The engine has exactly two entry points, [`NavState::init`] and
/// [`NavState::update`], and signals liveness through its heartbeat.
#[derive(Clone)]
pub struct NavState<'d, I: Inspector = NoopInspector> {
    detector: &'d Detector,
    candidates: Vec<Candidate>,
    next: usize,
    last: usize,
    status: NavStatus,
    direction: NavDirection,
    trust: TrustLevel,
    volume: u32,
    heartbeat: bool,
    inspector: I,
}

impl<'d> NavState<'d> {
    pub fn new(detector: &'d Detector) -> Self {
        Self::with_inspector(detector, NoopInspector)
    }
}

impl<'d, I: Inspector> NavState<'d, I> {
    pub fn with_inspector(detector: &'d Detector, inspector: I) -> Self {
        Self {
            detector,
            candidates: Vec::new(),
            next: 0,
            last: 0,
            status: NavStatus::Unknown,
            direction: NavDirection::Forward,
            trust: TrustLevel::NoTrust,
            volume: 0,
            heartbeat: false,
            inspector,
        }
    }

    pub fn detector(&self) -> &'d Detector {
        self.detector
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume;
    }

    pub fn direction(&self) -> NavDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: NavDirection) {
        self.direction = direction;
    }

    pub fn status(&self) -> NavStatus {
        self.status
    }

    pub fn trust_level(&self) -> TrustLevel {
        self.trust
    }

    /// Never downgrades.
    pub fn set_full_trust(&mut self) {
        self.trust = self.trust.min(TrustLevel::Full);
    }

    /// Monotone downgrade from full.
    pub fn set_high_trust(&mut self) {
        self.trust = self.trust.min(TrustLevel::High);
    }

    /// Monotone downgrade from full or high.
    pub fn set_fair_trust(&mut self) {
        self.trust = self.trust.min(TrustLevel::Fair);
    }

    /// Unconditional invalidation.
    pub fn set_no_trust(&mut self) {
        self.trust = TrustLevel::NoTrust;
    }

    pub fn heartbeat(&self) -> bool {
        self.heartbeat
    }

    /// The reachable candidate range `[next, last)` for actor inspection.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates[self.next..self.last]
    }

    /// The whole cache including consumed candidates.
    pub fn candidates_all(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn n_candidates(&self) -> usize {
        self.last - self.next
    }

    /// The candidate that was reached last, if any.
    pub fn current(&self) -> Option<&Candidate> {
        (self.next > 0).then(|| &self.candidates[self.next - 1])
    }

    /// The candidate the navigation is heading for, if any.
    pub fn next_candidate(&self) -> Option<&Candidate> {
        (self.next < self.last).then(|| &self.candidates[self.next])
    }

    /// Distance to the current target, the scalar face of this state.
    pub fn distance_to_next(&self) -> f64 {
        self.next_candidate().map_or(0.0, |c| c.path)
    }

    /// Barcode of the surface that was reached last.
    pub fn barcode(&self) -> Barcode {
        self.current().map_or(Barcode::INVALID, |c| c.sf.barcode)
    }

    /// Descriptor of the surface the navigator is on.
    pub fn get_surface(&self) -> Option<&SurfaceDesc> {
        if self.is_on_module() || self.is_on_portal() {
            self.current().map(|c| &c.sf)
        } else {
            None
        }
    }

    /// Descriptor of the surface the navigator intends to reach.
    pub fn next_surface(&self) -> Option<&SurfaceDesc> {
        self.next_candidate().map(|c| &c.sf)
    }

    pub fn is_on_module(&self) -> bool {
        self.status == NavStatus::OnModule
    }

    pub fn is_on_sensitive(&self) -> bool {
        self.status == NavStatus::OnModule && self.barcode().kind() == crate::geometry::SurfaceKind::Sensitive
    }

    pub fn is_on_portal(&self) -> bool {
        self.status == NavStatus::OnPortal
    }

    pub fn encountered_material(&self) -> bool {
        (self.is_on_module() || self.is_on_portal())
            && self.current().is_some_and(|c| c.sf.material.is_some())
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.last
    }

    /// Whether the navigation finished by leaving the detector.
    pub fn is_complete(&self) -> bool {
        self.status == NavStatus::OnTarget && !self.heartbeat
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    /// Unrecoverable navigation state. The cache is kept for inspection.
    pub fn abort(&mut self) -> bool {
        self.status = NavStatus::Abort;
        self.heartbeat = false;
        // don't do anything if aborted
        self.trust = TrustLevel::Full;
        self.run_inspector("Aborted: ");
        self.heartbeat
    }

    /// The navigation reached its target or left the detector world.
    pub fn exit(&mut self) -> bool {
        self.status = NavStatus::OnTarget;
        self.heartbeat = false;
        self.trust = TrustLevel::Full;
        self.run_inspector("Exited: ");
        self.candidates.clear();
        self.next = 0;
        self.last = 0;
        self.heartbeat
    }

    /// Initializes the cache for the current volume.
    ///
    /// Queries the volume's acceleration structure for nearby surfaces,
    /// intersects every one of them and sorts the reachable candidates by
    /// ascending path. Establishes full trust, or kills the heartbeat when
    /// it cannot.
    pub fn init(&mut self, track: &FreeTrack, cfg: &Settings) -> bool {
        let det = self.detector;
        let volume = det.volume(self.volume);

        self.candidates.clear();
        self.heartbeat = true;
        self.candidates.reserve(CANDIDATE_RESERVE);

        let ray = Ray::from(track);

        // portals are always tested in full
        for idx in volume.portals.clone() {
            kernel::initialize(
                &ray,
                det.surface(idx),
                det,
                cfg.mask_tolerance,
                cfg.overstep_tolerance,
                &mut self.candidates,
            );
        }
        match volume.accel {
            AccelLink::BruteForce => {
                for idx in volume.sensitives.clone().chain(volume.passives.clone()) {
                    kernel::initialize(
                        &ray,
                        det.surface(idx),
                        det,
                        cfg.mask_tolerance,
                        cfg.overstep_tolerance,
                        &mut self.candidates,
                    );
                }
            }
            AccelLink::Grid(grid_idx) => {
                let grid = det.grid(grid_idx);
                let point =
                    grid.project(det.transform(volume.transform), &track.pos, &track.dir);
                for idx in grid.search(point, cfg.search_window) {
                    kernel::initialize(
                        &ray,
                        det.surface(idx),
                        det,
                        cfg.mask_tolerance,
                        cfg.overstep_tolerance,
                        &mut self.candidates,
                    );
                }
            }
        }

        self.candidates
            .sort_unstable_by(|a, b| a.path.total_cmp(&b.path));
        self.next = 0;
        self.last = self.candidates.len();

        self.update_navigation_state(cfg);
        // if init could not establish full trust, the propagation setup is
        // inconsistent
        if self.trust != TrustLevel::Full {
            self.heartbeat = false;
        }
        self.run_inspector("Init complete: ");

        self.heartbeat
    }

    /// Restores full trust to the cache after a step, according to the
    /// current trust level, and performs a volume switch when the track has
    /// stepped onto a portal.
    pub fn update(&mut self, track: &FreeTrack, cfg: &Settings) -> bool {
        self.update_kernel(track, cfg);

        // update was completely successful (most likely case)
        if self.trust == TrustLevel::Full {
            return self.heartbeat;
        }
        // otherwise: did we run into a portal?
        if self.is_on_portal() {
            let link = self.current().map_or(INVALID_LINK, |c| c.volume_link);
            // the track has left the detector world
            if link == INVALID_LINK {
                self.exit();
                return self.heartbeat;
            }
            self.volume = link;
            self.init(track, cfg);
            // fresh initialization after the volume switch, restore trust
            // and heartbeat
            self.trust = TrustLevel::Full;
            self.heartbeat = true;
            return self.heartbeat;
        }
        // no trust could be restored: the local navigation might simply be
        // exhausted, re-initialize the volume
        self.init(track, cfg);
        if self.trust != TrustLevel::Full || self.is_exhausted() {
            self.abort();
        }
        self.heartbeat
    }

    /// Re-evaluates the cached candidates according to the trust level.
    fn update_kernel(&mut self, track: &FreeTrack, cfg: &Settings) {
        // candidates are up to date, nothing left to do
        if self.trust == TrustLevel::Full {
            return;
        }

        let ray = Ray::from(track);

        // update only the current target, the cache is still coherent
        if self.trust == TrustLevel::High {
            let reachable = !self.is_exhausted() && self.update_candidate(self.next, &ray, cfg);
            if !reachable {
                // 'high trust' is broken
                self.status = NavStatus::Unknown;
                self.set_no_trust();
                return;
            }
            self.update_navigation_state(cfg);
            self.run_inspector("Update complete: high trust: ");

            // done if the track has not reached a surface yet, or trust is
            // gone (portal reached or cache broken)
            if self.status == NavStatus::TowardsObject || self.trust == TrustLevel::NoTrust {
                return;
            }

            // the track is on a module: ready the candidate after it
            if !self.is_exhausted() && self.update_candidate(self.next, &ray, cfg) {
                return;
            }
            // the new target is unreachable: escalate instead of returning,
            // falls into the fair trust case below
            self.set_fair_trust();
        }

        // re-evaluate and re-sort every remaining candidate, the cache is
        // stale but the volume is unchanged
        if self.trust == TrustLevel::Fair {
            for i in self.next..self.last {
                if !self.update_candidate(i, &ray, cfg) {
                    // unreachable, park at the end of the sort order
                    self.candidates[i].path = f64::MAX;
                }
            }
            self.candidates[self.next..self.last]
                .sort_unstable_by(|a, b| a.path.total_cmp(&b.path));
            let first_unreachable = self.candidates[self.next..self.last]
                .iter()
                .position(|c| c.path == f64::MAX);
            self.last = first_unreachable.map_or(self.last, |offset| self.next + offset);

            self.update_navigation_state(cfg);
            self.run_inspector("Update complete: fair trust: ");
        }

        // 'no trust' (actor-flagged or exhausted cache) is left to update():
        // its fallback re-initializes once, after the volume switch check
    }

    /// Re-establishes status and trust after the cache changed: either the
    /// track reached the current target, or it is still on its way.
    fn update_navigation_state(&mut self, cfg: &Settings) {
        let on_object = self
            .next_candidate()
            .is_some_and(|c| c.path.abs() < cfg.on_surface_tolerance);
        if on_object {
            // consume the reached candidate; may exhaust the cache
            self.next += 1;
            self.status = if self.candidates[self.next - 1].sf.is_portal() {
                NavStatus::OnPortal
            } else {
                NavStatus::OnModule
            };
        } else {
            self.status = NavStatus::TowardsObject;
        }
        // exhaustion or a reached portal both require a volume (re-)init
        self.trust = if self.is_exhausted() || self.is_on_portal() {
            TrustLevel::NoTrust
        } else {
            TrustLevel::Full
        };
    }

    /// Re-intersects a single cached candidate from the current track
    /// state. Returns whether its surface is still reachable.
    fn update_candidate(&mut self, index: usize, ray: &Ray, cfg: &Settings) -> bool {
        if self.candidates[index].sf.barcode.is_invalid() {
            return false;
        }
        let det = self.detector;
        kernel::update(
            ray,
            &mut self.candidates[index],
            det,
            cfg.mask_tolerance,
            cfg.overstep_tolerance,
        )
    }

    fn run_inspector(&mut self, message: &str) {
        let frame = InspectorFrame {
            status: self.status,
            trust: self.trust,
            direction: self.direction,
            volume: self.volume,
            candidates: &self.candidates,
            next: self.next,
            last: self.last,
        };
        self.inspector.inspect(&frame, message);
    }
}
