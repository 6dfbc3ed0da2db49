use nalgebra::{Point3, Vector3};

use tracknav::detectors;
use tracknav::navigator::{NavState, ObjectTracer};
use tracknav::propagator::{PathLimitAborter, Propagator};
use tracknav::settings::{Settings, CM, GEV, TESLA};
use tracknav::stepper::{ConstField, LineStepper, RkStepper};
use tracknav::{FreeTrack, NavStatus, SurfaceKind};

fn telescope_positions() -> Vec<f64> {
    (0..11).map(|i| 10.0 * i as f64).collect()
}

fn field_1t() -> ConstField {
    ConstField::new(Vector3::new(0.0, 0.0, 1.0 * TESLA))
}

#[test]
fn telescope_full_traversal() {
    let det = detectors::telescope(&telescope_positions(), f64::INFINITY, 0.2);
    let cfg = Settings::default();

    // track along the telescope axis, field parallel to the motion
    let track = FreeTrack::new(
        Point3::origin(),
        0.0,
        Vector3::new(0.0, 0.0, 1.0) * GEV,
        -1.0,
    );
    let propagator = Propagator::new(RkStepper::new(field_1t()));
    let mut aborter = PathLimitAborter::new(200.0 * CM);

    let result = propagator.propagate(track, &det, 0, &cfg, ObjectTracer::default(), &mut aborter);

    assert!(result.navigation.is_complete());

    // the navigation visits modules 0..10 in order, then leaves through
    // portal 11
    let trace = &result.navigation.inspector().trace;
    assert_eq!(trace.len(), 12);
    for (i, candidate) in trace.iter().enumerate() {
        assert_eq!(
            candidate.sf.barcode,
            det.surfaces[i].barcode,
            "unexpected surface at encounter {i}"
        );
        let expected_kind = if i == 11 {
            SurfaceKind::Portal
        } else {
            SurfaceKind::Sensitive
        };
        assert_eq!(candidate.sf.barcode.kind(), expected_kind);
    }
}

#[test]
fn telescope_path_limited_traversal() {
    let det = detectors::telescope(&telescope_positions(), f64::INFINITY, 0.2);
    let cfg = Settings::default();

    let track = FreeTrack::new(
        Point3::origin(),
        0.0,
        Vector3::new(0.0, 0.0, 1.0) * GEV,
        -1.0,
    );
    let propagator = Propagator::new(RkStepper::new(field_1t()));
    // the limit cuts the propagation at the sixth module
    let mut aborter = PathLimitAborter::new(50.0);

    let result = propagator.propagate(track, &det, 0, &cfg, ObjectTracer::default(), &mut aborter);

    assert_eq!(result.navigation.status(), NavStatus::Abort);
    assert!(!result.navigation.is_complete());

    let trace = &result.navigation.inspector().trace;
    assert_eq!(trace.len(), 6);
    for (i, candidate) in trace.iter().enumerate() {
        assert_eq!(candidate.sf.barcode, det.surfaces[i].barcode);
    }
}

#[test]
fn portal_crossing_is_reversible() {
    let det = detectors::two_chamber_telescope(&[50.0, 60.0], 20.0, 0.2, 55.0);
    let cfg = Settings::default();

    // forward: start between the chambers' modules, cross into volume 1
    let mut track = FreeTrack::new(Point3::new(0.0, 0.0, 51.0), 0.0, Vector3::z(), -1.0);
    let mut nav = NavState::new(&det);
    nav.set_volume(0);
    assert!(nav.init(&track, &cfg));

    track.pos += nav.distance_to_next() * track.dir;
    nav.set_high_trust();
    assert!(nav.update(&track, &cfg));
    assert_eq!(nav.volume(), 1);
    assert!(nav.is_on_portal());

    // continue to the module of volume 1
    track.pos += nav.distance_to_next() * track.dir;
    nav.set_high_trust();
    assert!(nav.update(&track, &cfg));
    assert!(nav.is_on_module());
    assert_eq!(nav.barcode().volume(), 1);

    // reverse the track and step back across the split plane
    track.dir = -track.dir;
    nav.set_direction(tracknav::navigator::NavDirection::Backward);
    nav.set_no_trust();
    assert!(nav.update(&track, &cfg));

    track.pos += nav.distance_to_next() * track.dir;
    nav.set_high_trust();
    assert!(nav.update(&track, &cfg));

    // back in the original volume, standing on its own split portal
    assert_eq!(nav.volume(), 0);
    assert!(nav.is_on_portal());
    let expected = det.surface(det.volume(0).portals.start);
    assert_eq!(nav.barcode(), expected.barcode);
}

#[test]
fn barrel_portal_exit() {
    // cylinder portal of the toy barrel: one reachable exit candidate
    let det = detectors::toy_barrel(50.0, 500.0);
    let cfg = Settings::default();

    let dir = Vector3::new(0.0, 1.0, 1.0).normalize();
    let track = FreeTrack::new(Point3::origin(), 0.0, dir, -1.0);
    let mut nav = NavState::new(&det);
    assert!(nav.init(&track, &cfg));

    assert_eq!(nav.n_candidates(), 1);
    let expected = 50.0 * 2.0_f64.sqrt();
    assert!((nav.distance_to_next() - expected).abs() < 1e-9);

    // stepping onto it leaves the detector
    let mut stepped = track;
    stepped.pos += nav.distance_to_next() * stepped.dir;
    nav.set_high_trust();
    assert!(!nav.update(&stepped, &cfg));
    assert!(nav.is_complete());
}

#[test]
fn gridded_barrel_navigation() {
    let det = detectors::gridded_barrel(30.0, 50.0, 200.0, 8, 4);
    let cfg = Settings::default();

    // transverse track pointed between two module centers in phi, offset
    // in z to stay clear of the module row overlap
    let phi: f64 = 0.3;
    let track = FreeTrack::new(
        Point3::new(0.0, 0.0, 20.0),
        0.0,
        Vector3::new(phi.cos(), phi.sin(), 0.0),
        -1.0,
    );
    let propagator = Propagator::new(LineStepper);
    let mut aborter = PathLimitAborter::new(100.0 * CM);

    let result = propagator.propagate(track, &det, 0, &cfg, ObjectTracer::default(), &mut aborter);

    assert!(result.navigation.is_complete());
    let trace = &result.navigation.inspector().trace;
    let sensitive = trace.iter().filter(|c| c.sf.is_sensitive()).count();
    let portals = trace.iter().filter(|c| c.sf.is_portal()).count();
    assert_eq!(sensitive, 1);
    assert_eq!(portals, 1);
    // the module layer sits before the portal
    assert!(trace[0].sf.is_sensitive());
    assert!(trace[1].sf.is_portal());
}
