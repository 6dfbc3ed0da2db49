use crate::geometry::{Detector, SurfaceDesc};
use crate::intersect::{self, Candidate};
use crate::mask::Mask;
use crate::track::{Helix, Ray};

/// Resolves the intersections of a ray with one surface and appends every
/// candidate that is usable for navigation to the caller's buffer.
///
/// Dispatches on the surface's mask variant. Portals are intersected with
/// zero mask tolerance; a cylinder module contributes up to two candidates,
/// every other shape at most one.
pub fn initialize(
    ray: &Ray,
    sf: &SurfaceDesc,
    det: &Detector,
    mask_tolerance: f64,
    overstep_tol: f64,
    candidates: &mut Vec<Candidate>,
) {
    let mask = det.mask(sf.mask);
    let trf = det.transform(sf.transform);
    let mask_tol = if sf.is_portal() { 0.0 } else { mask_tolerance };

    match mask {
        Mask::Rectangle { .. } | Mask::Trapezoid { .. } | Mask::Ring { .. } => {
            let candidate = intersect::intersect_plane(ray, sf, mask, trf, mask_tol, overstep_tol);
            if candidate.is_reachable(overstep_tol) {
                candidates.push(candidate);
            }
        }
        Mask::Cylinder { .. } => {
            if sf.is_portal() {
                let candidate = intersect::intersect_cylinder_portal(
                    ray,
                    sf,
                    mask,
                    trf,
                    mask_tol,
                    overstep_tol,
                );
                if candidate.is_reachable(overstep_tol) {
                    candidates.push(candidate);
                }
            } else {
                for candidate in
                    intersect::intersect_cylinder(ray, sf, mask, trf, mask_tol, overstep_tol)
                {
                    if candidate.is_reachable(overstep_tol) {
                        candidates.push(candidate);
                    }
                }
            }
        }
        Mask::Line { .. } => {
            let candidate = intersect::intersect_line(ray, sf, mask, trf, mask_tol, overstep_tol);
            if candidate.is_reachable(overstep_tol) {
                candidates.push(candidate);
            }
        }
    }
}

/// Re-solves the intersection of an existing candidate's surface from the
/// current track state and overwrites the record in place.
///
/// Returns whether the surface is still reachable.
pub fn update(
    ray: &Ray,
    candidate: &mut Candidate,
    det: &Detector,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> bool {
    let sf = candidate.sf;
    let mask = det.mask(sf.mask);
    let trf = det.transform(sf.transform);
    let mask_tol = if sf.is_portal() { 0.0 } else { mask_tolerance };

    let refreshed = match mask {
        Mask::Rectangle { .. } | Mask::Trapezoid { .. } | Mask::Ring { .. } => {
            intersect::intersect_plane(ray, &sf, mask, trf, mask_tol, overstep_tol)
        }
        Mask::Cylinder { .. } => {
            // the nearest crossing outside the overstep bound, for modules
            // and portals alike
            intersect::intersect_cylinder_portal(ray, &sf, mask, trf, mask_tol, overstep_tol)
        }
        Mask::Line { .. } => {
            intersect::intersect_line(ray, &sf, mask, trf, mask_tol, overstep_tol)
        }
    };
    // the refreshed record loses the descriptor when the mask test fails;
    // keep it so the candidate stays attributable
    *candidate = Candidate { sf, ..refreshed };
    candidate.is_reachable(overstep_tol)
}

/// Helix counterpart of [`initialize`] used for validation: refines the
/// ray seed by Newton iteration on the curved trajectory.
pub fn initialize_helix(
    helix: &Helix,
    sf: &SurfaceDesc,
    det: &Detector,
    mask_tolerance: f64,
    overstep_tol: f64,
    candidates: &mut Vec<Candidate>,
) {
    let mask = det.mask(sf.mask);
    let trf = det.transform(sf.transform);
    let mask_tol = if sf.is_portal() { 0.0 } else { mask_tolerance };

    match mask {
        Mask::Rectangle { .. } | Mask::Trapezoid { .. } | Mask::Ring { .. } => {
            let candidate =
                intersect::intersect_plane_helix(helix, sf, mask, trf, mask_tol, overstep_tol);
            if candidate.is_reachable(overstep_tol) {
                candidates.push(candidate);
            }
        }
        Mask::Cylinder { .. } => {
            for candidate in
                intersect::intersect_cylinder_helix(helix, sf, mask, trf, mask_tol, overstep_tol)
            {
                if candidate.is_reachable(overstep_tol) {
                    candidates.push(candidate);
                }
            }
        }
        Mask::Line { .. } => {
            let candidate =
                intersect::intersect_line_helix(helix, sf, mask, trf, mask_tol, overstep_tol);
            if candidate.is_reachable(overstep_tol) {
                candidates.push(candidate);
            }
        }
    }
}
