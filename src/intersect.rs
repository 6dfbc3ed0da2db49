use nalgebra::{Point3, Vector3};

use crate::geometry::{SurfaceDesc, Transform3, INVALID_LINK};
use crate::mask::Mask;
use crate::settings::{
    LINE_DENOM_EPSILON, NEWTON_MAX_ITER, NEWTON_TOLERANCE, PLANE_DENOM_EPSILON,
};
use crate::track::{Helix, Ray};

/// Classification of a resolved intersection against the mask bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No geometric solution exists for this trajectory.
    Missed,
    /// A solution exists but the hit point lies outside the mask bounds.
    Outside,
    /// The hit point lies within the mask bounds.
    Inside,
}

/// Whether the hit lies along or against the trajectory direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Opposite,
    Along,
}

/// A prospective intersection held in the navigator's cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub path: f64,                // signed arc length to the hit
    pub local: [f64; 2],          // hit point in the mask frame
    pub status: Status,
    pub direction: Direction,
    pub cos_incidence_angle: f64,
    pub sf: SurfaceDesc,
    pub volume_link: u32,         // resolved next-volume link
}

impl Candidate {
    /// A candidate is usable for navigation iff it sits inside its mask and
    /// is not too far behind the track.
    pub fn is_reachable(&self, overstep_tol: f64) -> bool {
        self.status == Status::Inside && self.path >= overstep_tol
    }
}

impl Default for Candidate {
    fn default() -> Self {
        Self {
            path: f64::MAX,
            local: [0.0, 0.0],
            status: Status::Missed,
            direction: Direction::Along,
            cos_incidence_angle: 0.0,
            sf: SurfaceDesc::default(),
            volume_link: INVALID_LINK,
        }
    }
}

/// Evaluates a trajectory sample at path `s` into a candidate record.
fn build_candidate(
    pos: Point3<f64>,
    dir: Vector3<f64>,
    cos_incidence: f64,
    s: f64,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
) -> Candidate {
    let local = mask.to_local(trf, &pos, &dir);
    let status = if mask.is_inside(local, mask_tolerance) {
        Status::Inside
    } else {
        Status::Outside
    };
    let mut candidate = Candidate {
        path: s,
        local,
        status,
        ..Default::default()
    };
    if status == Status::Inside {
        candidate.sf = *sf;
        candidate.direction = if s.is_sign_negative() {
            Direction::Opposite
        } else {
            Direction::Along
        };
        candidate.cos_incidence_angle = cos_incidence;
        candidate.volume_link = mask.volume_link();
    }
    candidate
}

/// Solutions of a quadratic a s^2 + b s + c = 0, ordered ascending.
struct Quadratic {
    solutions: usize,
    smaller: f64,
    larger: f64,
}

fn solve_quadratic(a: f64, b: f64, c: f64) -> Quadratic {
    let none = Quadratic {
        solutions: 0,
        smaller: 0.0,
        larger: 0.0,
    };
    if a.abs() < 1e-12 {
        // linear fallback for trajectories (nearly) parallel to the axis
        if b.abs() < 1e-12 {
            return none;
        }
        let root = -c / b;
        return Quadratic {
            solutions: 1,
            smaller: root,
            larger: root,
        };
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return none;
    }
    // numerically stable form, avoids catastrophic cancellation
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let (r0, r1) = (q / a, c / q);
    Quadratic {
        solutions: if disc == 0.0 { 1 } else { 2 },
        smaller: r0.min(r1),
        larger: r0.max(r1),
    }
}

/// Intersects a ray with a planar surface (rectangle, trapezoid or ring).
pub fn intersect_plane(
    ray: &Ray,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> Candidate {
    let normal = trf * Vector3::z();
    let denom = normal.dot(&ray.dir);
    if denom.abs() < PLANE_DENOM_EPSILON {
        return Candidate::default();
    }
    let center = Point3::from(trf.translation.vector);
    let s = normal.dot(&(center - ray.pos)) / denom;
    if s < overstep_tol {
        return Candidate {
            path: s,
            ..Default::default()
        };
    }
    build_candidate(
        ray.pos_at(s),
        ray.dir,
        denom.abs(),
        s,
        sf,
        mask,
        trf,
        mask_tolerance,
    )
}

/// Radial quadratic of a ray against the infinite cylinder of a mask.
fn cylinder_quadratic(ray: &Ray, radius: f64, trf: &Transform3) -> Quadratic {
    let axis = trf * Vector3::z();
    let center = Point3::from(trf.translation.vector);
    let pc_cross = (ray.pos - center).cross(&axis);
    let rd_cross = ray.dir.cross(&axis);
    solve_quadratic(
        rd_cross.norm_squared(),
        2.0 * rd_cross.dot(&pc_cross),
        pc_cross.norm_squared() - radius * radius,
    )
}

fn cylinder_cos_incidence(hit: &Point3<f64>, dir: &Vector3<f64>, trf: &Transform3) -> f64 {
    let axis = trf * Vector3::z();
    let center = Point3::from(trf.translation.vector);
    let radial = hit - center;
    let normal = (radial - radial.dot(&axis) * axis).normalize();
    normal.dot(dir).abs()
}

/// Intersects a ray with a cylinder module surface. Both roots are returned
/// so the navigator can cache the near and the far crossing.
pub fn intersect_cylinder(
    ray: &Ray,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> [Candidate; 2] {
    let Mask::Cylinder { radius, .. } = *mask else {
        return [Candidate::default(), Candidate::default()];
    };
    let qe = cylinder_quadratic(ray, radius, trf);
    if qe.solutions == 0 {
        return [Candidate::default(), Candidate::default()];
    }
    let mut out = [Candidate::default(), Candidate::default()];
    for (slot, s) in out.iter_mut().zip([qe.smaller, qe.larger]) {
        if s < overstep_tol {
            slot.path = s;
            continue;
        }
        let hit = ray.pos_at(s);
        *slot = build_candidate(
            hit,
            ray.dir,
            cylinder_cos_incidence(&hit, &ray.dir, trf),
            s,
            sf,
            mask,
            trf,
            mask_tolerance,
        );
    }
    out
}

/// Intersects a ray with a cylinder portal surface.
///
/// Between portals the track is always inside the cylinder, so only the
/// closest crossing outside the overstep tolerance is physically meaningful:
/// take the smaller root if it qualifies, otherwise the larger one.
pub fn intersect_cylinder_portal(
    ray: &Ray,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> Candidate {
    let Mask::Cylinder { radius, .. } = *mask else {
        return Candidate::default();
    };
    let qe = cylinder_quadratic(ray, radius, trf);
    if qe.solutions == 0 || qe.larger < overstep_tol {
        return Candidate::default();
    }
    let s = if qe.smaller >= overstep_tol {
        qe.smaller
    } else {
        qe.larger
    };
    let hit = ray.pos_at(s);
    build_candidate(
        hit,
        ray.dir,
        cylinder_cos_incidence(&hit, &ray.dir, trf),
        s,
        sf,
        mask,
        trf,
        mask_tolerance,
    )
}

/// Intersects a ray with a line/wire surface at the point of closest
/// approach to the wire axis.
pub fn intersect_line(
    ray: &Ray,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> Candidate {
    let axis = trf * Vector3::z();
    let center = Point3::from(trf.translation.vector);

    let zd = axis.dot(&ray.dir);
    let denom = 1.0 - zd * zd;
    // wire parallel to the track
    if denom < LINE_DENOM_EPSILON {
        return Candidate::default();
    }

    let t2l = center - ray.pos;
    let s = (t2l.dot(&ray.dir) - t2l.dot(&axis) * zd) / denom;
    if s < overstep_tol {
        return Candidate {
            path: s,
            ..Default::default()
        };
    }
    build_candidate(
        ray.pos_at(s),
        ray.dir,
        zd.abs(),
        s,
        sf,
        mask,
        trf,
        mask_tolerance,
    )
}

/// Newton iteration on a path-length equation `f(s) = 0` along a helix.
/// Returns the converged path, or None when the iteration stalls or the
/// derivative vanishes.
fn newton_on_helix<F, D>(mut s: f64, f: F, df: D) -> Option<f64>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    for _ in 0..NEWTON_MAX_ITER {
        let slope = df(s);
        if slope.abs() < 1e-12 {
            return None;
        }
        let ds = f(s) / slope;
        s -= ds;
        if ds.abs() < NEWTON_TOLERANCE {
            return Some(s);
        }
    }
    None
}

/// Intersects a helix with a planar surface. The transcendental equation is
/// solved by Newton iteration seeded with the ray solution of the local
/// tangent.
pub fn intersect_plane_helix(
    helix: &Helix,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> Candidate {
    let normal = trf * Vector3::z();
    let center = Point3::from(trf.translation.vector);

    let tangent = Ray::new(helix.pos_at(0.0), helix.dir_at(0.0));
    let denom = normal.dot(&tangent.dir);
    if denom.abs() < PLANE_DENOM_EPSILON {
        return Candidate::default();
    }
    let seed = normal.dot(&(center - tangent.pos)) / denom;

    let f = |s: f64| normal.dot(&(helix.pos_at(s) - center));
    let df = |s: f64| normal.dot(&helix.dir_at(s));
    let Some(s) = newton_on_helix(seed, &f, &df) else {
        return Candidate::default();
    };
    if s < overstep_tol {
        return Candidate {
            path: s,
            ..Default::default()
        };
    }
    let dir = helix.dir_at(s);
    build_candidate(
        helix.pos_at(s),
        dir,
        normal.dot(&dir).abs(),
        s,
        sf,
        mask,
        trf,
        mask_tolerance,
    )
}

/// Intersects a helix with a cylinder surface, refining both ray roots.
pub fn intersect_cylinder_helix(
    helix: &Helix,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> [Candidate; 2] {
    let Mask::Cylinder { radius, .. } = *mask else {
        return [Candidate::default(), Candidate::default()];
    };
    let axis = trf * Vector3::z();
    let center = Point3::from(trf.translation.vector);

    let tangent = Ray::new(helix.pos_at(0.0), helix.dir_at(0.0));
    let qe = cylinder_quadratic(&tangent, radius, trf);
    if qe.solutions == 0 {
        return [Candidate::default(), Candidate::default()];
    }

    let perp = |v: Vector3<f64>| v - v.dot(&axis) * axis;
    let f = |s: f64| {
        let radial = perp(helix.pos_at(s) - center);
        radial.norm_squared() - radius * radius
    };
    let df = |s: f64| {
        let radial = perp(helix.pos_at(s) - center);
        2.0 * radial.dot(&perp(helix.dir_at(s)))
    };

    let mut out = [Candidate::default(), Candidate::default()];
    for (slot, seed) in out.iter_mut().zip([qe.smaller, qe.larger]) {
        let Some(s) = newton_on_helix(seed, &f, &df) else {
            continue;
        };
        if s < overstep_tol {
            slot.path = s;
            continue;
        }
        let hit = helix.pos_at(s);
        let dir = helix.dir_at(s);
        *slot = build_candidate(
            hit,
            dir,
            cylinder_cos_incidence(&hit, &dir, trf),
            s,
            sf,
            mask,
            trf,
            mask_tolerance,
        );
    }
    out
}

/// Intersects a helix with a line/wire surface. The closest-approach
/// condition (transverse separation orthogonal to the transverse direction)
/// is refined by Newton iteration from the ray solution.
pub fn intersect_line_helix(
    helix: &Helix,
    sf: &SurfaceDesc,
    mask: &Mask,
    trf: &Transform3,
    mask_tolerance: f64,
    overstep_tol: f64,
) -> Candidate {
    let axis = trf * Vector3::z();
    let center = Point3::from(trf.translation.vector);

    let tangent = Ray::new(helix.pos_at(0.0), helix.dir_at(0.0));
    let zd0 = axis.dot(&tangent.dir);
    if 1.0 - zd0 * zd0 < LINE_DENOM_EPSILON {
        return Candidate::default();
    }
    let t2l = center - tangent.pos;
    let seed = (t2l.dot(&tangent.dir) - t2l.dot(&axis) * zd0) / (1.0 - zd0 * zd0);

    let perp = |v: Vector3<f64>| v - v.dot(&axis) * axis;
    // stationary point of the transverse separation
    let f = |s: f64| perp(helix.pos_at(s) - center).dot(&perp(helix.dir_at(s)));
    let df = |s: f64| {
        let h = 1e-3;
        (f(s + h) - f(s - h)) / (2.0 * h)
    };
    let Some(s) = newton_on_helix(seed, &f, &df) else {
        return Candidate::default();
    };

    let dir = helix.dir_at(s);
    let zd = axis.dot(&dir);
    if 1.0 - zd * zd < LINE_DENOM_EPSILON {
        return Candidate::default();
    }
    if s < overstep_tol {
        return Candidate {
            path: s,
            ..Default::default()
        };
    }
    build_candidate(
        helix.pos_at(s),
        dir,
        zd.abs(),
        s,
        sf,
        mask,
        trf,
        mask_tolerance,
    )
}
