use nalgebra::{Point3, Vector3};

use crate::settings::HELIX_PT_EPSILON;

/// Free track parameters: the phase-space state a stepper advances and the
/// navigator intersects from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeTrack {
    pub pos: Point3<f64>,
    pub time: f64,
    pub dir: Vector3<f64>, // unit length
    pub qop: f64,          // signed q/p in e/(GeV/c)
}

impl FreeTrack {
    /// Builds a track from a vertex position, momentum vector and charge.
    pub fn new(pos: Point3<f64>, time: f64, mom: Vector3<f64>, q: f64) -> Self {
        let p = mom.norm();
        Self {
            pos,
            time,
            dir: mom / p,
            qop: q / p,
        }
    }

    /// Momentum magnitude in GeV/c.
    pub fn p(&self) -> f64 {
        1.0 / self.qop.abs()
    }

    /// Signed charge in e.
    pub fn q(&self) -> f64 {
        self.qop.signum()
    }
}

/// Straight-line trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub pos: Point3<f64>,
    pub dir: Vector3<f64>,
}

impl Ray {
    pub fn new(pos: Point3<f64>, dir: Vector3<f64>) -> Self {
        Self {
            pos,
            dir: dir.normalize(),
        }
    }

    pub fn pos_at(&self, s: f64) -> Point3<f64> {
        self.pos + s * self.dir
    }

    pub fn dir_at(&self, _s: f64) -> Vector3<f64> {
        self.dir
    }
}

impl From<&FreeTrack> for Ray {
    fn from(track: &FreeTrack) -> Self {
        Ray {
            pos: track.pos,
            dir: track.dir,
        }
    }
}

/// Helical trajectory of a charged track in a constant magnetic field.
///
/// The direction is split into components parallel and transverse to the
/// field; the transverse part rotates with angular rate `omega = (q/p) |B|`
/// per unit arc length. Positive path lengths advance along the initial
/// direction. When the transverse fraction or the curvature vanishes the
/// evaluation degenerates to a straight line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helix {
    pub pos: Point3<f64>,
    pub time: f64,
    pub qop: f64,
    dir0: Vector3<f64>,
    omega: f64,              // signed rotation rate per arc length
    t_par: Vector3<f64>,     // direction component along the field
    t_perp: Vector3<f64>,    // direction component transverse to the field
    t_perp_x_b: Vector3<f64>, // t_perp cross the field unit vector
}

impl Helix {
    pub fn new(track: &FreeTrack, b: &Vector3<f64>) -> Self {
        let b_norm = b.norm();
        let dir0 = track.dir;
        if b_norm == 0.0 {
            return Self {
                pos: track.pos,
                time: track.time,
                qop: track.qop,
                dir0,
                omega: 0.0,
                t_par: dir0,
                t_perp: Vector3::zeros(),
                t_perp_x_b: Vector3::zeros(),
            };
        }
        let b_hat = b / b_norm;
        let t_par = dir0.dot(&b_hat) * b_hat;
        let t_perp = dir0 - t_par;
        Self {
            pos: track.pos,
            time: track.time,
            qop: track.qop,
            dir0,
            omega: track.qop * b_norm,
            t_par,
            t_perp,
            t_perp_x_b: t_perp.cross(&b_hat),
        }
    }

    fn is_degenerate(&self) -> bool {
        self.omega == 0.0 || self.t_perp.norm() < HELIX_PT_EPSILON
    }

    /// Bending radius in mm.
    pub fn radius(&self) -> f64 {
        self.t_perp.norm() / self.omega.abs()
    }

    pub fn qop(&self) -> f64 {
        self.qop
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn pos_at(&self, s: f64) -> Point3<f64> {
        if self.is_degenerate() {
            return self.pos + s * self.dir0;
        }
        let phase = self.omega * s;
        self.pos
            + s * self.t_par
            + (phase.sin() / self.omega) * self.t_perp
            + ((1.0 - phase.cos()) / self.omega) * self.t_perp_x_b
    }

    pub fn dir_at(&self, s: f64) -> Vector3<f64> {
        if self.is_degenerate() {
            return self.dir0;
        }
        let phase = self.omega * s;
        self.t_par + phase.cos() * self.t_perp + phase.sin() * self.t_perp_x_b
    }
}
