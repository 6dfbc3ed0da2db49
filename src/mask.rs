use nalgebra::{Point3, Vector3};

use crate::geometry::Transform3;

/// Local coordinate frame spanned by a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// (x, y) on the surface plane.
    Cartesian2,
    /// (r, phi) on the surface plane.
    Polar,
    /// (r * phi, z) on the cylinder side surface.
    Cylindrical,
    /// (signed closest-approach distance, z) along the wire.
    Line,
}

/// Shape, bounds and navigation link of a surface.
///
/// The `volume_link` is the volume to traverse into for a portal, or a
/// back-link to the owning volume for a module. Unbounded shapes use
/// infinite half-lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mask {
    Rectangle {
        half_x: f64,
        half_y: f64,
        volume_link: u32,
    },
    Trapezoid {
        half_x0: f64, // half length in x at -half_y
        half_x1: f64, // half length in x at +half_y
        half_y: f64,
        volume_link: u32,
    },
    Ring {
        r_min: f64,
        r_max: f64,
        volume_link: u32,
    },
    Cylinder {
        radius: f64,
        half_z: f64,
        volume_link: u32,
    },
    Line {
        radius: f64, // maximal closest-approach distance
        half_z: f64,
        volume_link: u32,
    },
}

impl Mask {
    pub fn volume_link(&self) -> u32 {
        match *self {
            Mask::Rectangle { volume_link, .. }
            | Mask::Trapezoid { volume_link, .. }
            | Mask::Ring { volume_link, .. }
            | Mask::Cylinder { volume_link, .. }
            | Mask::Line { volume_link, .. } => volume_link,
        }
    }

    pub fn frame(&self) -> Frame {
        match self {
            Mask::Rectangle { .. } | Mask::Trapezoid { .. } => Frame::Cartesian2,
            Mask::Ring { .. } => Frame::Polar,
            Mask::Cylinder { .. } => Frame::Cylindrical,
            Mask::Line { .. } => Frame::Line,
        }
    }

    /// Checks whether a local point lies within the mask bounds, with `tol`
    /// of slack added to every boundary.
    pub fn is_inside(&self, local: [f64; 2], tol: f64) -> bool {
        match *self {
            Mask::Rectangle { half_x, half_y, .. } => {
                local[0].abs() <= half_x + tol && local[1].abs() <= half_y + tol
            }
            Mask::Trapezoid {
                half_x0,
                half_x1,
                half_y,
                ..
            } => {
                // interpolate the x bound between the two baselines
                let rel = (local[1] + half_y) / (2.0 * half_y);
                let x_bound = half_x0 + (half_x1 - half_x0) * rel;
                local[0].abs() <= x_bound + tol && local[1].abs() <= half_y + tol
            }
            Mask::Ring { r_min, r_max, .. } => {
                local[0] >= r_min - tol && local[0] <= r_max + tol
            }
            Mask::Cylinder { half_z, .. } => local[1].abs() <= half_z + tol,
            Mask::Line {
                radius, half_z, ..
            } => local[0].abs() <= radius + tol && local[1].abs() <= half_z + tol,
        }
    }

    /// Converts a global point to the local frame of this mask.
    ///
    /// The track direction is needed to fix the sign of the line frame's
    /// closest-approach coordinate.
    pub fn to_local(&self, trf: &Transform3, p: &Point3<f64>, d: &Vector3<f64>) -> [f64; 2] {
        let q = trf.inverse_transform_point(p);
        match *self {
            Mask::Rectangle { .. } | Mask::Trapezoid { .. } => [q.x, q.y],
            Mask::Ring { .. } => [q.x.hypot(q.y), q.y.atan2(q.x)],
            Mask::Cylinder { radius, .. } => [radius * q.y.atan2(q.x), q.z],
            Mask::Line { .. } => {
                let dl = trf.inverse_transform_vector(d);
                let dist = q.x.hypot(q.y);
                // sign from the azimuth of the radial offset w.r.t. the
                // track direction
                let sign = if -dl.y * q.x + dl.x * q.y > 0.0 {
                    1.0
                } else {
                    -1.0
                };
                [sign * dist, q.z]
            }
        }
    }

    /// Converts a local point back to global coordinates.
    ///
    /// For the line frame the azimuth of the closest approach is not part of
    /// the local coordinates; the returned point lies in the local xz plane.
    pub fn to_global(&self, trf: &Transform3, local: [f64; 2]) -> Point3<f64> {
        let q = match *self {
            Mask::Rectangle { .. } | Mask::Trapezoid { .. } => {
                Point3::new(local[0], local[1], 0.0)
            }
            Mask::Ring { .. } => {
                Point3::new(local[0] * local[1].cos(), local[0] * local[1].sin(), 0.0)
            }
            Mask::Cylinder { radius, .. } => {
                let phi = local[0] / radius;
                Point3::new(radius * phi.cos(), radius * phi.sin(), local[1])
            }
            Mask::Line { .. } => Point3::new(local[0], 0.0, local[1]),
        };
        trf * q
    }
}
