use std::f64::consts::PI;

use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::geometry::{
    AccelLink, Barcode, Detector, Material, SurfaceDesc, SurfaceKind, Transform3, Volume,
    INVALID_LINK,
};
use crate::grid::{Axis, AxisBounds, GridFrame, SurfaceGrid};
use crate::mask::Mask;

/// Silicon-like sensor material attached to every module.
const SENSOR: Material = Material {
    thickness: 0.3,
    x0: 93.7,
};

fn plane_at_z(z: f64) -> Transform3 {
    Transform3::translation(0.0, 0.0, z)
}

/// A telescope detector: one volume of coplanar rectangular modules along
/// the z axis, closed by two plane portals just beyond the outermost
/// modules. Pass an infinite half-length for unbounded modules.
///
/// Surface indices follow the module order, the forward portal comes first
/// after the last module.
pub fn telescope(positions: &[f64], half: f64, envelope: f64) -> Detector {
    let mut det = Detector::default();
    det.materials.push(SENSOR);
    let n = positions.len() as u32;

    for (i, &z) in positions.iter().enumerate() {
        let i = i as u32;
        det.transforms.push(plane_at_z(z));
        det.masks.push(Mask::Rectangle {
            half_x: half,
            half_y: half,
            volume_link: 0,
        });
        det.surfaces.push(SurfaceDesc {
            barcode: Barcode::new(0, SurfaceKind::Sensitive, i).with_transform(i),
            transform: i,
            mask: i,
            material: Some(0),
        });
    }

    let z_hi = positions.last().unwrap() + envelope;
    let z_lo = positions.first().unwrap() - envelope;
    for (k, z) in [z_hi, z_lo].into_iter().enumerate() {
        let idx = n + k as u32;
        det.transforms.push(plane_at_z(z));
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

/// Two telescope chambers separated by a linking portal, for volume-switch
/// tests. The first chamber holds the modules before `z_split`, the second
/// the rest; each chamber sees the split plane as a portal into the other.
pub fn two_chamber_telescope(
    positions: &[f64],
    half: f64,
    envelope: f64,
    z_split: f64,
) -> Detector {
    let mut det = Detector::default();
    det.materials.push(SENSOR);

    let (front, back): (Vec<f64>, Vec<f64>) =
        positions.iter().copied().partition(|&z| z < z_split);
    assert!(
        !front.is_empty() && !back.is_empty(),
        "Split plane must separate the modules"
    );

    let z_lo = front.first().unwrap() - envelope;
    let z_hi = back.last().unwrap() + envelope;

    let push_volume = |det: &mut Detector,
                           volume: u32,
                           modules: &[f64],
                           portal_z: [(f64, u32); 2]| {
        let first = det.surfaces.len() as u32;
        for (i, &z) in modules.iter().enumerate() {
            let trf = det.transforms.len() as u32;
            det.transforms.push(plane_at_z(z));
            det.masks.push(Mask::Rectangle {
                half_x: half,
                half_y: half,
                volume_link: volume,
            });
            det.surfaces.push(SurfaceDesc {
                barcode: Barcode::new(volume, SurfaceKind::Sensitive, i as u32)
                    .with_transform(trf),
                transform: trf,
                mask: trf,
                material: Some(0),
            });
        }
        let portal_first = det.surfaces.len() as u32;
        for (k, (z, link)) in portal_z.into_iter().enumerate() {
            let trf = det.transforms.len() as u32;
            det.transforms.push(plane_at_z(z));
            det.masks.push(Mask::Rectangle {
                half_x: f64::INFINITY,
                half_y: f64::INFINITY,
                volume_link: link,
            });
            det.surfaces.push(SurfaceDesc {
                barcode: Barcode::new(
                    volume,
                    SurfaceKind::Portal,
                    modules.len() as u32 + k as u32,
                )
                .with_transform(trf),
                transform: trf,
                mask: trf,
                material: None,
            });
        }
        det.volumes.push(Volume {
            index: volume,
            transform: 0,
            portals: portal_first..det.surfaces.len() as u32,
            sensitives: first..portal_first,
            passives: 0..0,
            accel: AccelLink::BruteForce,
        });
    };

    push_volume(&mut det, 0, &front, [(z_split, 1), (z_lo, INVALID_LINK)]);
    push_volume(&mut det, 1, &back, [(z_hi, INVALID_LINK), (z_split, 0)]);
    det
}

/// A toy barrel volume bounded by a cylinder portal and two disc portals,
/// with no interior modules.
pub fn toy_barrel(radius: f64, half_z: f64) -> Detector {
    let mut det = Detector::default();

    det.transforms.push(Transform3::identity());
    det.masks.push(Mask::Cylinder {
        radius,
        half_z,
        volume_link: INVALID_LINK,
    });
    det.surfaces.push(SurfaceDesc {
        barcode: Barcode::new(0, SurfaceKind::Portal, 0).with_transform(0),
        transform: 0,
        mask: 0,
        material: None,
    });

    for (i, z) in [half_z, -half_z].into_iter().enumerate() {
        let idx = 1 + i as u32;
        det.transforms.push(plane_at_z(z));
        det.masks.push(Mask::Ring {
            r_min: 0.0,
            r_max: radius,
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
        portals: 0..3,
        sensitives: 0..0,
        passives: 0..0,
        accel: AccelLink::BruteForce,
    });
    det
}

/// Placement of a barrel module: local x along phi, local y along z, local
/// z along the outward radial normal.
fn barrel_module_transform(radius: f64, phi: f64, z: f64) -> Transform3 {
    let normal = Vector3::new(phi.cos(), phi.sin(), 0.0);
    let tangent = Vector3::new(-phi.sin(), phi.cos(), 0.0);
    let rot = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[
        tangent,
        Vector3::z(),
        normal,
    ]));
    Transform3::from_parts(
        Translation3::new(radius * phi.cos(), radius * phi.sin(), z),
        UnitQuaternion::from_rotation_matrix(&rot),
    )
}

/// A barrel with one grid-indexed layer of sensitive modules at
/// `module_radius`, bounded by an outer cylinder portal and two disc
/// portals. Modules are binned in a circular-phi x bounded-z grid.
pub fn gridded_barrel(
    module_radius: f64,
    portal_radius: f64,
    half_z: f64,
    n_phi: usize,
    n_z: usize,
) -> Detector {
    let mut det = toy_barrel(portal_radius, half_z);
    det.materials.push(SENSOR);

    let mut grid = SurfaceGrid::new(
        GridFrame::CylinderPhiZ,
        [
            Axis::new(AxisBounds::Circular, -PI, PI, n_phi),
            Axis::new(AxisBounds::Bounded, -half_z, half_z, n_z),
        ],
    );

    // slight overlap so tracks near bin edges always find a module
    let half_x = 1.1 * module_radius * (PI / n_phi as f64).tan();
    let half_y = 1.1 * half_z / n_z as f64;

    let first = det.surfaces.len() as u32;
    for iz in 0..n_z {
        let z = -half_z + (iz as f64 + 0.5) * (2.0 * half_z / n_z as f64);
        for iphi in 0..n_phi {
            let phi = -PI + (iphi as f64 + 0.5) * (2.0 * PI / n_phi as f64);
            let sf_idx = det.surfaces.len() as u32;
            let trf = det.transforms.len() as u32;
            det.transforms.push(barrel_module_transform(module_radius, phi, z));
            det.masks.push(Mask::Rectangle {
                half_x,
                half_y,
                volume_link: 0,
            });
            det.surfaces.push(SurfaceDesc {
                barcode: Barcode::new(0, SurfaceKind::Sensitive, sf_idx).with_transform(trf),
                transform: trf,
                mask: trf,
                material: Some(0),
            });
            grid.populate([phi, z], sf_idx);
        }
    }

    det.grids.push(grid);
    let volume = &mut det.volumes[0];
    volume.sensitives = first..det.surfaces.len() as u32;
    volume.accel = AccelLink::Grid(0);
    det
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telescope_surface_ordering() {
        let positions: Vec<f64> = (0..11).map(|i| 10.0 * i as f64).collect();
        let det = telescope(&positions, f64::INFINITY, 0.2);

        assert_eq!(det.surfaces.len(), 13);
        assert_eq!(det.volumes.len(), 1);
        // module indices 0..10, forward portal is surface 11
        assert!(det.surfaces[10].is_sensitive());
        assert!(det.surfaces[11].is_portal());
        assert_eq!(det.surfaces[11].barcode.index(), 11);
        assert!((det.surface_center(&det.surfaces[11]).z - 100.2).abs() < 1e-9);
        assert!((det.surface_center(&det.surfaces[12]).z + 0.2).abs() < 1e-9);
        // modules carry material, portals do not
        assert!(det.surfaces[0].material.is_some());
        assert!(det.surfaces[11].material.is_none());
    }

    #[test]
    fn two_chambers_link_through_the_split_portal() {
        let positions: Vec<f64> = (0..11).map(|i| 10.0 * i as f64).collect();
        let det = two_chamber_telescope(&positions, 20.0, 0.2, 55.0);

        assert_eq!(det.volumes.len(), 2);
        let v0 = det.volume(0);
        let v1 = det.volume(1);
        assert_eq!(v0.sensitives.len(), 6); // z = 0..50
        assert_eq!(v1.sensitives.len(), 5); // z = 60..100

        // forward portal of volume 0 links into volume 1
        let fwd = det.surface(v0.portals.start);
        assert_eq!(det.mask(fwd.mask).volume_link(), 1);
        // backward portal of volume 1 links into volume 0
        let bwd = det.surface(v1.portals.end - 1);
        assert_eq!(det.mask(bwd.mask).volume_link(), 0);
    }

    #[test]
    fn gridded_barrel_finds_modules_near_a_point() {
        let det = gridded_barrel(30.0, 50.0, 200.0, 8, 4);
        let grid = det.grid(0);
        assert_eq!(grid.n_bins(), 32);

        // every module is retrievable around its own center
        let volume = det.volume(0);
        assert_eq!(volume.accel, AccelLink::Grid(0));
        for idx in volume.sensitives.clone() {
            let sf = det.surface(idx);
            let center = det.surface_center(sf);
            let point = grid.project(
                det.transform(volume.transform),
                &center,
                &Vector3::z(),
            );
            assert!(
                grid.search(point, [0, 0]).any(|i| i == idx),
                "module {idx} not found in its own bin"
            );
        }
    }
}
