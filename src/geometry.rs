use std::fmt;
use std::ops::Range;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::grid::SurfaceGrid;
use crate::mask::Mask;

/// Placement of a surface or volume in 3-D space.
pub type Transform3 = Isometry3<f64>;

/// Sentinel for a volume link that leaves the detector.
pub const INVALID_LINK: u32 = u32::MAX;

/// The role a surface plays in navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Boundary surface between two volumes, carries a link to the neighbour.
    Portal = 0,
    /// Measurement surface interior to a volume.
    Sensitive = 1,
    /// Material surface interior to a volume.
    Passive = 2,
}

impl SurfaceKind {
    fn from_bits(bits: u64) -> Self {
        match bits {
            0 => SurfaceKind::Portal,
            1 => SurfaceKind::Sensitive,
            _ => SurfaceKind::Passive,
        }
    }
}

/// Compact 64-bit surface identifier.
///
/// Packs {volume, kind, index, transform, extra} into a single word:
/// 12 bits volume, 4 bits kind, 24 bits index within the volume, 20 bits
/// transform index and 4 extra bits. The invalid barcode has all bits set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Barcode(u64);

const VOLUME_BITS: u64 = 12;
const KIND_BITS: u64 = 4;
const INDEX_BITS: u64 = 24;
const TRANSFORM_BITS: u64 = 20;

const KIND_SHIFT: u64 = VOLUME_BITS;
const INDEX_SHIFT: u64 = KIND_SHIFT + KIND_BITS;
const TRANSFORM_SHIFT: u64 = INDEX_SHIFT + INDEX_BITS;
const EXTRA_SHIFT: u64 = TRANSFORM_SHIFT + TRANSFORM_BITS;

const fn mask_for(bits: u64) -> u64 {
    (1u64 << bits) - 1
}

impl Barcode {
    /// The invalid barcode, all bits set.
    pub const INVALID: Barcode = Barcode(u64::MAX);

    pub fn new(volume: u32, kind: SurfaceKind, index: u32) -> Self {
        let mut bits = 0u64;
        bits |= (volume as u64) & mask_for(VOLUME_BITS);
        bits |= ((kind as u64) & mask_for(KIND_BITS)) << KIND_SHIFT;
        bits |= ((index as u64) & mask_for(INDEX_BITS)) << INDEX_SHIFT;
        Barcode(bits)
    }

    pub fn with_transform(mut self, transform: u32) -> Self {
        self.0 &= !(mask_for(TRANSFORM_BITS) << TRANSFORM_SHIFT);
        self.0 |= ((transform as u64) & mask_for(TRANSFORM_BITS)) << TRANSFORM_SHIFT;
        self
    }

    pub fn with_extra(mut self, extra: u8) -> Self {
        self.0 &= !(mask_for(64 - EXTRA_SHIFT) << EXTRA_SHIFT);
        self.0 |= ((extra as u64) & mask_for(64 - EXTRA_SHIFT)) << EXTRA_SHIFT;
        self
    }

    pub fn volume(&self) -> u32 {
        (self.0 & mask_for(VOLUME_BITS)) as u32
    }

    pub fn kind(&self) -> SurfaceKind {
        SurfaceKind::from_bits((self.0 >> KIND_SHIFT) & mask_for(KIND_BITS))
    }

    pub fn index(&self) -> u32 {
        ((self.0 >> INDEX_SHIFT) & mask_for(INDEX_BITS)) as u32
    }

    pub fn transform(&self) -> u32 {
        ((self.0 >> TRANSFORM_SHIFT) & mask_for(TRANSFORM_BITS)) as u32
    }

    pub fn extra(&self) -> u8 {
        ((self.0 >> EXTRA_SHIFT) & mask_for(64 - EXTRA_SHIFT)) as u8
    }

    pub fn is_invalid(&self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for Barcode {
    fn default() -> Self {
        Barcode::INVALID
    }
}

impl fmt::Debug for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Barcode(invalid)")
        } else {
            write!(
                f,
                "Barcode(vol={}, kind={:?}, idx={})",
                self.volume(),
                self.kind(),
                self.index()
            )
        }
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Immutable record describing one detector surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDesc {
    pub barcode: Barcode,
    pub transform: u32,        // index into the detector transform store
    pub mask: u32,             // index into the detector mask store
    pub material: Option<u32>, // index into the detector material store
}

impl SurfaceDesc {
    pub fn is_portal(&self) -> bool {
        self.barcode.kind() == SurfaceKind::Portal
    }

    pub fn is_sensitive(&self) -> bool {
        self.barcode.kind() == SurfaceKind::Sensitive
    }

    pub fn is_passive(&self) -> bool {
        self.barcode.kind() == SurfaceKind::Passive
    }
}

impl Default for SurfaceDesc {
    fn default() -> Self {
        Self {
            barcode: Barcode::INVALID,
            transform: 0,
            mask: 0,
            material: None,
        }
    }
}

/// Homogeneous material slab attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub thickness: f64, // mm
    pub x0: f64,        // radiation length, mm
}

/// How a volume finds its surface candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelLink {
    /// Test every portal and sensitive surface of the volume.
    BruteForce,
    /// Look up sensitive modules in the indexed surface grid; portals are
    /// always tested in full.
    Grid(u32),
}

/// A portal-bounded detector volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub index: u32,
    pub transform: u32,
    pub portals: Range<u32>,    // surface index range in the detector store
    pub sensitives: Range<u32>, // surface index range in the detector store
    pub passives: Range<u32>,   // surface index range in the detector store
    pub accel: AccelLink,
}

/// Read-only geometry store shared by all navigator states.
///
/// Volumes, surfaces, transforms, masks and grids are fixed after
/// construction; any number of propagations may read them concurrently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detector {
    pub volumes: Vec<Volume>,
    pub surfaces: Vec<SurfaceDesc>,
    pub transforms: Vec<Transform3>,
    pub masks: Vec<Mask>,
    pub materials: Vec<Material>,
    pub grids: Vec<SurfaceGrid>,
}

impl Detector {
    pub fn volume(&self, index: u32) -> &Volume {
        &self.volumes[index as usize]
    }

    pub fn surface(&self, index: u32) -> &SurfaceDesc {
        &self.surfaces[index as usize]
    }

    pub fn transform(&self, index: u32) -> &Transform3 {
        &self.transforms[index as usize]
    }

    pub fn mask(&self, index: u32) -> &Mask {
        &self.masks[index as usize]
    }

    pub fn grid(&self, index: u32) -> &SurfaceGrid {
        &self.grids[index as usize]
    }

    /// Center of a surface placement in global coordinates.
    pub fn surface_center(&self, sf: &SurfaceDesc) -> Point3<f64> {
        Point3::from(self.transform(sf.transform).translation.vector)
    }

    /// Surface normal (local z axis) in global coordinates.
    pub fn surface_normal(&self, sf: &SurfaceDesc) -> Vector3<f64> {
        self.transform(sf.transform) * Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_roundtrip() {
        let bcd = Barcode::new(3, SurfaceKind::Sensitive, 42).with_transform(7);
        assert_eq!(bcd.volume(), 3);
        assert_eq!(bcd.kind(), SurfaceKind::Sensitive);
        assert_eq!(bcd.index(), 42);
        assert_eq!(bcd.transform(), 7);
        assert_eq!(bcd.extra(), 0);
        assert!(!bcd.is_invalid());
    }

    #[test]
    fn barcode_invalid() {
        assert!(Barcode::INVALID.is_invalid());
        assert!(Barcode::default().is_invalid());
        assert!(!Barcode::new(0, SurfaceKind::Portal, 0).is_invalid());
    }

    #[test]
    fn barcode_orders_surfaces_within_volume() {
        let a = Barcode::new(0, SurfaceKind::Sensitive, 1);
        let b = Barcode::new(0, SurfaceKind::Sensitive, 2);
        assert_ne!(a, b);
        assert!(b.index() > a.index());
    }

    #[test]
    fn surface_kinds() {
        let portal = SurfaceDesc {
            barcode: Barcode::new(0, SurfaceKind::Portal, 11),
            ..Default::default()
        };
        assert!(portal.is_portal());
        assert!(!portal.is_sensitive());

        let module = SurfaceDesc {
            barcode: Barcode::new(0, SurfaceKind::Sensitive, 0),
            ..Default::default()
        };
        assert!(module.is_sensitive());
        assert!(!module.is_portal());
    }
}
