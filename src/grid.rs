use nalgebra::{Point3, Vector3};
use ndarray::Array2;

use crate::geometry::Transform3;

/// Boundary behaviour of a grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisBounds {
    /// Out-of-range lookups clamp to the edge bins.
    Bounded,
    /// Out-of-range lookups fall outside the grid and return nothing.
    Open,
    /// Out-of-range lookups wrap around (azimuth angles).
    Circular,
}

/// A regularly binned axis of a surface grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub bounds: AxisBounds,
    pub min: f64,
    pub max: f64,
    pub n_bins: usize,
}

impl Axis {
    pub fn new(bounds: AxisBounds, min: f64, max: f64, n_bins: usize) -> Self {
        assert!(max > min, "Axis range must not be empty");
        assert!(n_bins > 0, "Axis must have at least one bin");
        Self {
            bounds,
            min,
            max,
            n_bins,
        }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }

    /// Raw bin index of a value, before any boundary handling.
    fn raw_bin(&self, v: f64) -> i64 {
        ((v - self.min) / self.bin_width()).floor() as i64
    }

    /// Bin index of a value with the axis boundary behaviour applied.
    pub fn bin(&self, v: f64) -> usize {
        match self.bounds {
            AxisBounds::Bounded | AxisBounds::Open => {
                self.raw_bin(v).clamp(0, self.n_bins as i64 - 1) as usize
            }
            AxisBounds::Circular => self.wrap(self.raw_bin(v)),
        }
    }

    /// Half-open raw index range of the search window `[bin - win, bin + win]`.
    ///
    /// For bounded and open axes the range is clipped to the axis; for a
    /// circular axis it may extend below zero or beyond `n_bins` and is
    /// remapped bin by bin during iteration.
    pub fn bin_range(&self, v: f64, win: usize) -> (i64, i64) {
        let center = self.raw_bin(v);
        let win = win as i64;
        let n = self.n_bins as i64;
        match self.bounds {
            AxisBounds::Bounded => {
                let center = center.clamp(0, n - 1);
                ((center - win).max(0), (center + win + 1).min(n))
            }
            AxisBounds::Open => ((center - win).max(0), (center + win + 1).min(n)),
            AxisBounds::Circular => {
                if 2 * win + 1 >= n {
                    (0, n)
                } else {
                    (center - win, center + win + 1)
                }
            }
        }
    }

    /// Remaps a raw index into the axis, or discards it.
    pub fn index(&self, raw: i64) -> Option<usize> {
        match self.bounds {
            AxisBounds::Circular => Some(self.wrap(raw)),
            AxisBounds::Bounded | AxisBounds::Open => {
                (0..self.n_bins as i64).contains(&raw).then_some(raw as usize)
            }
        }
    }

    fn wrap(&self, raw: i64) -> usize {
        raw.rem_euclid(self.n_bins as i64) as usize
    }
}

/// Local projection used to place surfaces and tracks onto the grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFrame {
    /// Axes are (phi, z) on a cylinder barrel.
    CylinderPhiZ,
    /// Axes are (r, phi) on a disc.
    DiscRPhi,
}

/// A 2-D surface lookup structure for one volume.
///
/// Bins hold the indices of the surfaces whose placement centers fall into
/// them. A neighborhood query walks the Cartesian product of the per-axis
/// window ranges lazily and never allocates.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGrid {
    pub frame: GridFrame,
    pub axes: [Axis; 2],
    bins: Array2<Vec<u32>>,
}

impl SurfaceGrid {
    pub fn new(frame: GridFrame, axes: [Axis; 2]) -> Self {
        let shape = (axes[0].n_bins, axes[1].n_bins);
        Self {
            frame,
            axes,
            bins: Array2::from_elem(shape, Vec::new()),
        }
    }

    /// Total number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Projects a global position onto the grid axes, in the volume frame.
    pub fn project(&self, trf: &Transform3, pos: &Point3<f64>, _dir: &Vector3<f64>) -> [f64; 2] {
        let q = trf.inverse_transform_point(pos);
        match self.frame {
            GridFrame::CylinderPhiZ => [q.y.atan2(q.x), q.z],
            GridFrame::DiscRPhi => [q.x.hypot(q.y), q.y.atan2(q.x)],
        }
    }

    /// Files a surface index under the bin of its projected center.
    pub fn populate(&mut self, point: [f64; 2], surface: u32) {
        let b0 = self.axes[0].bin(point[0]);
        let b1 = self.axes[1].bin(point[1]);
        self.bins[[b0, b1]].push(surface);
    }

    /// Contents of a single bin.
    pub fn bin(&self, b0: usize, b1: usize) -> &[u32] {
        &self.bins[[b0, b1]]
    }

    /// Joined contents of all bins in the search window around a point.
    ///
    /// The returned view is lazy: bins are visited in Cartesian-product
    /// order and circular axes remap their indices on the fly.
    pub fn search(
        &self,
        point: [f64; 2],
        window: [usize; 2],
    ) -> impl Iterator<Item = u32> + '_ {
        let (lo0, hi0) = self.axes[0].bin_range(point[0], window[0]);
        let (lo1, hi1) = self.axes[1].bin_range(point[1], window[1]);

        (lo0..hi0)
            .flat_map(move |i0| (lo1..hi1).map(move |i1| (i0, i1)))
            .filter_map(move |(i0, i1)| {
                let b0 = self.axes[0].index(i0)?;
                let b1 = self.axes[1].index(i1)?;
                Some(self.bins[[b0, b1]].iter().copied())
            })
            .flatten()
    }
}
