use std::fmt;
use std::ops::AddAssign;
use std::time::Instant;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::geometry::Detector;
use crate::navigator::ObjectTracer;
use crate::propagator::{PathLimitAborter, Propagator};
use crate::settings::{Settings, TESLA};
use crate::stepper::{ConstField, RkStepper};
use crate::track::FreeTrack;

/// Aggregated outcome of a propagation batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchSummary {
    pub n_tracks: usize,       // tracks propagated
    pub completed: usize,      // tracks that exited the detector
    pub aborted: usize,        // tracks stopped by the path limit
    pub sensitive_hits: usize, // module encounters over the batch
    pub portal_crossings: usize,
    pub total_path: f64, // accumulated path length over the batch
}

impl AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.n_tracks += other.n_tracks;
        self.completed += other.completed;
        self.aborted += other.aborted;
        self.sensitive_hits += other.sensitive_hits;
        self.portal_crossings += other.portal_crossings;
        self.total_path += other.total_path;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch summary:")?;
        writeln!(f, "  Tracks:           {}", self.n_tracks)?;
        writeln!(f, "  Completed:        {}", self.completed)?;
        writeln!(f, "  Aborted:          {}", self.aborted)?;
        writeln!(f, "  Sensitive hits:   {}", self.sensitive_hits)?;
        writeln!(f, "  Portal crossings: {}", self.portal_crossings)?;
        writeln!(
            f,
            "  Mean path:        {:.1} mm",
            self.total_path / self.n_tracks.max(1) as f64
        )
    }
}

/// Propagates a batch of independent tracks through one detector in
/// parallel. Tracks share the read-only geometry; every lane owns its own
/// navigation state and candidate buffer.
#[derive(Debug)]
pub struct MultiTrack<'d> {
    pub detector: &'d Detector,
    pub settings: Settings,
}

impl<'d> MultiTrack<'d> {
    pub fn new(detector: &'d Detector, settings: Settings) -> Self {
        Self { detector, settings }
    }

    /// Fires `n_tracks` random tracks from the origin and reduces their
    /// outcomes into one summary.
    pub fn solve(&self) -> BatchSummary {
        let start = Instant::now();
        println!("Propagating {} tracks...", self.settings.n_tracks);

        let tracks = self.generate_tracks();
        let field = ConstField::new(Vector3::new(0.0, 0.0, self.settings.field * TESLA));
        let propagator = Propagator::new(RkStepper::new(field));

        let m = MultiProgress::new();
        let pb = m.add(ProgressBar::new(tracks.len() as u64));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
            )
            .unwrap()
            .progress_chars("█▇▆▅▄▃▂▁"),
        );
        pb.set_message("tracks".to_string());

        let summary = tracks
            .par_iter()
            .map(|track| {
                let mut aborter = PathLimitAborter::new(self.settings.path_limit);
                let result = propagator.propagate(
                    *track,
                    self.detector,
                    0,
                    &self.settings,
                    ObjectTracer::default(),
                    &mut aborter,
                );

                let trace = &result.navigation.inspector().trace;
                let summary = BatchSummary {
                    n_tracks: 1,
                    completed: result.navigation.is_complete() as usize,
                    aborted: !result.navigation.is_complete() as usize,
                    sensitive_hits: trace.iter().filter(|c| c.sf.is_sensitive()).count(),
                    portal_crossings: trace.iter().filter(|c| c.sf.is_portal()).count(),
                    total_path: result.stepping.path_length.abs(),
                };
                pb.inc(1);
                summary
            })
            .reduce(BatchSummary::default, |mut acc, local| {
                acc += local;
                acc
            });

        pb.finish_with_message("(done)".to_string());
        let duration = start.elapsed();
        println!(
            "Time taken: {:.2?}, Time per track: {:.2?}",
            duration,
            duration / tracks.len().max(1) as u32
        );

        summary
    }

    /// Random track gun: a narrow forward cone for the telescope, a
    /// transverse spray for barrel-type detectors.
    fn generate_tracks(&self) -> Vec<FreeTrack> {
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let p = self.settings.momentum;
        let longitudinal = self.settings.detector == "telescope";

        (0..self.settings.n_tracks)
            .map(|i| {
                let phi = rng.random_range(-std::f64::consts::PI..std::f64::consts::PI);
                let cos_theta: f64 = if longitudinal {
                    rng.random_range(0.995..1.0)
                } else {
                    rng.random_range(-0.3..0.3)
                };
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
                let mom = p * Vector3::new(
                    sin_theta * phi.cos(),
                    sin_theta * phi.sin(),
                    cos_theta,
                );
                let q = if i % 2 == 0 { -1.0 } else { 1.0 };
                FreeTrack::new(Point3::origin(), 0.0, mom, q)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors;

    #[test]
    fn telescope_batch_completes() {
        let positions: Vec<f64> = (0..11).map(|i| 10.0 * i as f64).collect();
        let det = detectors::telescope(&positions, f64::INFINITY, 0.2);
        let settings = Settings {
            n_tracks: 8,
            seed: Some(42),
            ..Default::default()
        };

        let summary = MultiTrack::new(&det, settings).solve();
        assert_eq!(summary.n_tracks, 8);
        assert_eq!(summary.completed, 8);
        // every track crosses all eleven modules and the exit portal
        assert_eq!(summary.sensitive_hits, 8 * 11);
        assert_eq!(summary.portal_crossings, 8);
    }

    #[test]
    fn batch_summaries_accumulate() {
        let mut acc = BatchSummary::default();
        acc += BatchSummary {
            n_tracks: 2,
            completed: 1,
            aborted: 1,
            sensitive_hits: 5,
            portal_crossings: 1,
            total_path: 100.0,
        };
        acc += BatchSummary {
            n_tracks: 1,
            completed: 1,
            aborted: 0,
            sensitive_hits: 3,
            portal_crossings: 1,
            total_path: 50.0,
        };
        assert_eq!(acc.n_tracks, 3);
        assert_eq!(acc.completed, 2);
        assert_eq!(acc.sensitive_hits, 8);
        assert_eq!(acc.total_path, 150.0);
    }
}
