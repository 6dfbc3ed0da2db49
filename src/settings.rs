use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;

/// Millimetre, the base length unit.
pub const MM: f64 = 1.0;
/// Micrometre in base units.
pub const UM: f64 = 1e-3;
/// Centimetre in base units.
pub const CM: f64 = 10.0;
/// Metre in base units.
pub const M: f64 = 1e3;
/// GeV/c, the base momentum unit.
pub const GEV: f64 = 1.0;
/// Tesla in the (mm, GeV, e) unit system, so that a helix radius comes out
/// as r = pT / (|q| B) in mm.
pub const TESLA: f64 = 2.997_924_58e-4;

/// Minimum |normal . direction| for a plane crossing to be solvable.
pub const PLANE_DENOM_EPSILON: f64 = 1e-9;
/// Minimum 1 - (axis . direction)^2 for a wire closest approach to be solvable.
pub const LINE_DENOM_EPSILON: f64 = 1e-5;
/// Transverse direction fraction below which a helix degenerates to a ray.
pub const HELIX_PT_EPSILON: f64 = 1e-6;
/// Convergence tolerance on the path length in Newton refinements.
pub const NEWTON_TOLERANCE: f64 = 1e-6;
/// Iteration cap for Newton refinements on helix intersections.
pub const NEWTON_MAX_ITER: usize = 100;
/// Candidate buffer capacity reserved per volume initialization.
pub const CANDIDATE_RESERVE: usize = 20;

/// Runtime configuration for navigation and the demo runner.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub mask_tolerance: f64,
    pub on_surface_tolerance: f64,
    pub overstep_tolerance: f64,
    pub search_window: [usize; 2],
    #[serde(default = "default_detector")]
    pub detector: String,
    #[serde(default = "default_n_tracks")]
    pub n_tracks: usize,
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    #[serde(default = "default_field")]
    pub field: f64,
    #[serde(default = "default_path_limit")]
    pub path_limit: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_detector() -> String {
    "telescope".to_string()
}

fn default_n_tracks() -> usize {
    1000
}

fn default_momentum() -> f64 {
    1.0 * GEV
}

fn default_field() -> f64 {
    1.0
}

fn default_path_limit() -> f64 {
    200.0 * CM
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mask_tolerance: 15.0 * UM,
            on_surface_tolerance: 1.0 * UM,
            overstep_tolerance: -100.0 * UM,
            search_window: [1, 1],
            detector: default_detector(),
            n_tracks: default_n_tracks(),
            momentum: default_momentum(),
            field: default_field(),
            path_limit: default_path_limit(),
            seed: None,
        }
    }
}

pub fn load_default_config() -> Result<Settings> {
    let root_dir = retrieve_project_root();
    let default_config_file = root_dir.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()?;

    let config: Settings = settings.try_deserialize()?;

    validate_config(&config);

    Ok(config)
}

pub fn load_config() -> Result<Settings> {
    let root_dir = retrieve_project_root();

    let default_config_file = root_dir.join("config/default.toml");
    let local_config = root_dir.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        println!("Using local configuration: {:?}", local_config);
        local_config
    } else {
        println!("Using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(Environment::with_prefix("tracknav"))
        .build()?;

    let mut config: Settings = settings.try_deserialize()?;

    // Parse command-line arguments and override values
    let args = CliArgs::parse();

    if let Some(detector) = args.detector {
        config.detector = detector;
    }
    if let Some(n) = args.tracks {
        config.n_tracks = n;
    }
    if let Some(p) = args.momentum {
        config.momentum = p;
    }
    if let Some(b) = args.field {
        config.field = b;
    }
    if let Some(limit) = args.path_limit {
        config.path_limit = limit;
    }
    if let Some(tol) = args.mask_tol {
        config.mask_tolerance = tol;
    }
    if let Some(tol) = args.overstep_tol {
        config.overstep_tolerance = tol;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    validate_config(&config);

    Ok(config)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the TRACKNAV_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
/// If none of these methods work, the function will panic.
fn retrieve_project_root() -> std::path::PathBuf {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        std::path::PathBuf::from(manifest_dir)
    } else if let Ok(path) = env::var("TRACKNAV_ROOT_DIR") {
        // Allow explicit configuration via environment variable
        std::path::PathBuf::from(path)
    } else {
        // Fallback: walk upward from the executable directory until a
        // "config" subdirectory is found
        let exe_path = env::current_exe().expect("Failed to get current executable path");
        let mut current_dir = exe_path
            .parent()
            .expect("Failed to get executable directory")
            .to_path_buf();

        loop {
            if current_dir.join("config").is_dir() {
                return current_dir;
            }
            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => panic!("Could not find project root directory"),
            }
        }
    }
}

fn validate_config(config: &Settings) {
    assert!(
        config.mask_tolerance >= 0.0,
        "Mask tolerance must not be negative"
    );
    assert!(
        config.on_surface_tolerance > 0.0,
        "On-surface tolerance must be greater than 0"
    );
    assert!(
        config.overstep_tolerance <= 0.0,
        "Overstep tolerance must not be positive"
    );
    assert!(config.path_limit > 0.0, "Path limit must be greater than 0");
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "tracknav - track navigation through layered detector geometries"
)]
pub struct CliArgs {
    /// Test detector to propagate through ("telescope" or "barrel").
    #[arg(short, long)]
    detector: Option<String>,

    /// Number of tracks in the batch.
    #[arg(short = 'n', long)]
    tracks: Option<usize>,

    /// Track momentum magnitude in GeV/c.
    #[arg(short = 'p', long)]
    momentum: Option<f64>,

    /// Magnetic field strength along z in tesla.
    #[arg(long)]
    field: Option<f64>,

    /// Maximum path length per track in mm before the propagation is aborted.
    #[arg(long)]
    path_limit: Option<f64>,

    /// Tolerance added to mask inside-tests, in mm.
    #[arg(long)]
    mask_tol: Option<f64>,

    /// Negative lower bound on acceptable candidate paths, in mm.
    #[arg(long)]
    overstep_tol: Option<f64>,

    /// Random seed for the track gun.
    #[arg(short, long)]
    seed: Option<u64>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Mask Tolerance: {:.6} mm
  - On-Surface Tolerance: {:.6} mm
  - Overstep Tolerance: {:.6} mm
  - Search Window: {:?}
  - Detector: {}
  - Tracks: {}
  - Momentum: {:.3} GeV/c
  - Field: {:.3} T
  - Path Limit: {:.1} mm
  ",
            self.mask_tolerance,
            self.on_surface_tolerance,
            self.overstep_tolerance,
            self.search_window,
            self.detector,
            self.n_tracks,
            self.momentum,
            self.field,
            self.path_limit,
        )
    }
}
