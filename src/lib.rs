//! Track navigation and surface intersection for layered detector
//! geometries.
//!
//! The crate answers one tight-loop question for reconstruction and
//! simulation pipelines: given a track's current phase-space state, which
//! detector surface does it hit next, and where. A per-track [`navigator`]
//! keeps a cache of intersection candidates that is refreshed according to
//! a trust level, detects volume transitions across portal surfaces, and
//! reports liveness through a heartbeat. The closed-form solvers behind the
//! cache live in [`intersect`] and are dispatched over the mask shapes in
//! [`kernel`].

pub mod detectors;
pub mod geometry;
pub mod grid;
pub mod intersect;
pub mod kernel;
pub mod mask;
pub mod multitrack;
pub mod navigator;
pub mod propagator;
pub mod settings;
pub mod stepper;
pub mod track;

pub use geometry::{Barcode, Detector, SurfaceDesc, SurfaceKind, Volume};
pub use intersect::{Candidate, Status};
pub use navigator::{NavState, NavStatus, TrustLevel};
pub use propagator::{PathLimitAborter, Propagator};
pub use settings::Settings;
pub use stepper::{ConstField, LineStepper, RkStepper};
pub use track::{FreeTrack, Helix, Ray};
