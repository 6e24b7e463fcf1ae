//! Explicit finite-difference solver for 2D advection–diffusion of a scalar
//! concentration on a regular grid, with CSV/TOML configuration, CSV field
//! snapshots and PNG rendering.

pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod initial;
pub mod io;
pub mod simulation;
pub mod solver;
pub mod visualisation;

pub use config::Config;
pub use error::{SolverError, SolverResult};
pub use grid::Grid;
pub use simulation::{RunSummary, Simulation, SnapshotWriter};
pub use solver::{apply_dirichlet, max_stable_dt, step, step_parallel, SimulationParams};
