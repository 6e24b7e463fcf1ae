use thiserror::Error;

/// Failures detected by the solver before or at the start of a run.
///
/// All of these are deterministic functions of the configuration and the
/// initial field, so none of them are retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Initial field dimensions disagree with the configured grid.
    #[error(
        "initial condition shape ({}, {}) does not match config (ny={}, nx={})",
        found.0, found.1, expected.0, expected.1
    )]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Configured time step exceeds the explicit diffusion bound.
    #[error("unstable time step: dt={dt} > dt_max={dt_max:.3}; reduce dt or D")]
    InstabilityRisk { dt: f64, dt_max: f64 },

    /// Grid has no interior cells to update.
    #[error("grid too small: ny={ny}, nx={nx} (both must be at least 3)")]
    DegenerateGrid { ny: usize, nx: usize },

    /// Parameter outside its physical range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type SolverResult<T> = Result<T, SolverError>;
