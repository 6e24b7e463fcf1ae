use crate::config::Config;
use crate::error::{SolverError, SolverResult};
use crate::field;
use crate::grid::Grid;
use crate::io::write_field_csv;
use crate::solver::{apply_dirichlet, step, step_parallel, SimulationParams};
use crate::visualisation::FieldVisualiser;
use anyhow::{Context, Result};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persists snapshots as `field_<n>.csv` (and `field_<n>.png` when plotting).
pub struct SnapshotWriter {
    dir: PathBuf,
    visualiser: Option<FieldVisualiser>,
    written: Vec<PathBuf>,
}

impl SnapshotWriter {
    pub fn new(dir: &Path, visualiser: Option<FieldVisualiser>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            visualiser,
            written: Vec::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let visualiser = config
            .output
            .plot
            .then(|| FieldVisualiser::new(config.output.image_width, config.output.image_height));
        Self::new(&config.output.dir, visualiser)
    }

    pub fn csv_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("field_{}.csv", index))
    }

    pub fn plot_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("field_{}.png", index))
    }

    pub fn write_field(&mut self, index: usize, u: &Array2<f64>) -> Result<()> {
        let path = self.csv_path(index);
        write_field_csv(&path, u)?;
        debug!("Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }

    /// Renders a frame when plotting is enabled. Rendering failures are
    /// logged and do not stop the run.
    pub fn plot_field(&mut self, index: usize, u: &Array2<f64>, title: &str) {
        if let Some(visualiser) = &self.visualiser {
            let plot_path = self.plot_path(index);
            match visualiser.plot_field(u, &plot_path, title) {
                Ok(()) => self.written.push(plot_path),
                Err(e) => warn!("Failed to visualise: {:#}", e),
            }
        }
    }

    /// Run manifest: every file written so far, in order. An index written
    /// twice (snapshot 0) is listed twice.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

/// Outcome of [`Simulation::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub initial_mass: f64,
    pub final_mass: f64,
    pub final_peak: f64,
    pub files_written: usize,
}

pub struct Simulation {
    pub grid: Grid,
    pub params: SimulationParams,
    field: Array2<f64>,
    boundary_value: f64,
    parallel: bool,
    current_step: usize,
}

impl Simulation {
    /// Checks the initial field against the grid and `dt` against the
    /// stability bound, then applies the boundary condition.
    pub fn new(
        grid: Grid,
        params: SimulationParams,
        initial: Array2<f64>,
        boundary_value: f64,
    ) -> SolverResult<Self> {
        grid.validate()?;
        params.validate()?;
        if params.dx != grid.dx || params.dy != grid.dy {
            return Err(SolverError::InvalidParameter(format!(
                "step spacing (dx={}, dy={}) differs from grid spacing (dx={}, dy={})",
                params.dx, params.dy, grid.dx, grid.dy
            )));
        }
        if initial.dim() != grid.shape() {
            return Err(SolverError::ShapeMismatch {
                expected: grid.shape(),
                found: initial.dim(),
            });
        }
        params.check_stability()?;

        let mut field = initial;
        apply_dirichlet(&mut field, boundary_value);

        Ok(Self {
            grid,
            params,
            field,
            boundary_value,
            parallel: false,
            current_step: 0,
        })
    }

    pub fn from_config(config: &Config, initial: Array2<f64>) -> SolverResult<Self> {
        Ok(Self::new(
            config.grid(),
            config.params(),
            initial,
            config.simulation.boundary_value,
        )?
        .with_parallel(config.simulation.parallel))
    }

    /// Use the rayon-backed step.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn field(&self) -> &Array2<f64> {
        &self.field
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn current_time(&self) -> f64 {
        self.current_step as f64 * self.params.dt
    }

    /// One step followed by the boundary condition.
    pub fn step(&mut self) -> SolverResult<()> {
        let mut next = if self.parallel {
            step_parallel(&self.field, self.params)?
        } else {
            step(&self.field, self.params)?
        };
        apply_dirichlet(&mut next, self.boundary_value);
        self.field = next;
        self.current_step += 1;
        Ok(())
    }

    fn title(&self, step: usize) -> String {
        format!(
            "Advection–diffusion (D={}, vx={}, vy={}, dt={}, step={})",
            self.params.d, self.params.vx, self.params.vy, self.params.dt, step
        )
    }

    /// Runs `nsteps` steps, writing snapshot 0 first and then a snapshot
    /// after every step whose 0-based counter is a multiple of
    /// `snapshot_interval`, named by that counter.
    pub fn run(
        &mut self,
        nsteps: usize,
        snapshot_interval: usize,
        output: &mut SnapshotWriter,
    ) -> Result<RunSummary> {
        let snapshot_interval = snapshot_interval.max(1);
        info!("Starting simulation...");
        info!("Grid: {}x{}", self.grid.nx, self.grid.ny);
        info!("Time step: {} ({} steps)", self.params.dt, nsteps);
        if self.parallel {
            info!("Stepping on {} threads", rayon::current_num_threads());
        }

        let initial_mass = field::total_mass(&self.field);
        output.write_field(0, &self.field)?;

        for j in 0..nsteps {
            self.step()?;

            if j % snapshot_interval == 0 {
                output.write_field(j, &self.field)?;
                let title = self.title(j);
                output.plot_field(j, &self.field, &title);
                info!(
                    "Step {}/{} (t={:.4}, mass={:.6e})",
                    self.current_step,
                    nsteps,
                    self.current_time(),
                    field::total_mass(&self.field)
                );
            }
        }

        if !field::is_finite(&self.field) {
            warn!("Field contains non-finite values; dt may be too large for the advection speed");
        }

        let summary = RunSummary {
            steps: nsteps,
            initial_mass,
            final_mass: field::total_mass(&self.field),
            final_peak: field::peak(&self.field),
            files_written: output.written().len(),
        };
        info!(
            "Simulation complete! mass {:.6e} -> {:.6e}, peak {:.6e}",
            summary.initial_mass, summary.final_mass, summary.final_peak
        );
        Ok(summary)
    }
}
