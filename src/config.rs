use crate::grid::Grid;
use crate::solver::{SimulationParams, DEFAULT_BOUNDARY_VALUE};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    #[serde(default = "default_spacing")]
    pub dx: f64,
    #[serde(default = "default_spacing")]
    pub dy: f64,
}

fn default_spacing() -> f64 {
    1.0
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        self.grid().validate()?;
        Ok(())
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.nx, self.ny, self.dx, self.dy)
    }
}

/// Transport coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub d: f64, // Diffusion coefficient
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
}

impl PhysicsConfig {
    fn validate(&self) -> Result<()> {
        if !(self.d >= 0.0 && self.d.is_finite()) {
            return Err(anyhow!("Diffusion coefficient must be non-negative, got {}", self.d));
        }
        if !self.vx.is_finite() || !self.vy.is_finite() {
            return Err(anyhow!("Velocities must be finite (vx={}, vy={})", self.vx, self.vy));
        }
        Ok(())
    }
}

/// Time stepping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub dt: f64,
    pub nsteps: usize,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: usize,
    #[serde(default = "default_boundary_value")]
    pub boundary_value: f64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_snapshot_interval() -> usize {
    200
}

fn default_boundary_value() -> f64 {
    DEFAULT_BOUNDARY_VALUE
}

fn default_parallel() -> bool {
    true
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(anyhow!("dt must be positive, got {}", self.dt));
        }
        if self.snapshot_interval == 0 {
            return Err(anyhow!("snapshot_interval must be positive"));
        }
        if !self.boundary_value.is_finite() {
            return Err(anyhow!("boundary_value must be finite, got {}", self.boundary_value));
        }
        Ok(())
    }

    pub fn total_time(&self) -> f64 {
        self.nsteps as f64 * self.dt
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_plot")]
    pub plot: bool,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_plot() -> bool {
    true
}

fn default_image_width() -> u32 {
    600
}

fn default_image_height() -> u32 {
    480
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            plot: default_plot(),
            image_width: default_image_width(),
            image_height: default_image_height(),
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    pub physics: PhysicsConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Loads `*.csv` as the flat `key,value` format, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        let is_csv = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
        let config = if is_csv {
            Self::from_key_value_csv(&content)
        } else {
            Self::from_toml_str(&content)
        };
        config.with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Flat format with a `key,value` header and rows such as `nx,64` or
    /// `D,0.1`. Keys `nx, ny, D, vx, vy, dt, nsteps` are required.
    pub fn from_key_value_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut entries: HashMap<String, f64> = HashMap::new();
        for result in reader.records() {
            let record = result.context("Failed to read key,value row")?;
            let line = record.position().map_or(0, |p| p.line());
            let key = record.get(0).unwrap_or_default();
            if key.is_empty() {
                continue;
            }
            // Columns past the value are ignored.
            let raw = record
                .get(1)
                .ok_or_else(|| anyhow!("line {}: missing value for '{}'", line, key))?;
            let value: f64 = raw
                .parse()
                .map_err(|_| anyhow!("line {}: cannot parse '{}' for '{}'", line, raw, key))?;
            entries.insert(key.to_string(), value);
        }

        let get = |key: &str| {
            entries
                .get(key)
                .copied()
                .ok_or_else(|| anyhow!("missing key '{}'", key))
        };
        let count = |key: &str| -> Result<usize> {
            let v = get(key)?;
            if v < 0.0 || v.fract() != 0.0 {
                return Err(anyhow!("'{}' must be a non-negative integer, got {}", key, v));
            }
            Ok(v as usize)
        };

        let config = Config {
            grid: GridConfig {
                nx: count("nx")?,
                ny: count("ny")?,
                dx: default_spacing(),
                dy: default_spacing(),
            },
            physics: PhysicsConfig {
                d: get("D")?,
                vx: get("vx")?,
                vy: get("vy")?,
            },
            simulation: SimulationConfig {
                dt: get("dt")?,
                nsteps: count("nsteps")?,
                snapshot_interval: default_snapshot_interval(),
                boundary_value: default_boundary_value(),
                parallel: default_parallel(),
            },
            output: OutputConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.physics.validate()?;
        self.simulation.validate()?;
        self.output.validate()?;

        if self.simulation.nsteps == 0 {
            warn!("nsteps is 0, only the initial snapshot will be written");
        }
        Ok(())
    }

    pub fn grid(&self) -> Grid {
        self.grid.grid()
    }

    /// Per-step parameters handed to the solver.
    pub fn params(&self) -> SimulationParams {
        SimulationParams::new(
            self.physics.d,
            self.physics.vx,
            self.physics.vy,
            self.simulation.dt,
            self.grid.dx,
            self.grid.dy,
        )
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        info!(
            "Grid: {}x{} (dx={}, dy={})",
            self.grid.nx, self.grid.ny, self.grid.dx, self.grid.dy
        );
        info!(
            "Physics: D={}, vx={}, vy={}",
            self.physics.d, self.physics.vx, self.physics.vy
        );
        info!(
            "Simulation: dt={}, nsteps={}, total_time={}, snapshot every {} steps",
            self.simulation.dt,
            self.simulation.nsteps,
            self.simulation.total_time(),
            self.simulation.snapshot_interval
        );
        if self.physics.d > 0.0 {
            info!("Stability bound: dt_max={:.4}", self.params().max_stable_dt());
        }
        info!(
            "Output: {} (plots {})",
            self.output.dir.display(),
            if self.output.plot { "on" } else { "off" }
        );
    }
}
