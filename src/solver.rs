//! Explicit finite-difference stepping for 2D advection–diffusion.
//!
//! du/dt = D (d2u/dx2 + d2u/dy2) - vx du/dx - vy du/dy
//!
//! Diffusion uses the 5-point Laplacian, advection a first-order upwind
//! difference picked from the sign of each velocity component. Both terms
//! are evaluated from the same pre-step field (forward Euler), so the
//! update of one cell never reads a value written during the same step.
//!
//! Fields are `Array2<f64>` with shape `(ny, nx)`; index `[[i, j]]` is
//! row `i` (y) and column `j` (x).

use crate::error::{SolverError, SolverResult};
use ndarray::{s, Array2, Zip};

/// Boundary value used when none is configured.
pub const DEFAULT_BOUNDARY_VALUE: f64 = 0.0;

/// Physical and numerical parameters for a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub d: f64,  // Diffusion coefficient
    pub vx: f64, // Advection velocity in x
    pub vy: f64, // Advection velocity in y
    pub dt: f64, // Time step
    pub dx: f64, // Grid spacing in x
    pub dy: f64, // Grid spacing in y
}

impl SimulationParams {
    pub fn new(d: f64, vx: f64, vy: f64, dt: f64, dx: f64, dy: f64) -> Self {
        Self {
            d,
            vx,
            vy,
            dt,
            dx,
            dy,
        }
    }

    /// Checks physical ranges: `d >= 0`, `dt, dx, dy > 0`, everything finite.
    pub fn validate(&self) -> SolverResult<()> {
        let all = [self.d, self.vx, self.vy, self.dt, self.dx, self.dy];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::InvalidParameter(format!(
                "parameters must be finite: {:?}",
                self
            )));
        }
        if self.d < 0.0 {
            return Err(SolverError::InvalidParameter(format!(
                "diffusion coefficient must be non-negative, got {}",
                self.d
            )));
        }
        if self.dt <= 0.0 {
            return Err(SolverError::InvalidParameter(format!(
                "time step must be positive, got {}",
                self.dt
            )));
        }
        if self.dx <= 0.0 || self.dy <= 0.0 {
            return Err(SolverError::InvalidParameter(format!(
                "grid spacing must be positive (dx={}, dy={})",
                self.dx, self.dy
            )));
        }
        Ok(())
    }

    pub fn max_stable_dt(&self) -> f64 {
        max_stable_dt(self.d, self.dx, self.dy)
    }

    /// Fails with `InstabilityRisk` when diffusion is present and `dt`
    /// exceeds the explicit bound. Pure advection is not checked.
    pub fn check_stability(&self) -> SolverResult<()> {
        if self.d > 0.0 {
            let dt_max = self.max_stable_dt();
            if self.dt > dt_max {
                return Err(SolverError::InstabilityRisk {
                    dt: self.dt,
                    dt_max,
                });
            }
        }
        Ok(())
    }
}

/// Largest stable time step for explicit 2D diffusion on a 5-point stencil:
/// `dt <= 0.5 * dx² dy² / (D (dx² + dy²))`.
///
/// Only meaningful for `d > 0`; with `d == 0` the result is `+inf`.
pub fn max_stable_dt(d: f64, dx: f64, dy: f64) -> f64 {
    0.5 * (dx * dx * dy * dy) / (d * (dx * dx + dy * dy))
}

/// Sets every cell of the first/last row and column to `value`.
///
/// Interior cells are not touched. Fields with a single row or column are
/// overwritten entirely; an empty array is left as is.
pub fn apply_dirichlet(field: &mut Array2<f64>, value: f64) {
    let (ny, nx) = field.dim();
    if ny == 0 || nx == 0 {
        return;
    }
    field.row_mut(0).fill(value);
    field.row_mut(ny - 1).fill(value);
    field.column_mut(0).fill(value);
    field.column_mut(nx - 1).fill(value);
}

/// Advances `field` by one explicit step, returning a new array.
///
/// Only interior cells (rows `1..ny-1`, columns `1..nx-1`) are updated; the
/// border is copied from the input. Boundary conditions are the caller's job.
/// Stability (`dt <= max_stable_dt`) is not checked here.
pub fn step(field: &Array2<f64>, params: SimulationParams) -> SolverResult<Array2<f64>> {
    let (ny, nx) = interior_dim(field)?;
    let stencil = Stencil::new(params);

    let mut next = field.clone();
    for i in 1..ny - 1 {
        for j in 1..nx - 1 {
            next[[i, j]] = stencil.advance(field, i, j);
        }
    }
    Ok(next)
}

/// Same update as [`step`], with interior cells split across the rayon pool.
///
/// Every worker reads the same input and writes disjoint output cells, and the
/// per-cell arithmetic is identical, so the result is bit-identical to `step`.
pub fn step_parallel(field: &Array2<f64>, params: SimulationParams) -> SolverResult<Array2<f64>> {
    let (ny, nx) = interior_dim(field)?;
    let stencil = Stencil::new(params);

    let mut next = field.clone();
    Zip::indexed(next.slice_mut(s![1..ny - 1, 1..nx - 1])).par_for_each(|(i, j), cell| {
        *cell = stencil.advance(field, i + 1, j + 1);
    });
    Ok(next)
}

fn interior_dim(field: &Array2<f64>) -> SolverResult<(usize, usize)> {
    let (ny, nx) = field.dim();
    if ny < 3 || nx < 3 {
        return Err(SolverError::DegenerateGrid { ny, nx });
    }
    Ok((ny, nx))
}

type Difference = fn(f64, f64, f64, f64) -> f64;

fn backward_difference(behind: f64, centre: f64, _ahead: f64, h: f64) -> f64 {
    (centre - behind) / h
}

fn forward_difference(_behind: f64, centre: f64, ahead: f64, h: f64) -> f64 {
    (ahead - centre) / h
}

/// Upwind first derivative for a velocity component. The choice depends only
/// on the sign of `v`, so it is made once per step.
fn upwind(v: f64) -> Difference {
    if v >= 0.0 {
        backward_difference
    } else {
        forward_difference
    }
}

/// Per-step constants of the update, resolved once before the cell loop.
struct Stencil {
    d: f64,
    vx: f64,
    vy: f64,
    dt: f64,
    dx: f64,
    dy: f64,
    dx2: f64,
    dy2: f64,
    dudx: Difference,
    dudy: Difference,
}

impl Stencil {
    fn new(p: SimulationParams) -> Self {
        Self {
            d: p.d,
            vx: p.vx,
            vy: p.vy,
            dt: p.dt,
            dx: p.dx,
            dy: p.dy,
            dx2: p.dx * p.dx,
            dy2: p.dy * p.dy,
            dudx: upwind(p.vx),
            dudy: upwind(p.vy),
        }
    }

    #[inline]
    fn advance(&self, u: &Array2<f64>, i: usize, j: usize) -> f64 {
        let centre = u[[i, j]];
        let west = u[[i, j - 1]];
        let east = u[[i, j + 1]];
        let south = u[[i - 1, j]];
        let north = u[[i + 1, j]];

        // Diffusion
        let d2udx2 = (east - 2.0 * centre + west) / self.dx2;
        let d2udy2 = (north - 2.0 * centre + south) / self.dy2;
        let mut next = centre + self.dt * (self.d * (d2udx2 + d2udy2));

        // Advection
        let dudx = (self.dudx)(west, centre, east, self.dx);
        let dudy = (self.dudy)(south, centre, north, self.dy);
        next += -self.dt * (self.vx * dudx + self.vy * dudy);

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use crate::initial::impulse;
    use approx::assert_relative_eq;

    fn diffusion_only(d: f64) -> SimulationParams {
        let dt = 0.5 * max_stable_dt(d, 1.0, 1.0);
        SimulationParams::new(d, 0.0, 0.0, dt, 1.0, 1.0)
    }

    fn run(mut u: Array2<f64>, params: SimulationParams, steps: usize) -> Array2<f64> {
        apply_dirichlet(&mut u, 0.0);
        for _ in 0..steps {
            u = step(&u, params).unwrap();
            apply_dirichlet(&mut u, 0.0);
        }
        u
    }

    // Non-trivial field with distinct values everywhere.
    fn ramp(ny: usize, nx: usize) -> Array2<f64> {
        Array2::from_shape_fn((ny, nx), |(i, j)| {
            ((i * 7 + j * 3) % 11) as f64 * 0.13 + (i as f64 * 0.21).sin()
        })
    }

    #[test]
    fn stability_bound_for_unit_spacing() {
        assert_relative_eq!(max_stable_dt(0.1, 1.0, 1.0), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn stability_bound_for_anisotropic_spacing() {
        // 0.5 * (1 * 4) / (0.1 * 5)
        assert_relative_eq!(max_stable_dt(0.1, 1.0, 2.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn stability_bound_without_diffusion_is_unbounded() {
        assert!(max_stable_dt(0.0, 1.0, 1.0).is_infinite());
    }

    #[test]
    fn check_stability_rejects_large_dt() {
        let params = SimulationParams::new(0.1, 0.0, 0.0, 3.0, 1.0, 1.0);
        match params.check_stability() {
            Err(SolverError::InstabilityRisk { dt, dt_max }) => {
                assert_eq!(dt, 3.0);
                assert_relative_eq!(dt_max, 2.5, epsilon = 1e-12);
            }
            other => panic!("expected InstabilityRisk, got {:?}", other),
        }
        assert!(SimulationParams::new(0.1, 0.0, 0.0, 2.5, 1.0, 1.0)
            .check_stability()
            .is_ok());
        // No diffusion, no bound.
        assert!(SimulationParams::new(0.0, 1.0, 0.0, 100.0, 1.0, 1.0)
            .check_stability()
            .is_ok());
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let ok = SimulationParams::new(0.1, -0.5, 0.2, 0.01, 1.0, 1.0);
        assert!(ok.validate().is_ok());
        for bad in [
            SimulationParams { d: -0.1, ..ok },
            SimulationParams { dt: 0.0, ..ok },
            SimulationParams { dx: -1.0, ..ok },
            SimulationParams { vy: f64::NAN, ..ok },
        ] {
            assert!(matches!(bad.validate(), Err(SolverError::InvalidParameter(_))));
        }
    }

    #[test]
    fn dirichlet_sets_border_and_keeps_interior() {
        let before = ramp(6, 9);
        let mut after = before.clone();
        apply_dirichlet(&mut after, -1.5);

        let (ny, nx) = after.dim();
        for i in 0..ny {
            for j in 0..nx {
                if i == 0 || j == 0 || i == ny - 1 || j == nx - 1 {
                    assert_eq!(after[[i, j]], -1.5);
                } else {
                    assert_eq!(after[[i, j]].to_bits(), before[[i, j]].to_bits());
                }
            }
        }
    }

    #[test]
    fn dirichlet_overwrites_degenerate_fields() {
        let mut row = Array2::from_elem((1, 5), 3.0);
        apply_dirichlet(&mut row, 0.0);
        assert!(row.iter().all(|&v| v == 0.0));

        let mut column = Array2::from_elem((4, 2), 3.0);
        apply_dirichlet(&mut column, 1.0);
        assert!(column.iter().all(|&v| v == 1.0));

        let mut empty = Array2::<f64>::zeros((0, 3));
        apply_dirichlet(&mut empty, 1.0);
        assert_eq!(empty.dim(), (0, 3));
    }

    #[test]
    fn single_step_matches_hand_computation() {
        let mut u = Array2::zeros((3, 3));
        u[[1, 1]] = 1.0;

        let pure_diffusion = SimulationParams::new(0.1, 0.0, 0.0, 1.0, 1.0, 1.0);
        let next = step(&u, pure_diffusion).unwrap();
        assert_relative_eq!(next[[1, 1]], 0.6, epsilon = 1e-15);

        // Backward difference in x: du/dx = (1 - 0) / 1
        let with_flow = SimulationParams { vx: 0.5, ..pure_diffusion };
        let next = step(&u, with_flow).unwrap();
        assert_relative_eq!(next[[1, 1]], 0.1, epsilon = 1e-15);

        // Forward difference in y: du/dy = (0 - 1) / 1
        let upward = SimulationParams { vy: -0.25, ..pure_diffusion };
        let next = step(&u, upward).unwrap();
        assert_relative_eq!(next[[1, 1]], 0.35, epsilon = 1e-15);
    }

    #[test]
    fn single_step_on_anisotropic_grid() {
        // Rows are y: row 0 is south of the centre, row 2 north.
        let u = ndarray::array![[0.0, 0.2, 0.0], [0.1, 1.0, 0.3], [0.0, 0.4, 0.0]];
        let params = SimulationParams::new(0.1, 0.5, -0.2, 0.05, 1.0, 0.5);

        // d2x = (0.3 - 2 + 0.1) / 1 = -1.6, d2y = (0.4 - 2 + 0.2) / 0.25 = -5.6
        // dudx = (1 - 0.1) / 1 = 0.9 (backward), dudy = (0.4 - 1) / 0.5 = -1.2 (forward)
        // 1 + 0.05 * 0.1 * -7.2 - 0.05 * (0.5 * 0.9 + -0.2 * -1.2)
        let next = step(&u, params).unwrap();
        assert_relative_eq!(next[[1, 1]], 0.9295, epsilon = 1e-12);

        // dudx = (0.3 - 1) / 1 = -0.7 (forward), dudy = (1 - 0.2) / 0.5 = 1.6 (backward)
        let reversed = SimulationParams { vx: -0.5, vy: 0.2, ..params };
        let next = step(&u, reversed).unwrap();
        assert_relative_eq!(next[[1, 1]], 0.9305, epsilon = 1e-12);
    }

    #[test]
    fn step_rejects_degenerate_grid() {
        let params = diffusion_only(0.1);
        for shape in [(2usize, 5usize), (5, 2), (1, 1), (0, 0)] {
            let u = Array2::zeros(shape);
            assert_eq!(
                step(&u, params).unwrap_err(),
                SolverError::DegenerateGrid {
                    ny: shape.0,
                    nx: shape.1
                }
            );
            assert!(step_parallel(&u, params).is_err());
        }
    }

    #[test]
    fn step_leaves_border_untouched() {
        let u = ramp(7, 10);
        let params = SimulationParams::new(0.2, 0.3, -0.4, 0.1, 1.0, 1.0);
        let next = step(&u, params).unwrap();

        let (ny, nx) = u.dim();
        for j in 0..nx {
            assert_eq!(next[[0, j]], u[[0, j]]);
            assert_eq!(next[[ny - 1, j]], u[[ny - 1, j]]);
        }
        for i in 0..ny {
            assert_eq!(next[[i, 0]], u[[i, 0]]);
            assert_eq!(next[[i, nx - 1]], u[[i, nx - 1]]);
        }
        // Interior did change.
        assert_ne!(next, u);
    }

    #[test]
    fn step_is_deterministic_and_does_not_touch_input() {
        let u = ramp(16, 12);
        let snapshot = u.clone();
        let params = SimulationParams::new(0.1, -0.3, 0.7, 0.2, 1.0, 0.5);

        let a = step(&u, params).unwrap();
        let b = step(&u, params).unwrap();
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
        assert_eq!(u, snapshot);
    }

    #[test]
    fn parallel_step_is_bit_identical_to_serial() {
        let u = ramp(33, 41);
        for (vx, vy) in [(0.4, 0.2), (-0.4, 0.2), (0.4, -0.2), (-0.1, -0.3)] {
            let params = SimulationParams::new(0.05, vx, vy, 0.3, 1.0, 1.0);
            let serial = step(&u, params).unwrap();
            let parallel = step_parallel(&u, params).unwrap();
            assert!(serial
                .iter()
                .zip(parallel.iter())
                .all(|(x, y)| x.to_bits() == y.to_bits()));
        }
    }

    #[test]
    fn pure_diffusion_stays_non_negative() {
        let params = diffusion_only(0.1);
        let u = run(impulse(32, 32), params, 50);
        assert!(u.iter().all(|&v| v >= -1e-12));
    }

    #[test]
    fn dirichlet_walls_remove_mass() {
        let params = diffusion_only(0.1);
        let mut u = impulse(32, 32);
        apply_dirichlet(&mut u, 0.0);
        let initial_mass = field::total_mass(&u);

        let u = run(u, params, 50);
        assert!(field::total_mass(&u) < initial_mass);
        assert!(u[[16, 16]] < 1.0);
        assert!(field::peak(&u) < 1.0);
    }

    #[test]
    fn positive_velocity_moves_impulse_downstream() {
        let params = SimulationParams::new(0.0, 0.5, 0.0, 0.5, 1.0, 1.0);
        let mut u = impulse(32, 32);
        let mut previous = field::centroid(&u).1;
        for _ in 0..10 {
            u = step(&u, params).unwrap();
            apply_dirichlet(&mut u, 0.0);
            let (_, x) = field::centroid(&u);
            assert!(x > previous);
            previous = x;
        }
        // Upwind transport speed: vx * dt per step, 10 steps.
        assert_relative_eq!(previous, 16.0 + 2.5, epsilon = 1e-9);
        assert_relative_eq!(field::centroid(&u).0, 16.0, epsilon = 1e-12);
    }

    #[test]
    fn negative_velocity_moves_impulse_upstream() {
        let params = SimulationParams::new(0.0, -0.5, 0.0, 0.5, 1.0, 1.0);
        let u = run(impulse(32, 32), params, 10);
        assert_relative_eq!(field::centroid(&u).1, 16.0 - 2.5, epsilon = 1e-9);
    }

    #[test]
    fn vertical_velocity_moves_impulse_along_rows() {
        let params = SimulationParams::new(0.0, 0.0, 0.25, 1.0, 1.0, 1.0);
        let u = run(impulse(32, 32), params, 8);
        let (y, x) = field::centroid(&u);
        assert_relative_eq!(y, 16.0 + 2.0, epsilon = 1e-9);
        assert_relative_eq!(x, 16.0, epsilon = 1e-12);
    }
}
