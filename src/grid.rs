use crate::error::{SolverError, SolverResult};

/// Uniform rectangular grid. Fields on it have shape `(ny, nx)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub nx: usize, // Number of points in x direction (columns)
    pub ny: usize, // Number of points in y direction (rows)
    pub dx: f64,   // Grid spacing in x
    pub dy: f64,   // Grid spacing in y
}

impl Grid {
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Self {
        Grid { nx, ny, dx, dy }
    }

    /// Array shape of a field living on this grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Rejects grids whose interior is empty or whose spacing is not positive.
    pub fn validate(&self) -> SolverResult<()> {
        if self.ny < 3 || self.nx < 3 {
            return Err(SolverError::DegenerateGrid {
                ny: self.ny,
                nx: self.nx,
            });
        }
        if !(self.dx > 0.0 && self.dx.is_finite()) || !(self.dy > 0.0 && self.dy.is_finite()) {
            return Err(SolverError::InvalidParameter(format!(
                "grid spacing must be positive (dx={}, dy={})",
                self.dx, self.dy
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_rows_then_columns() {
        let grid = Grid::new(5, 3, 1.0, 2.0);
        assert_eq!(grid.shape(), (3, 5));
    }

    #[test]
    fn degenerate_grid_is_rejected() {
        let err = Grid::new(2, 10, 1.0, 1.0).validate().unwrap_err();
        assert_eq!(err, SolverError::DegenerateGrid { ny: 10, nx: 2 });
        assert!(Grid::new(3, 3, 1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn non_positive_spacing_is_rejected() {
        assert!(matches!(
            Grid::new(8, 8, 0.0, 1.0).validate(),
            Err(SolverError::InvalidParameter(_))
        ));
    }
}
