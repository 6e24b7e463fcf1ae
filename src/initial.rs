//! Initial conditions.

use ndarray::Array2;

pub const DEFAULT_SIZE: usize = 64;
pub const DEFAULT_SIGMA: f64 = 0.2;

/// Zero field with a unit value at `(ny / 2, nx / 2)`.
pub fn impulse(ny: usize, nx: usize) -> Array2<f64> {
    let mut u = Array2::zeros((ny, nx));
    if ny > 0 && nx > 0 {
        u[[ny / 2, nx / 2]] = 1.0;
    }
    u
}

/// Gaussian bump `exp(-(x² + y²) / (2σ²))` with x and y spanning [-1, 1].
pub fn gaussian(ny: usize, nx: usize, sigma: f64) -> Array2<f64> {
    let x = linspace(-1.0, 1.0, nx);
    let y = linspace(-1.0, 1.0, ny);
    let two_sigma2 = 2.0 * sigma * sigma;
    Array2::from_shape_fn((ny, nx), |(i, j)| {
        (-(x[j] * x[j] + y[i] * y[i]) / two_sigma2).exp()
    })
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let h = (end - start) / (n - 1) as f64;
            (0..n).map(|k| start + h * k as f64).collect()
        }
    }
}
