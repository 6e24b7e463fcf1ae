use ndarray::Array2;

/// Sum of all cells.
pub fn total_mass(u: &Array2<f64>) -> f64 {
    u.sum()
}

/// Largest cell value, `-inf` for an empty field.
pub fn peak(u: &Array2<f64>) -> f64 {
    u.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Smallest cell value, `+inf` for an empty field.
pub fn minimum(u: &Array2<f64>) -> f64 {
    u.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Mass-weighted mean position `(row, column)` in grid indices.
///
/// Returns `(NaN, NaN)` when the total mass is zero.
pub fn centroid(u: &Array2<f64>) -> (f64, f64) {
    let mass = total_mass(u);
    let mut y = 0.0;
    let mut x = 0.0;
    for ((i, j), &v) in u.indexed_iter() {
        y += i as f64 * v;
        x += j as f64 * v;
    }
    (y / mass, x / mass)
}

/// True when every cell of the outer ring equals `value`.
pub fn border_equals(u: &Array2<f64>, value: f64) -> bool {
    let (ny, nx) = u.dim();
    u.indexed_iter()
        .filter(|((i, j), _)| *i == 0 || *j == 0 || *i + 1 == ny || *j + 1 == nx)
        .all(|(_, &v)| v == value)
}

/// True when no cell is NaN or infinite.
pub fn is_finite(u: &Array2<f64>) -> bool {
    u.iter().all(|v| v.is_finite())
}
