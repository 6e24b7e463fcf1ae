//! CSV persistence of fields.
//!
//! One row of the array per line, values separated by commas. Blank lines
//! and lines starting with `#` are ignored when reading.

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Reads a rectangular array of floats from a CSV file.
pub fn read_field_csv(path: &Path) -> Result<Array2<f64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read field file '{}'", path.display()))?;
    parse_field(&content).with_context(|| format!("Invalid field file '{}'", path.display()))
}

/// Parses CSV text into an array of shape `(rows, columns)`.
pub fn parse_field(content: &str) -> Result<Array2<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut values = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0;

    for result in reader.records() {
        let record = result.context("Failed to read field row")?;
        let line = record.position().map_or(0, |p| p.line());

        for cell in record.iter() {
            let v: f64 = cell
                .parse()
                .map_err(|_| anyhow!("line {}: cannot parse '{}' as a number", line, cell))?;
            values.push(v);
        }

        match ncols {
            None => ncols = Some(record.len()),
            Some(n) if n != record.len() => {
                return Err(anyhow!(
                    "line {}: expected {} columns, got {}",
                    line,
                    n,
                    record.len()
                ));
            }
            Some(_) => {}
        }
        nrows += 1;
    }

    let ncols = ncols.ok_or_else(|| anyhow!("no data rows"))?;
    Ok(Array2::from_shape_vec((nrows, ncols), values)?)
}

/// Writes `u` at full precision, creating parent directories as needed.
pub fn write_field_csv(path: &Path, u: &Array2<f64>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create field file '{}'", path.display()))?;
    for row in u.rows() {
        writer
            .write_record(row.iter().map(|v| format!("{:.18e}", v)))
            .with_context(|| format!("Failed to write field file '{}'", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}
