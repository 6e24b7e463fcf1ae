use anyhow::{anyhow, Context, Result};
use ndarray::Array2;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

/// Renders concentration fields as PNG heat maps.
pub struct FieldVisualiser {
    width: u32,
    height: u32,
    gradient: Box<dyn colorgrad::Gradient>,
}

impl FieldVisualiser {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            gradient: Box::new(colorgrad::preset::viridis()),
        }
    }

    /// Draws `data` (shape `(ny, nx)`) with row 0 at the bottom and writes
    /// it to `out_path`, creating parent directories as needed.
    pub fn plot_field(&self, data: &Array2<f64>, out_path: &Path, title: &str) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
        }
        self.draw(data, out_path, title)
            .map_err(|e| anyhow!("Failed to plot '{}': {}", out_path.display(), e))?;
        debug!("Saved frame: {}", out_path.display());
        Ok(())
    }

    fn draw(
        &self,
        data: &Array2<f64>,
        out_path: &Path,
        title: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(out_path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (ny, nx) = data.dim();
        let (min_val, max_val) = value_range(data);

        let plot_width = self.width.saturating_sub(90) as i32;
        let (plot_area, bar_area) = root.split_horizontally(plot_width);

        let mut chart = ChartBuilder::on(&plot_area)
            .caption(title, ("sans-serif", 16))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(0..nx, 0..ny)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("x (grid points)")
            .y_desc("y (grid points)")
            .draw()?;

        chart.draw_series(data.indexed_iter().map(|((i, j), &value)| {
            let color = self.value_to_color(value, min_val, max_val);
            Rectangle::new([(j, i), (j + 1, i + 1)], color.filled())
        }))?;

        self.draw_colour_bar(&bar_area, min_val, max_val)?;

        root.present()?;
        Ok(())
    }

    fn draw_colour_bar(
        &self,
        area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
        min_val: f64,
        max_val: f64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        const LEVELS: usize = 100;
        let span = if max_val > min_val { max_val - min_val } else { 1.0 };

        let mut bar = ChartBuilder::on(area)
            .margin_top(40)
            .margin_bottom(40)
            .margin_right(10)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..1.0, min_val..min_val + span)?;

        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc("Concentration")
            .draw()?;

        bar.draw_series((0..LEVELS).map(|k| {
            let lo = min_val + span * k as f64 / LEVELS as f64;
            let hi = min_val + span * (k + 1) as f64 / LEVELS as f64;
            let color = self.value_to_color(lo, min_val, min_val + span);
            Rectangle::new([(0.0, lo), (1.0, hi)], color.filled())
        }))?;
        Ok(())
    }

    fn value_to_color(&self, value: f64, min_val: f64, max_val: f64) -> RGBColor {
        let normalized = if max_val > min_val {
            (value - min_val) / (max_val - min_val)
        } else {
            0.5
        };
        let normalized = normalized.clamp(0.0, 1.0);
        let color_rgba = self.gradient.at(normalized as f32).to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}

/// Finite `(min, max)` of the field, `(0, 0)` if nothing is finite.
fn value_range(data: &Array2<f64>) -> (f64, f64) {
    let (lo, hi) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}
