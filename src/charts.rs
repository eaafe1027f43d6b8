//! SVG charts for the profiling and evaluation stages
//!
//! The SVG backend needs no system fonts, so charts render the same on a
//! headless machine as on a desktop.

use itertools::Itertools;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

const SIZE: (u32, u32) = (800, 600);
const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
const SCATTER_GREEN: RGBColor = RGBColor(0, 160, 0);

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn render(path: &Path, draw: impl FnOnce(&Path) -> DrawResult) -> Result<PathBuf> {
    draw(path).map_err(|e| PipelineError::Chart {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(path.to_path_buf())
}

/// File-system friendly version of a column name
pub fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Bin edges and counts using Sturges' rule
pub fn histogram_bins(values: &[f64]) -> Vec<(f64, f64, u32)> {
    let Some((lo, hi)) = finite_range(values) else {
        return Vec::new();
    };
    let n_bins = ((values.len() as f64).log2().ceil() as usize + 1).max(1);
    let width = if hi > lo { (hi - lo) / n_bins as f64 } else { 1.0 };

    let mut counts = vec![0u32; n_bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, c))
        .collect()
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
}

/// Pad a degenerate or tight range so the axis has some extent
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

pub fn histogram(path: &Path, column: &str, values: &[f64]) -> Result<PathBuf> {
    let bins = histogram_bins(values);
    render(path, |path| {
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let (lo, hi) = match (bins.first(), bins.last()) {
            (Some(first), Some(last)) => (first.0, last.1),
            _ => (0.0, 1.0),
        };
        let max_count = bins.iter().map(|b| b.2).max().unwrap_or(0).max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Histogram of {column}"), ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(lo..hi, 0u32..max_count + max_count / 10 + 1)?;
        chart.configure_mesh().x_desc(column).y_desc("Frequency").draw()?;

        chart.draw_series(bins.iter().map(|&(left, right, count)| {
            Rectangle::new([(left, 0), (right, count)], LIGHT_BLUE.filled())
        }))?;
        chart.draw_series(bins.iter().map(|&(left, right, count)| {
            Rectangle::new([(left, 0), (right, count)], BLACK.stroke_width(1))
        }))?;

        root.present()?;
        Ok(())
    })
}

pub fn boxplot(path: &Path, column: &str, values: &[f64]) -> Result<PathBuf> {
    render(path, |path| {
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            root.present()?;
            return Ok(());
        }
        let quartiles = Quartiles::new(&finite);
        let (lo, hi) = finite_range(&finite).unwrap_or((0.0, 1.0));
        let (lo, hi) = padded(lo, hi);

        let labels = [column.to_string()];
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Boxplot of {column}"), ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(labels[..].into_segmented(), lo as f32..hi as f32)?;
        chart.configure_mesh().disable_x_mesh().draw()?;

        chart.draw_series(std::iter::once(
            Boxplot::new_vertical(SegmentValue::CenterOf(&labels[0]), &quartiles)
                .width(80)
                .style(ORANGE.stroke_width(2)),
        ))?;

        root.present()?;
        Ok(())
    })
}

/// Two bars, each labelled with its value rounded to 4 decimals
pub fn rmse_bars(path: &Path, train_rmse: f64, test_rmse: f64) -> Result<PathBuf> {
    render(path, |path| {
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let bars = [("Training", train_rmse), ("Testing", test_rmse)];
        let top = bars.iter().map(|b| b.1).fold(0.0f64, f64::max).max(1e-9) * 1.2;

        let mut chart = ChartBuilder::on(&root)
            .caption("RMSE Comparison", ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..2.0, 0.0..top)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .x_desc("Dataset")
            .y_desc("Root Mean Squared Error (RMSE)")
            .draw()?;

        for (i, (label, value)) in bars.iter().enumerate() {
            let left = i as f64 + 0.2;
            let right = i as f64 + 0.8;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(left, 0.0), (right, *value)],
                STEEL_BLUE.filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{label}: {value:.4}"),
                (left, *value + top * 0.03),
                ("sans-serif", 16),
            )))?;
        }

        root.present()?;
        Ok(())
    })
}

/// Predicted against actual with the identity line for reference
pub fn predicted_vs_actual(
    path: &Path,
    title: &str,
    actual: &[f64],
    predicted: &[f64],
    train_set: bool,
) -> Result<PathBuf> {
    render(path, |path| {
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let all: Vec<f64> = actual.iter().chain(predicted).copied().collect();
        let (lo, hi) = finite_range(&all).unwrap_or((0.0, 1.0));
        let (lo, hi) = padded(lo, hi);
        let color = if train_set { BLUE } else { SCATTER_GREEN };

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(lo..hi, lo..hi)?;
        chart.configure_mesh().x_desc("Actual").y_desc("Predicted").draw()?;

        chart.draw_series(
            actual
                .iter()
                .zip(predicted)
                .map(|(&a, &p)| Circle::new((a, p), 2, color.filled())),
        )?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(lo, lo), (hi, hi)],
            RED.stroke_width(1),
        )))?;

        root.present()?;
        Ok(())
    })
}
