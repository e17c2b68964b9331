//! SVG scatter and line plots.

use std::{ops::Range, path::Path};

use plotters::prelude::*;

use crate::{Error, Result};

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Points placed on a categorical x axis: `(category index, value)`.
pub struct ScatterSeries {
    pub label: String,
    pub points: Vec<(usize, f64)>,
}

pub struct Line {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Only every other category is labeled past this many.
const DENSE_AXIS: usize = 40;

fn upper(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

pub fn scatter(path: &Path, y_desc: &str, categories: &[String], series: &[ScatterSeries]) -> Result<()> {
    if categories.is_empty() {
        tracing::warn!(path = %path.display(), "nothing to plot");
        return Ok(());
    }
    draw_scatter(path, y_desc, categories, series).map_err(|e| Error::Plot(e.to_string()))?;
    tracing::debug!(path = %path.display(), "plot written");
    Ok(())
}

fn draw_scatter(path: &Path, y_desc: &str, categories: &[String], series: &[ScatterSeries]) -> DrawResult {
    let y_max = upper(series.iter().flat_map(|s| s.points.iter().map(|&(_, y)| y)));
    let stride = if categories.len() > DENSE_AXIS { 2 } else { 1 };

    let root = SVGBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(70)
        .build_cartesian_2d((0..categories.len() as u32).into_segmented(), 0.0..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("bins")
        .y_desc(y_desc)
        .x_labels(categories.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) if (*i as usize) % stride == 0 => {
                categories.get(*i as usize).cloned().unwrap_or_default()
            }
            _ => String::new(),
        })
        .x_label_style(("sans-serif", 11).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(
                s.points
                    .iter()
                    .filter(|(_, y)| y.is_finite())
                    .map(|&(x, y)| Circle::new((SegmentValue::CenterOf(x as u32), y), 4, color.filled())),
            )?
            .label(s.label.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Lines over a numeric x axis. With `log`, values are drawn as `log10(y)`
/// and non-positive points are left out; `y_clamp` caps the y range.
pub fn lines(
    path: &Path,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    lines: &[Line],
    y_clamp: Option<f64>,
    log: bool,
) -> Result<()> {
    draw_lines(path, caption, x_desc, y_desc, lines, y_clamp, log)
        .map_err(|e| Error::Plot(e.to_string()))?;
    tracing::debug!(path = %path.display(), "plot written");
    Ok(())
}

/// Drawn y range; log ranges are in `log10` units.
fn y_range(lines: &[Line], y_clamp: Option<f64>, log: bool) -> Range<f64> {
    let all = || lines.iter().flat_map(|l| l.points.iter().map(|&(_, y)| y));
    match (y_clamp, log) {
        (Some(clamp), false) => 0.0..clamp,
        (Some(clamp), true) => 0.001f64.log10()..clamp.log10(),
        (None, false) => 0.0..upper(all()),
        (None, true) => {
            let positive = || all().filter(|&y| y > 0.0);
            let lo = positive().fold(f64::INFINITY, f64::min);
            let hi = positive().fold(f64::NEG_INFINITY, f64::max);
            if lo.is_finite() {
                lo.log10() - 0.5..hi.log10() + 0.5
            } else {
                -3.0..1.0
            }
        }
    }
}

fn draw_lines(
    path: &Path,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    lines: &[Line],
    y_clamp: Option<f64>,
    log: bool,
) -> DrawResult {
    let transform = |y: f64| if log { y.log10() } else { y };
    let all = || lines.iter().flat_map(|l| l.points.iter().copied());
    let y_range = y_range(lines, y_clamp, log);
    let x_min = all().map(|(x, _)| x).fold(f64::INFINITY, f64::min);
    let x_max = all().map(|(x, _)| x).fold(f64::NEG_INFINITY, f64::max);
    let (x_min, x_max) = if x_min.is_finite() && x_max > x_min {
        let pad = 0.05 * (x_max - x_min);
        (x_min - pad, x_max + pad)
    } else {
        (0.0, 1.0)
    };

    let root = SVGBackend::new(path, (900, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_range)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .y_label_formatter(&|y| {
            if log {
                format!("{:.3}", 10f64.powf(*y))
            } else {
                format!("{:.2}", y)
            }
        })
        .draw()?;

    for (idx, line) in lines.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(f64, f64)> = line
            .points
            .iter()
            .filter(|&&(_, y)| !log || y > 0.0)
            .map(|&(x, y)| (x, transform(y)))
            .collect();
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(points: &[(f64, f64)]) -> Line {
        Line {
            label: "l".into(),
            points: points.to_vec(),
        }
    }

    #[test]
    fn clamped_ranges() {
        let lines = [line(&[(300.0, 45.0), (400.0, 0.5)])];
        assert_eq!(y_range(&lines, Some(30.0), false), 0.0..30.0);
        let log = y_range(&lines, Some(30.0), true);
        assert_relative_eq!(log.start, -3.0, epsilon = 1e-12);
        assert_relative_eq!(log.end, 30f64.log10(), epsilon = 1e-12);
    }

    #[test]
    fn free_ranges() {
        let lines = [line(&[(300.0, 2.0), (400.0, 0.0)]), line(&[(300.0, 0.1)])];
        assert_relative_eq!(y_range(&lines, None, false).end, 2.2, epsilon = 1e-12);
        let log = y_range(&lines, None, true);
        assert_relative_eq!(log.start, -1.5, epsilon = 1e-12);
        assert_relative_eq!(log.end, 2f64.log10() + 0.5, epsilon = 1e-12);
        assert_eq!(y_range(&[], None, true), -3.0..1.0);
    }
}
