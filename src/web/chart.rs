use crate::data::Series;
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

const CHART_SIZE: (u32, u32) = (900, 420);

const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

const AXIS_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

fn to_datetime(t: NaiveDateTime) -> DateTime<Utc> {
    t.and_utc()
}

fn draw_error<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> AppError {
    move |e| AppError::Chart(format!("Failed to draw {}: {}", what, e))
}

/// Time and value ranges covering every plottable point of every series.
///
/// A single instant is widened by an hour on each side and a flat value
/// range by 0.1, so the chart always has a non-empty area.
fn data_ranges(series: &[Series]) -> Option<(Range<DateTime<Utc>>, Range<f64>)> {
    let points: Vec<(NaiveDateTime, f64)> = series.iter().flat_map(|s| s.plottable()).collect();

    let t_min = points.iter().map(|(t, _)| *t).min()?;
    let t_max = points.iter().map(|(t, _)| *t).max()?;
    let (t_min, t_max) = if t_min == t_max {
        (t_min - TimeDelta::hours(1), t_max + TimeDelta::hours(1))
    } else {
        (t_min, t_max)
    };

    let v_min = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let v_max = points.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let margin = if (v_max - v_min).abs() < 1e-10 {
        v_max.abs() * 0.05 + 0.1
    } else {
        (v_max - v_min) * 0.05
    };

    Some((
        to_datetime(t_min)..to_datetime(t_max),
        (v_min - margin)..(v_max + margin),
    ))
}

/// Contiguous runs of present values, ordered by timestamp.
///
/// Points without a timestamp cannot be placed and are skipped; a missing
/// value ends the current run so the line shows a gap.
fn segments(series: &Series) -> Vec<Vec<(NaiveDateTime, f64)>> {
    let mut timed: Vec<_> = series
        .points
        .iter()
        .filter_map(|p| p.timestamp.map(|t| (t, p.value)))
        .collect();
    timed.sort_by_key(|(t, _)| *t);

    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (t, value) in timed {
        match value {
            Some(v) => current.push((t, v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Render series as an SVG line chart with a legend
pub fn render_svg(series: &[Series]) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error("background"))?;

        match data_ranges(series) {
            Some((x_range, y_range)) => draw_chart(series, &root, x_range, y_range)?,
            None => {
                let (width, height) = CHART_SIZE;
                root.draw(&Text::new(
                    "No data to display",
                    (width as i32 / 2 - 80, height as i32 / 2),
                    ("sans-serif", 20).into_font(),
                ))
                .map_err(draw_error("placeholder"))?;
            }
        }

        root.present().map_err(draw_error("chart"))?;
    }
    Ok(svg)
}

fn draw_chart<DB: DrawingBackend>(
    series: &[Series],
    root: &DrawingArea<DB, Shift>,
    x_range: Range<DateTime<Utc>>,
    y_range: Range<f64>,
) -> Result<()> {
    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_error("chart area"))?;

    chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(8)
        .x_desc("Time")
        .x_label_formatter(&|t| t.format(AXIS_LABEL_FORMAT).to_string())
        .draw()
        .map_err(draw_error("axes"))?;

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];

        // Legend entry, drawn once even when the series is split by gaps
        chart
            .draw_series(LineSeries::new(
                Vec::<(DateTime<Utc>, f64)>::new(),
                color.stroke_width(2),
            ))
            .map_err(draw_error("legend entry"))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        for run in segments(s) {
            if let [(t, v)] = run.as_slice() {
                chart
                    .draw_series(std::iter::once(Circle::new(
                        (to_datetime(*t), *v),
                        3,
                        color.filled(),
                    )))
                    .map_err(draw_error("point"))?;
                continue;
            }
            chart
                .draw_series(LineSeries::new(
                    run.into_iter().map(|(t, v)| (to_datetime(t), v)),
                    color.stroke_width(2),
                ))
                .map_err(draw_error("line"))?;
        }
    }

    chart
        .configure_series_labels()
        .position(plotters::chart::SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_error("legend"))?;

    Ok(())
}
