use super::{CanvasSize, Margin, PathCommand};
use crate::aggregate::Series;

pub const DEFAULT_CANVAS: CanvasSize = CanvasSize::new(900.0, 300.0);

pub const MARGIN: Margin = Margin {
    top: 20.0,
    right: 20.0,
    bottom: 40.0,
    left: 60.0,
};

pub const STROKE_COLOR: &str = "#8b5cf6";
pub const STROKE_WIDTH: f64 = 2.0;
pub const FILL_COLOR: &str = "rgba(139,92,246,0.25)";

#[derive(Debug, Clone, PartialEq)]
pub struct AreaGeometry {
    pub canvas: CanvasSize,
    pub names: Vec<String>,
    /// Absolute vertex positions, one per point
    pub points: Vec<(f64, f64)>,
    /// Polyline through the points
    pub stroke: Vec<PathCommand>,
    /// The polyline closed down to the baseline
    pub fill: Vec<PathCommand>,
    pub baseline: f64,
}

/// Lay out points evenly across the plot width, heights linear against the maximum
pub fn build(series: &Series, canvas: CanvasSize) -> Option<AreaGeometry> {
    if series.is_empty() {
        return None;
    }

    let chart_w = canvas.width - MARGIN.left - MARGIN.right;
    let chart_h = (canvas.height - MARGIN.top - MARGIN.bottom).max(0.0);
    let max_value = series.iter().map(|p| p.value).fold(1.0, f64::max);
    let step = chart_w / (series.len().saturating_sub(1)).max(1) as f64;
    let baseline = MARGIN.top + chart_h;

    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = MARGIN.left + step * i as f64;
            let y = baseline - (p.value / max_value) * chart_h;
            (x, y)
        })
        .collect();

    let stroke = points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            if i == 0 {
                PathCommand::MoveTo { x, y }
            } else {
                PathCommand::LineTo { x, y }
            }
        })
        .collect();

    let mut fill = Vec::with_capacity(points.len() + 3);
    fill.push(PathCommand::MoveTo { x: MARGIN.left, y: baseline });
    fill.extend(points.iter().map(|&(x, y)| PathCommand::LineTo { x, y }));
    fill.push(PathCommand::LineTo { x: MARGIN.left + chart_w, y: baseline });
    fill.push(PathCommand::Close);

    Some(AreaGeometry {
        canvas,
        names: series.iter().map(|p| p.name.clone()).collect(),
        points,
        stroke,
        fill,
        baseline,
    })
}
