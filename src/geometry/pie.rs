use super::{CanvasSize, Label, Palette, PathCommand};
use crate::aggregate::Series;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

pub const DEFAULT_CANVAS: CanvasSize = CanvasSize::new(450.0, 450.0);

/// Space kept around the circle for labels
const LABEL_ROOM: f64 = 85.0;
/// Labels sit this far outside the circle
const LABEL_OFFSET: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub name: String,
    pub value: f64,
    /// Percentage of the total, rounded to one decimal
    pub percent: f64,
    /// Radians; 12 o'clock is -π/2 and angles grow clockwise
    pub start_angle: f64,
    pub end_angle: f64,
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub large_arc: bool,
    pub fill: &'static str,
    pub path: Vec<PathCommand>,
    pub label: Label,
}

impl Wedge {
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// A wedge spanning the whole circle; its arc endpoints coincide
    pub fn is_full_circle(&self) -> bool {
        self.sweep() >= TAU - 1e-9
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieGeometry {
    pub canvas: CanvasSize,
    pub center: (f64, f64),
    pub radius: f64,
    pub wedges: Vec<Wedge>,
}

/// Lay out wedges by cumulative share, clockwise from 12 o'clock
pub fn build(series: &Series, canvas: CanvasSize, palette: &Palette) -> Option<PieGeometry> {
    if series.is_empty() {
        return None;
    }

    let total: f64 = series.iter().map(|p| p.value).sum();
    let total = if total == 0.0 { 1.0 } else { total };

    let (cx, cy) = (canvas.width / 2.0, canvas.height / 2.0);
    let radius = (canvas.width.min(canvas.height) / 2.0 - LABEL_ROOM).max(1.0);
    let point_at = |r: f64, angle: f64| (cx + r * angle.cos(), cy + r * angle.sin());

    let mut angle = -FRAC_PI_2;
    let wedges = series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let share = point.value / total;
            let slice = share * TAU;
            let (start_angle, end_angle) = (angle, angle + slice);
            angle = end_angle;

            let start = point_at(radius, start_angle);
            let end = point_at(radius, end_angle);
            let large_arc = slice > PI;
            let percent = (share * 1000.0).round() / 10.0;
            let (lx, ly) = point_at(radius + LABEL_OFFSET, (start_angle + end_angle) / 2.0);

            Wedge {
                name: point.name.clone(),
                value: point.value,
                percent,
                start_angle,
                end_angle,
                start,
                end,
                large_arc,
                fill: palette.color(i),
                path: vec![
                    PathCommand::MoveTo { x: cx, y: cy },
                    PathCommand::LineTo { x: start.0, y: start.1 },
                    PathCommand::Arc { radius, large_arc, sweep: true, x: end.0, y: end.1 },
                    PathCommand::Close,
                ],
                label: Label::centered(lx, ly, format!("{} ({:.1}%)", point.name, percent), 12.0),
            }
        })
        .collect();

    Some(PieGeometry {
        canvas,
        center: (cx, cy),
        radius,
        wedges,
    })
}
