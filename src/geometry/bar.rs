use super::{format_grouped, CanvasSize, Label, Margin, Palette, TextAnchor};
use crate::aggregate::Series;

pub const DEFAULT_CANVAS: CanvasSize = CanvasSize::new(700.0, 300.0);

/// Horizontal room reserved for each category; the canvas widens to fit
pub const PER_BAR_WIDTH: f64 = 60.0;
pub const BAR_GAP: f64 = 10.0;
pub const CORNER_RADIUS: f64 = 6.0;
pub const MARGIN: Margin = Margin {
    top: 20.0,
    right: 20.0,
    bottom: 120.0,
    left: 60.0,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub name: String,
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
    pub value_label: Label,
    /// Rotated 90° so long category names do not overlap
    pub name_label: Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    pub canvas: CanvasSize,
    pub corner_radius: f64,
    pub bars: Vec<Bar>,
}

/// Lay out one bar per point, heights linear in value against the series maximum
pub fn build(series: &Series, canvas: CanvasSize, palette: &Palette) -> Option<BarGeometry> {
    if series.is_empty() {
        return None;
    }

    let count = series.len() as f64;
    let width = canvas.width.max(count * PER_BAR_WIDTH);
    let height = canvas.height;
    let chart_w = width - MARGIN.left - MARGIN.right;
    let chart_h = (height - MARGIN.top - MARGIN.bottom).max(0.0);
    let max_value = series.iter().map(|p| p.value).fold(1.0, f64::max);
    let bar_width = (chart_w / count - BAR_GAP).max(1.0);

    let bars = series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let h = (point.value.max(0.0) / max_value) * chart_h;
            let x = MARGIN.left + i as f64 * (bar_width + BAR_GAP);
            let y = MARGIN.top + chart_h - h;
            let center = x + bar_width / 2.0;

            Bar {
                name: point.name.clone(),
                value: point.value,
                x,
                y,
                width: bar_width,
                height: h,
                fill: palette.color(i),
                value_label: Label::centered(center, y - 8.0, format_grouped(point.value), 12.0),
                name_label: Label {
                    x: center,
                    y: MARGIN.top + chart_h + 6.0,
                    text: point.name.clone(),
                    font_size: 11.0,
                    anchor: TextAnchor::Start,
                    rotation: 90.0,
                },
            }
        })
        .collect();

    Some(BarGeometry {
        canvas: CanvasSize::new(width, height),
        corner_radius: CORNER_RADIUS,
        bars,
    })
}
