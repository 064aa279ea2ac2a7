use super::{CanvasSize, Label, Palette};
use crate::aggregate::Series;

pub const DEFAULT_CANVAS: CanvasSize = CanvasSize::new(900.0, 220.0);

/// Vertical room under the strips for their labels
const LABEL_BAND: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    pub name: String,
    pub value: f64,
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreemapGeometry {
    pub canvas: CanvasSize,
    pub strips: Vec<Strip>,
}

/// Slice-only treemap: full-height strips packed left to right, widths
/// proportional to each point's share of the total
pub fn build(series: &Series, canvas: CanvasSize, palette: &Palette) -> Option<TreemapGeometry> {
    if series.is_empty() {
        return None;
    }

    let total: f64 = series.iter().map(|p| p.value).sum();
    let total = if total == 0.0 { 1.0 } else { total };
    let strip_height = (canvas.height - LABEL_BAND).max(0.0);

    let mut x = 0.0;
    let strips = series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let width = (point.value / total * canvas.width).max(0.0);
            let strip = Strip {
                name: point.name.clone(),
                value: point.value,
                x,
                width,
                height: strip_height,
                fill: palette.color(i),
                label: Label::centered(x + width / 2.0, canvas.height - 8.0, point.name.clone(), 12.0),
            };
            x += width;
            strip
        })
        .collect();

    Some(TreemapGeometry { canvas, strips })
}
