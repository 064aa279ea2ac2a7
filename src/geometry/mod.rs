//! Deterministic chart layout.
//!
//! Each builder is a pure function from a [`Series`] and a canvas size to
//! plain drawable data. An empty series yields `None`, which the renderers
//! turn into a "No data" placeholder.

pub mod area;
pub mod bar;
pub mod pie;
pub mod treemap;

use crate::aggregate::Series;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use area::AreaGeometry;
pub use bar::BarGeometry;
pub use pie::PieGeometry;
pub use treemap::TreemapGeometry;

// =============================================================================
// Shared primitives
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Fixed, ordered fill colors; index `i` uses `colors[i % len]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    colors: &'static [&'static str],
}

impl Palette {
    pub const DEFAULT: Palette = Palette {
        colors: &[
            "#8b5cf6", "#ec4899", "#06b6d4", "#10b981", "#f59e0b", "#ef4444", "#6366f1",
            "#fb7185", "#14b8a6",
        ],
    };

    /// Palette over custom colors. Falls back to the default palette when empty.
    pub const fn new(colors: &'static [&'static str]) -> Self {
        if colors.is_empty() {
            Self::DEFAULT
        } else {
            Self { colors }
        }
    }

    pub fn color(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// A positioned piece of text. `rotation` is in degrees, clockwise, about (x, y).
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font_size: f64,
    pub anchor: TextAnchor,
    pub rotation: f64,
}

impl Label {
    pub fn centered(x: f64, y: f64, text: impl Into<String>, font_size: f64) -> Self {
        Self {
            x,
            y,
            text: text.into(),
            font_size,
            anchor: TextAnchor::Middle,
            rotation: 0.0,
        }
    }
}

/// SVG-style path command in absolute coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    /// Circular arc from the current point to (x, y)
    Arc {
        radius: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    Close,
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::MoveTo { x, y } => write!(f, "M {} {}", fmt_coord(*x), fmt_coord(*y)),
            PathCommand::LineTo { x, y } => write!(f, "L {} {}", fmt_coord(*x), fmt_coord(*y)),
            PathCommand::Arc { radius, large_arc, sweep, x, y } => write!(
                f,
                "A {r} {r} 0 {} {} {} {}",
                u8::from(*large_arc),
                u8::from(*sweep),
                fmt_coord(*x),
                fmt_coord(*y),
                r = fmt_coord(*radius),
            ),
            PathCommand::Close => f.write_str("Z"),
        }
    }
}

/// Join path commands into an SVG `d` attribute
pub fn path_data(commands: &[PathCommand]) -> String {
    commands
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Coordinates rounded to 2 decimals, shortest form
pub fn fmt_coord(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// Thousands-grouped rendering with at most three fraction digits ("1,234.5")
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.3}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

// =============================================================================
// Chart kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Area,
    Treemap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [ChartKind::Bar, ChartKind::Pie, ChartKind::Area, ChartKind::Treemap];

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Area => "Area Chart",
            ChartKind::Treemap => "Treemap",
        }
    }

    pub fn default_canvas(&self) -> CanvasSize {
        match self {
            ChartKind::Bar => bar::DEFAULT_CANVAS,
            ChartKind::Pie => pie::DEFAULT_CANVAS,
            ChartKind::Area => area::DEFAULT_CANVAS,
            ChartKind::Treemap => treemap::DEFAULT_CANVAS,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
            ChartKind::Treemap => "treemap",
        };
        f.write_str(name)
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "pie" => Ok(ChartKind::Pie),
            "area" => Ok(ChartKind::Area),
            "treemap" | "tree" => Ok(ChartKind::Treemap),
            other => Err(format!("unknown chart kind '{}' (expected bar, pie, area or treemap)", other)),
        }
    }
}

/// Laid-out geometry of any chart kind
#[derive(Debug, Clone, PartialEq)]
pub enum ChartDrawing {
    Bar(BarGeometry),
    Pie(PieGeometry),
    Area(AreaGeometry),
    Treemap(TreemapGeometry),
}

impl ChartDrawing {
    pub fn canvas(&self) -> CanvasSize {
        match self {
            ChartDrawing::Bar(g) => g.canvas,
            ChartDrawing::Pie(g) => g.canvas,
            ChartDrawing::Area(g) => g.canvas,
            ChartDrawing::Treemap(g) => g.canvas,
        }
    }
}

/// Lay out `series` as the given chart kind; `None` for an empty series
pub fn build(kind: ChartKind, series: &Series, canvas: CanvasSize, palette: &Palette) -> Option<ChartDrawing> {
    match kind {
        ChartKind::Bar => bar::build(series, canvas, palette).map(ChartDrawing::Bar),
        ChartKind::Pie => pie::build(series, canvas, palette).map(ChartDrawing::Pie),
        ChartKind::Area => area::build(series, canvas).map(ChartDrawing::Area),
        ChartKind::Treemap => treemap::build(series, canvas, palette).map(ChartDrawing::Treemap),
    }
}
