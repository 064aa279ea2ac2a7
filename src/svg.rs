//! Standalone SVG markup for laid-out charts. Everything is inlined as
//! primitive shapes and text so the markup renders with no external assets.

use crate::geometry::area::{FILL_COLOR, STROKE_COLOR, STROKE_WIDTH};
use crate::geometry::{
    fmt_coord, path_data, AreaGeometry, BarGeometry, CanvasSize, ChartDrawing, Label, PieGeometry,
    TreemapGeometry,
};

/// Placeholder emitted instead of a chart when there is nothing to draw
pub const NO_DATA: &str = "<p>No data</p>";

/// Markup for a chart, or the [`NO_DATA`] placeholder
pub fn render(drawing: Option<&ChartDrawing>) -> String {
    match drawing {
        Some(drawing) => render_drawing(drawing),
        None => NO_DATA.to_string(),
    }
}

pub fn render_drawing(drawing: &ChartDrawing) -> String {
    let body = match drawing {
        ChartDrawing::Bar(g) => bar_body(g),
        ChartDrawing::Pie(g) => pie_body(g),
        ChartDrawing::Area(g) => area_body(g),
        ChartDrawing::Treemap(g) => treemap_body(g),
    };
    wrap(drawing.canvas(), &body)
}

fn wrap(canvas: CanvasSize, body: &str) -> String {
    format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\" font-family=\"sans-serif\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"#fff\"/>\n{}</svg>",
        fmt_coord(canvas.width),
        fmt_coord(canvas.height),
        body
    )
}

fn bar_body(geom: &BarGeometry) -> String {
    let mut out = String::new();
    for bar in &geom.bars {
        out.push_str(&format!(
            "<g><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\"/>{}{}</g>\n",
            fmt_coord(bar.x),
            fmt_coord(bar.y),
            fmt_coord(bar.width),
            fmt_coord(bar.height),
            fmt_coord(geom.corner_radius),
            bar.fill,
            text(&bar.value_label),
            text(&bar.name_label),
        ));
    }
    out
}

fn pie_body(geom: &PieGeometry) -> String {
    let mut out = String::new();
    for wedge in &geom.wedges {
        // Arc endpoints coincide for a full turn, so draw a circle instead
        let shape = if wedge.is_full_circle() {
            format!(
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"/>",
                fmt_coord(geom.center.0),
                fmt_coord(geom.center.1),
                fmt_coord(geom.radius),
                wedge.fill
            )
        } else {
            format!("<path d=\"{}\" fill=\"{}\"/>", path_data(&wedge.path), wedge.fill)
        };
        out.push_str(&format!("<g>{}{}</g>\n", shape, text(&wedge.label)));
    }
    out
}

fn area_body(geom: &AreaGeometry) -> String {
    format!(
        "<path d=\"{}\" fill=\"{}\" stroke=\"none\"/>\n\
         <path d=\"{}\" stroke=\"{}\" stroke-width=\"{}\" fill=\"none\"/>\n",
        path_data(&geom.fill),
        FILL_COLOR,
        path_data(&geom.stroke),
        STROKE_COLOR,
        fmt_coord(STROKE_WIDTH),
    )
}

fn treemap_body(geom: &TreemapGeometry) -> String {
    let mut out = String::new();
    for strip in &geom.strips {
        out.push_str(&format!(
            "<g><rect x=\"{}\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>{}</g>\n",
            fmt_coord(strip.x),
            fmt_coord(strip.width),
            fmt_coord(strip.height),
            strip.fill,
            text(&strip.label),
        ));
    }
    out
}

fn text(label: &Label) -> String {
    let placement = if label.rotation == 0.0 {
        format!("x=\"{}\" y=\"{}\"", fmt_coord(label.x), fmt_coord(label.y))
    } else {
        format!(
            "transform=\"translate({}, {}) rotate({})\"",
            fmt_coord(label.x),
            fmt_coord(label.y),
            fmt_coord(label.rotation)
        )
    };
    format!(
        "<text {} font-size=\"{}\" text-anchor=\"{}\">{}</text>",
        placement,
        fmt_coord(label.font_size),
        label.anchor.as_str(),
        escape_html(&label.text)
    )
}

/// Escape text for inclusion in HTML or SVG content and attributes
pub fn escape_html(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for ch in unsafe_text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}
