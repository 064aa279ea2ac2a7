use crate::geometry::area::{STROKE_COLOR, STROKE_WIDTH};
use crate::geometry::{
    AreaGeometry, BarGeometry, CanvasSize, ChartDrawing, Label, PieGeometry, TextAnchor,
    TreemapGeometry,
};
use anyhow::{Context, Result};
use image::ImageEncoder;
use log::warn;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::TAU;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Arc segments used for a full turn when approximating pie wedges
const ARC_SEGMENTS: f64 = 128.0;

/// Largest canvas rasterized, in pixels
pub const MAX_PIXELS: usize = 64 * 1024 * 1024;

/// Rasterize a laid-out chart and encode it as PNG
pub fn render_png(drawing: &ChartDrawing) -> Result<Vec<u8>> {
    let (width, height) = pixel_size(drawing.canvas());
    let mut buffer = pixel_buffer(width, height)?;
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        match drawing {
            ChartDrawing::Bar(g) => draw_bars(&root, g)?,
            ChartDrawing::Pie(g) => draw_pie(&root, g)?,
            ChartDrawing::Area(g) => draw_area(&root, g)?,
            ChartDrawing::Treemap(g) => draw_treemap(&root, g)?,
        }

        root.present().context("Failed to present drawing")?;
    }
    encode_png(&buffer, width, height)
}

/// Blank canvas carrying a "No data" notice
pub fn render_no_data(canvas: CanvasSize) -> Result<Vec<u8>> {
    let (width, height) = pixel_size(canvas);
    let mut buffer = pixel_buffer(width, height)?;
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;
        draw_label(
            &root,
            &Label::centered(canvas.width / 2.0, canvas.height / 2.0, "No data", 16.0),
        );
        root.present().context("Failed to present drawing")?;
    }
    encode_png(&buffer, width, height)
}

fn pixel_size(canvas: CanvasSize) -> (u32, u32) {
    (canvas.width.ceil().max(1.0) as u32, canvas.height.ceil().max(1.0) as u32)
}

/// Zeroed RGB buffer for a canvas, refusing canvases above [`MAX_PIXELS`]
fn pixel_buffer(width: u32, height: u32) -> Result<Vec<u8>> {
    let bytes = (width as usize)
        .checked_mul(height as usize)
        .filter(|&pixels| pixels <= MAX_PIXELS)
        .and_then(|pixels| pixels.checked_mul(3))
        .with_context(|| {
            format!(
                "Canvas {}x{} is too large to rasterize (limit {} pixels)",
                width, height, MAX_PIXELS
            )
        })?;
    Ok(vec![0u8; bytes])
}

fn px(v: f64) -> i32 {
    v.round() as i32
}

fn draw_bars(root: &Area, geom: &BarGeometry) -> Result<()> {
    for bar in &geom.bars {
        let color = parse_hex_color(bar.fill).unwrap_or(BLUE);
        root.draw(&Rectangle::new(
            [(px(bar.x), px(bar.y)), (px(bar.x + bar.width), px(bar.y + bar.height))],
            color.filled(),
        ))
        .context("Failed to draw bar")?;
        draw_label(root, &bar.value_label);
        draw_label(root, &bar.name_label);
    }
    Ok(())
}

fn draw_pie(root: &Area, geom: &PieGeometry) -> Result<()> {
    let (cx, cy) = geom.center;
    for wedge in &geom.wedges {
        let color = parse_hex_color(wedge.fill).unwrap_or(BLUE);
        let sweep = wedge.sweep();
        let steps = ((sweep / TAU) * ARC_SEGMENTS).ceil().max(2.0) as usize;

        let mut points = Vec::with_capacity(steps + 2);
        points.push((px(cx), px(cy)));
        for step in 0..=steps {
            let angle = wedge.start_angle + sweep * step as f64 / steps as f64;
            points.push((px(cx + geom.radius * angle.cos()), px(cy + geom.radius * angle.sin())));
        }

        root.draw(&Polygon::new(points, color.filled()))
            .context("Failed to draw pie wedge")?;
        draw_label(root, &wedge.label);
    }
    Ok(())
}

fn draw_area(root: &Area, geom: &AreaGeometry) -> Result<()> {
    let stroke = parse_hex_color(STROKE_COLOR).unwrap_or(BLUE);
    let points: Vec<(i32, i32)> = geom.points.iter().map(|&(x, y)| (px(x), px(y))).collect();

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let plot_right = geom.canvas.width - crate::geometry::area::MARGIN.right;
        let mut fill = Vec::with_capacity(points.len() + 2);
        fill.push((first.0, px(geom.baseline)));
        fill.extend(points.iter().copied());
        fill.push((last.0.max(px(plot_right)), px(geom.baseline)));

        root.draw(&Polygon::new(fill, stroke.mix(0.25).filled()))
            .context("Failed to draw area fill")?;
    }

    root.draw(&PathElement::new(
        points,
        stroke.stroke_width(STROKE_WIDTH as u32),
    ))
    .context("Failed to draw area line")?;
    Ok(())
}

fn draw_treemap(root: &Area, geom: &TreemapGeometry) -> Result<()> {
    for strip in &geom.strips {
        let color = parse_hex_color(strip.fill).unwrap_or(BLUE);
        root.draw(&Rectangle::new(
            [(px(strip.x), 0), (px(strip.x + strip.width), px(strip.height))],
            color.filled(),
        ))
        .context("Failed to draw treemap strip")?;
        draw_label(root, &strip.label);
    }
    Ok(())
}

/// Labels are best effort: a host without usable fonts still gets the shapes
fn draw_label(root: &Area, label: &Label) {
    let hpos = match label.anchor {
        TextAnchor::Start => HPos::Left,
        TextAnchor::Middle => HPos::Center,
        TextAnchor::End => HPos::Right,
    };
    let mut font = ("sans-serif", label.font_size).into_font();
    if label.rotation == 90.0 {
        font = font.transform(FontTransform::Rotate90);
    }
    let style = TextStyle::from(font).color(&BLACK).pos(Pos::new(hpos, VPos::Bottom));

    if let Err(e) = root.draw(&Text::new(label.text.clone(), (px(label.x), px(label.y)), style)) {
        warn!("Skipping label '{}': {}", label.text, e);
    }
}

/// Parse hex color (#RRGGBB or #RGB)
fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(RGBColor(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBColor(r, g, b))
        }
        _ => None,
    }
}

/// Encode an RGB buffer as PNG
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}
