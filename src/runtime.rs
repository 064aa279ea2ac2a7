// Runtime executor: mappings -> series -> geometry -> markup / PNG

use crate::aggregate::{aggregate, ResultLimit, Series};
use crate::collapse::collapse_with_policy;
use crate::data::Table;
use crate::geometry::{self, CanvasSize, ChartDrawing, ChartKind, Palette};
use crate::mappings::ChartMappings;
use crate::{raster, svg, OutputFormat, RenderOptions};
use anyhow::Result;
use log::debug;

/// Aggregated (and, for pies, collapsed) series for one chart
pub fn chart_series(table: &Table, mappings: &ChartMappings, kind: ChartKind, limit: ResultLimit) -> Series {
    let mapping = mappings.chart(kind);

    match kind {
        ChartKind::Pie => {
            // Collapse over the full series, then apply the limit
            let full = aggregate(table, &mapping.config(ResultLimit::All));
            collapse_with_policy(&full, mappings.pie_others_threshold, limit, mappings.pie_collapse)
        }
        _ => aggregate(table, &mapping.config(limit)),
    }
}

/// Lay out one chart; `None` when its series is empty
pub fn build_chart(
    table: &Table,
    mappings: &ChartMappings,
    kind: ChartKind,
    limit: ResultLimit,
    canvas: Option<CanvasSize>,
) -> Option<ChartDrawing> {
    let series = chart_series(table, mappings, kind, limit);
    let canvas = canvas.unwrap_or_else(|| kind.default_canvas());
    debug!("Laying out {} chart: {} points on {}x{}", kind, series.len(), canvas.width, canvas.height);
    geometry::build(kind, &series, canvas, &Palette::DEFAULT)
}

/// Render a chart to SVG or PNG bytes
pub fn render_chart(
    table: &Table,
    mappings: &ChartMappings,
    kind: ChartKind,
    limit: ResultLimit,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let canvas = options.canvas_for(kind);
    let drawing = build_chart(table, mappings, kind, limit, Some(canvas));

    match options.format {
        OutputFormat::Svg => Ok(svg::render(drawing.as_ref()).into_bytes()),
        OutputFormat::Png => match drawing {
            Some(drawing) => raster::render_png(&drawing),
            None => raster::render_no_data(canvas),
        },
    }
}
