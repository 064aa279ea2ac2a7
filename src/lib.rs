// Library exports for gramreport

pub mod aggregate;
pub mod collapse;
pub mod csv_reader;
pub mod data;
pub mod dates;
pub mod geometry;
pub mod mappings;
pub mod raster;
pub mod report;
pub mod runtime;
pub mod schema;
pub mod stats;
pub mod svg;

use geometry::{CanvasSize, ChartKind};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "svg")]
    #[default]
    Svg,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            other => Err(format!("unknown output format '{}' (expected svg or png)", other)),
        }
    }
}

/// Output settings for a single rendered chart. Unset dimensions fall back to
/// the chart kind's default canvas.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderOptions {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

impl RenderOptions {
    pub fn canvas_for(&self, kind: ChartKind) -> CanvasSize {
        let default = kind.default_canvas();
        CanvasSize::new(
            self.width.map_or(default.width, f64::from),
            self.height.map_or(default.height, f64::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_defaults() {
        let options: RenderOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.format, OutputFormat::Svg);
        assert_eq!(options.canvas_for(ChartKind::Pie), CanvasSize::new(450.0, 450.0));
    }

    #[test]
    fn test_render_options_override() {
        let options: RenderOptions = serde_json::from_str(r#"{"width": 1000, "type": "png"}"#).unwrap();
        assert_eq!(options.format, OutputFormat::Png);
        assert_eq!(options.canvas_for(ChartKind::Bar), CanvasSize::new(1000.0, 300.0));
    }
}
