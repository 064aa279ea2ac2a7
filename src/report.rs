//! Report assembly: summary numbers plus the four charts, wrapped into one
//! self-contained HTML document.

use crate::aggregate::ResultLimit;
use crate::data::Table;
use crate::geometry::ChartKind;
use crate::mappings::ChartMappings;
use crate::runtime::{build_chart, chart_series};
use crate::stats::SummaryStats;
use crate::svg::{self, escape_html};
use chrono::{DateTime, Local};
use log::info;

pub const REPORT_TITLE: &str = "Data Report";

const STYLE: &str = "\
    body { font-family: Arial, sans-serif; padding: 24px; background: #f3f4f6; color: #111; }
    h1 { color: #6b21a8; }
    .stat { padding: 12px; border-radius: 8px; background: #fff; margin-right: 8px; display: inline-block; min-width: 120px; text-align: center; box-shadow: 0 2px 6px rgba(0,0,0,0.06); }
    .stat .label { font-size: 12px; color: #666; }
    .stat .value { font-size: 18px; font-weight: 700; margin-top: 6px; }
    .section { margin-top: 28px; }
    .card { background: #fff; padding: 12px; border-radius: 10px; box-shadow: 0 2px 6px rgba(0,0,0,0.06); margin-top: 10px; }
";

/// One chart section of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub kind: ChartKind,
    /// SVG markup, or the no-data placeholder
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    /// Statistics over the bar series; `None` when it is empty
    pub summary: Option<SummaryStats>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    /// Aggregate every chart over the full category set and lay it out.
    ///
    /// Deterministic for a fixed `generated_at`.
    pub fn assemble(table: &Table, mappings: &ChartMappings, generated_at: DateTime<Local>) -> Self {
        let summary = SummaryStats::from_series(&chart_series(table, mappings, ChartKind::Bar, ResultLimit::All));

        let sections = ChartKind::ALL
            .iter()
            .map(|&kind| {
                let drawing = build_chart(table, mappings, kind, ResultLimit::All, None);
                ReportSection {
                    kind,
                    markup: svg::render(drawing.as_ref()),
                }
            })
            .collect();

        info!("Assembled report over {} rows", table.len());

        Self {
            generated_at,
            summary,
            sections,
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<!doctype html>\n<html>\n<head>\n");
        html.push_str(&format!(
            "  <meta charset=\"utf-8\"><title>{}</title>\n  <style>\n{}  </style>\n",
            REPORT_TITLE, STYLE
        ));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("  <h1>{}</h1>\n", REPORT_TITLE));
        html.push_str(&format!(
            "  <p>Generated: {}</p>\n",
            escape_html(&self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string())
        ));

        html.push_str("  <div>\n");
        match &self.summary {
            Some(s) => {
                html.push_str(&stat_card("Records", &s.count.to_string()));
                html.push_str(&stat_card("Sum", &format!("{:.2}", s.sum)));
                html.push_str(&stat_card("Avg", &format!("{:.2}", s.avg)));
                html.push_str(&stat_card("Max", &format!("{:.2}", s.max)));
                html.push_str(&stat_card("Min", &format!("{:.2}", s.min)));
            }
            None => html.push_str(&format!("    {}\n", svg::NO_DATA)),
        }
        html.push_str("  </div>\n");

        for section in &self.sections {
            html.push_str(&format!(
                "  <div class=\"section\"><h2>{}</h2><div class=\"card\">\n{}\n  </div></div>\n",
                section.kind.title(),
                section.markup
            ));
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn stat_card(label: &str, value: &str) -> String {
    format!(
        "    <div class=\"stat\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
        label, value
    )
}
