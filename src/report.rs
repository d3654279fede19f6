//! Share-of-voice metrics and report serialization.
//!
//! Everything the dashboard shows is derived here from a [`ResultsTable`]:
//! the headline percentage, the Yes/No/Error split, the pie chart and the
//! CSV download.

use anyhow::Result;
use serde::Serialize;
use std::f64::consts::PI;

use crate::models::{Presence, ResultsTable};

/// File name offered for the CSV download.
pub const REPORT_FILE_NAME: &str = "aeo_report.csv";

/// Column headers, in order.
pub const CSV_HEADERS: [&str; 3] = ["Query", "Brand Present", "AI Context"];

/// `100 × Yes rows / all rows`. `None` when there are no rows.
///
/// Error rows are part of the denominator.
pub fn share_of_voice(table: &ResultsTable) -> Option<f64> {
    if table.is_empty() {
        return None;
    }
    let yes = table
        .rows
        .iter()
        .filter(|r| r.brand_present == Presence::Yes)
        .count();
    Some(yes as f64 * 100.0 / table.len() as f64)
}

/// One decimal place with a percent sign, or "No data".
pub fn format_share_of_voice(sov: Option<f64>) -> String {
    match sov {
        Some(v) => format!("{:.1}%", v),
        None => "No data".to_string(),
    }
}

/// Row counts per presence value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PresenceDistribution {
    pub yes: usize,
    pub no: usize,
    pub error: usize,
}

impl PresenceDistribution {
    pub fn from_table(table: &ResultsTable) -> Self {
        let mut dist = Self::default();
        for row in &table.rows {
            match row.brand_present {
                Presence::Yes => dist.yes += 1,
                Presence::No => dist.no += 1,
                Presence::Error => dist.error += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.yes + self.no + self.error
    }

    /// Non-empty slices in display order.
    pub fn slices(&self) -> Vec<(Presence, usize)> {
        [
            (Presence::Yes, self.yes),
            (Presence::No, self.no),
            (Presence::Error, self.error),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }
}

pub fn slice_color(presence: Presence) -> &'static str {
    match presence {
        Presence::Yes => "#D4AF37",
        Presence::No => "#2C3E50",
        Presence::Error => "#C0392B",
    }
}

/// Inline SVG pie chart of the distribution. `None` when there is nothing
/// to draw.
pub fn render_pie_svg(dist: &PresenceDistribution) -> Option<String> {
    const R: f64 = 90.0;
    const C: f64 = 100.0;

    let total = dist.total();
    if total == 0 {
        return None;
    }

    let mut svg = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 200" width="240" height="240" role="img" aria-label="Brand presence distribution">"#,
    );

    let slices = dist.slices();
    if slices.len() == 1 {
        // An arc cannot span a full turn.
        let (presence, n) = slices[0];
        svg.push_str(&format!(
            r#"<circle cx="{C}" cy="{C}" r="{R}" fill="{}"><title>{}: {}</title></circle>"#,
            slice_color(presence),
            presence,
            n
        ));
    } else {
        let mut start = -PI / 2.0;
        for (presence, n) in slices {
            let sweep = 2.0 * PI * n as f64 / total as f64;
            let end = start + sweep;
            let (x1, y1) = (C + R * start.cos(), C + R * start.sin());
            let (x2, y2) = (C + R * end.cos(), C + R * end.sin());
            let large_arc = if sweep > PI { 1 } else { 0 };
            svg.push_str(&format!(
                r#"<path d="M {C} {C} L {:.3} {:.3} A {R} {R} 0 {} 1 {:.3} {:.3} Z" fill="{}"><title>{}: {}</title></path>"#,
                x1,
                y1,
                large_arc,
                x2,
                y2,
                slice_color(presence),
                presence,
                n
            ));
            start = end;
        }
    }

    svg.push_str("</svg>");
    Some(svg)
}

/// Serialize the table as UTF-8 CSV with a header row and no index column.
pub fn to_csv(table: &ResultsTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for row in &table.rows {
        writer.write_record([
            row.query.as_str(),
            row.brand_present.as_str(),
            row.ai_context.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV report: {}", e.error()))
}
