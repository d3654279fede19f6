//! Server-side HTML rendering of the dashboard page.
//!
//! The page is a settings form followed, when the session has a finished
//! run, by the share-of-voice metric, a pie chart, the full results table
//! and a CSV download link. No client-side script is involved.

use crate::config::{Config, MAX_QUERIES_PER_CATEGORY, MIN_QUERIES_PER_CATEGORY};
use crate::models::{CategoryMode, ResultsTable};
use crate::report::{
    format_share_of_voice, render_pie_svg, share_of_voice, slice_color, PresenceDistribution,
};

/// Values shown in the settings form. The credential is never echoed back.
#[derive(Debug, Clone)]
pub struct FormValues {
    pub brand_name: String,
    pub brand_domain: String,
    pub category_mode: CategoryMode,
    pub preset_categories: String,
    pub manual_categories: String,
    pub queries_per_category: usize,
    /// A fallback credential exists, so the key field may be left blank.
    pub has_default_key: bool,
}

impl FormValues {
    pub fn from_config(config: &Config) -> Self {
        Self {
            brand_name: config.brand.name.clone(),
            brand_domain: config.brand.domain.clone(),
            category_mode: CategoryMode::Preset,
            preset_categories: config.analysis.preset_categories.clone(),
            manual_categories: String::new(),
            queries_per_category: config.analysis.queries_per_category,
            has_default_key: config.resolve_api_key(None).is_some(),
        }
    }
}

/// Everything needed to render one page.
pub struct PageView<'a> {
    pub market: &'a str,
    pub form: &'a FormValues,
    /// Inline message shown above the form (configuration or run errors).
    pub error: Option<&'a str>,
    pub table: Option<&'a ResultsTable>,
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;background:#faf8f3;color:#2c3e50}\
header{background:#2c3e50;color:#fff;padding:1rem 2rem}\
main{display:grid;grid-template-columns:320px 1fr;gap:2rem;padding:2rem}\
form label{display:block;margin-top:.8rem;font-weight:600}\
form input[type=text],form input[type=password],form textarea{width:100%;box-sizing:border-box}\
.error{background:#fdecea;border:1px solid #c0392b;padding:.8rem;margin-bottom:1rem}\
.metric{font-size:2.5rem;font-weight:700;color:#d4af37}\
.summary{display:flex;gap:3rem;align-items:center}\
table{border-collapse:collapse;width:100%;margin-top:1rem}\
td,th{border:1px solid #ddd;padding:.4rem;vertical-align:top;text-align:left}\
td pre{white-space:pre-wrap;margin:0;font-family:inherit}\
.legend span{display:inline-block;width:.8rem;height:.8rem;margin-right:.3rem}";

fn render_form(form: &FormValues, market: &str) -> String {
    let mut options = String::new();
    for n in MIN_QUERIES_PER_CATEGORY..=MAX_QUERIES_PER_CATEGORY {
        let selected = if n == form.queries_per_category {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(r#"<option value="{n}"{selected}>{n}</option>"#));
    }

    let checked = |mode: CategoryMode| {
        if form.category_mode == mode {
            " checked"
        } else {
            ""
        }
    };

    let key_hint = if form.has_default_key {
        "Leave blank to use the configured key."
    } else {
        "Required."
    };

    format!(
        r#"<form method="post" action="/analyze">
<h2>1. Brand &amp; Market Settings</h2>
<p>Market: {market}</p>
<label for="api_key">OpenAI API Key</label>
<input type="password" id="api_key" name="api_key" autocomplete="off">
<small>{key_hint}</small>
<label for="brand_name">Brand Name</label>
<input type="text" id="brand_name" name="brand_name" value="{brand_name}">
<label for="brand_domain">Brand Domain</label>
<input type="text" id="brand_domain" name="brand_domain" value="{brand_domain}">
<fieldset><legend>Category Mode</legend>
<label><input type="radio" name="category_mode" value="preset"{preset_checked}> Signature Brand Categories</label>
<label><input type="radio" name="category_mode" value="manual"{manual_checked}> Manual Entry</label>
</fieldset>
<label for="preset_categories">Signature Brand Categories</label>
<textarea id="preset_categories" name="preset_categories" rows="5">{preset}</textarea>
<label for="manual_categories">Custom categories (comma separated)</label>
<textarea id="manual_categories" name="manual_categories" rows="3" placeholder="e.g. wedding guest outfits, floral capes, organza sarees">{manual}</textarea>
<label for="queries_per_category">Queries per Category</label>
<select id="queries_per_category" name="queries_per_category">{options}</select>
<p><button type="submit">Analyze Brand Visibility</button></p>
</form>"#,
        market = escape_html(market),
        key_hint = key_hint,
        brand_name = escape_html(&form.brand_name),
        brand_domain = escape_html(&form.brand_domain),
        preset_checked = checked(CategoryMode::Preset),
        manual_checked = checked(CategoryMode::Manual),
        preset = escape_html(&form.preset_categories),
        manual = escape_html(&form.manual_categories),
        options = options,
    )
}

fn render_results(table: &ResultsTable) -> String {
    let dist = PresenceDistribution::from_table(table);
    let sov = format_share_of_voice(share_of_voice(table));

    let chart = render_pie_svg(&dist).unwrap_or_else(|| "<p>No data to chart.</p>".to_string());

    let legend: String = dist
        .slices()
        .into_iter()
        .map(|(presence, n)| {
            format!(
                r#"<li><span style="background:{}"></span>{}: {}</li>"#,
                slice_color(presence),
                presence,
                n
            )
        })
        .collect();

    let rows: String = table
        .rows
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td><pre>{}</pre></td></tr>",
                escape_html(&row.query),
                row.brand_present,
                escape_html(&row.ai_context)
            )
        })
        .collect();

    format!(
        r#"<section id="results">
<hr>
<div class="summary">
<div><h3>{brand} Share of Voice (SOV)</h3><div class="metric" id="sov">{sov}</div>
<p>{count} queries analysed · {generated}</p></div>
<div><h3>Presence in AI Search Results</h3>{chart}<ul class="legend">{legend}</ul></div>
</div>
<h2>Market Intelligence</h2>
<p><a href="/report.csv" download>Download Report (CSV)</a></p>
<table>
<thead><tr><th>Query</th><th>Brand Present</th><th>AI Context</th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#,
        brand = escape_html(&table.brand_name),
        sov = sov,
        count = table.len(),
        generated = table.generated_at.format("%Y-%m-%d %H:%M UTC"),
        chart = chart,
        legend = legend,
        rows = rows,
    )
}

/// Render the whole dashboard page.
pub fn render_page(view: &PageView<'_>) -> String {
    let error = view
        .error
        .map(|msg| format!(r#"<div class="error" role="alert">{}</div>"#, escape_html(msg)))
        .unwrap_or_default();

    let results = view.table.map(render_results).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{brand} AEO Insights</title>
<style>{style}</style>
</head>
<body>
<header><h1>{brand}: AEO Visibility Analyzer</h1>
<p>Track how often AI shopping answers in {market} mention the brand.</p></header>
<main>
<aside>{form}</aside>
<div>{error}{results}</div>
</main>
</body>
</html>"#,
        brand = escape_html(&view.form.brand_name),
        market = escape_html(view.market),
        style = STYLE,
        form = render_form(view.form, view.market),
        error = error,
        results = results,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Presence, ResultRow};

    fn form() -> FormValues {
        let mut cfg = Config::minimal();
        cfg.llm.api_key_env = "AEO_DASHBOARD_TEST_KEY_NEVER_SET".to_string();
        FormValues::from_config(&cfg)
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Masaba" & 'co'</b>"#),
            "&lt;b&gt;&quot;Masaba&quot; &amp; &#39;co&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn page_without_results_shows_form_only() {
        let f = form();
        let html = render_page(&PageView {
            market: "India",
            form: &f,
            error: None,
            table: None,
        });
        assert!(html.contains(r#"action="/analyze""#));
        assert!(html.contains(r#"<option value="3" selected>3</option>"#));
        assert!(html.contains("Required."));
        assert!(!html.contains(r#"id="results""#));
        assert!(!html.contains("role=\"alert\""));
    }

    #[test]
    fn page_with_results_shows_metric_chart_and_rows() {
        let f = form();
        let table = ResultsTable::new(
            "House of Masaba",
            vec![
                ResultRow {
                    query: "printed kaftan".to_string(),
                    brand_present: Presence::Yes,
                    ai_context: "1. Masaba | <prints>".to_string(),
                },
                ResultRow {
                    query: "bridal lehenga".to_string(),
                    brand_present: Presence::No,
                    ai_context: "1. Sabyasachi".to_string(),
                },
            ],
        );
        let html = render_page(&PageView {
            market: "India",
            form: &f,
            error: None,
            table: Some(&table),
        });
        assert!(html.contains(r#"<div class="metric" id="sov">50.0%</div>"#));
        assert!(html.contains("<svg"));
        assert!(html.contains("/report.csv"));
        assert!(html.contains("1. Masaba | &lt;prints&gt;"));
        assert!(html.contains("2 queries analysed"));

        let body_start = html.find("<tbody>").unwrap();
        let body = &html[body_start..html.find("</tbody>").unwrap()];
        assert!(body.find("printed kaftan").unwrap() < body.find("bridal lehenga").unwrap());
    }

    #[test]
    fn empty_table_reports_no_data() {
        let f = form();
        let table = ResultsTable::new("House of Masaba", vec![]);
        let html = render_page(&PageView {
            market: "India",
            form: &f,
            error: None,
            table: Some(&table),
        });
        assert!(html.contains(">No data<"));
        assert!(html.contains("No data to chart."));
    }

    #[test]
    fn error_banner_is_escaped() {
        let f = form();
        let html = render_page(&PageView {
            market: "India",
            form: &f,
            error: Some("bad <key>"),
            table: None,
        });
        assert!(html.contains("bad &lt;key&gt;"));
    }
}
