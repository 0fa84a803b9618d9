//! Server-rendered dashboard page.
//!
//! The page reloads itself every refresh period and draws the latest chart
//! spec with vega-embed, or shows a warning banner when there is no data.

use chrono_tz::Tz;
use tera::{Context, Tera};

use crate::chart::ChartView;
use crate::pipeline::DashboardSnapshot;

pub const PAGE_TITLE: &str = "UHE Teles Pires - Hidrologia";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta http-equiv="refresh" content="{{ refresh_secs }}">
    <title>{{ title }}</title>
    <link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>📈</text></svg>">
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body { font-family: system-ui, -apple-system, sans-serif; background: #0e1117; color: #fafafa; min-height: 100vh; }
        .container { width: 100%; padding: 1.5rem 2.5rem; }
        h1 { font-size: 2rem; font-weight: 700; margin-bottom: 1.5rem; }
        #chart { width: 100%; }
        .warning { background: rgba(255, 193, 7, 0.15); color: #ffd54f; border-radius: 0.5rem; padding: 1rem 1.25rem; font-size: 1rem; }
        footer { margin-top: 1rem; font-size: 0.8rem; color: #9ca3af; }
    </style>
{%- if spec_json %}
    <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
    <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
    <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
{%- endif %}
</head>
<body>
<div class="container">
    <h1>{{ title }}</h1>
{%- if spec_json %}
    <div id="chart"></div>
    <script>
        vegaEmbed('#chart', {{ spec_json | safe }}, { actions: false });
    </script>
{%- else %}
    <div class="warning" role="alert">{{ message }}</div>
{%- endif %}
{%- if refreshed_at %}
    <footer>Atualizado em {{ refreshed_at }}</footer>
{%- endif %}
</div>
</body>
</html>
"#;

/// Render the full HTML page for a snapshot.
///
/// Every value is autoescaped except the chart spec, which is JSON placed
/// inside a `<script>` block after `script_safe_json`.
pub fn render_page(
    snapshot: &DashboardSnapshot,
    refresh_secs: u64,
    timezone: Tz,
) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("title", PAGE_TITLE);
    context.insert("refresh_secs", &refresh_secs);

    match &snapshot.view {
        ChartView::Chart { spec } => {
            context.insert("spec_json", &script_safe_json(&spec.to_string()));
        }
        ChartView::NoData { message, .. } => {
            context.insert("message", message);
        }
    }

    if let Some(refreshed_at) = snapshot.refreshed_at {
        let local = refreshed_at.with_timezone(&timezone);
        context.insert(
            "refreshed_at",
            &local.format("%d/%m/%Y %H:%M:%S").to_string(),
        );
    }

    Tera::one_off(PAGE_TEMPLATE, &context, true)
}

/// JSON embedded in a `<script>` block must not contain a literal `</`.
fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}
