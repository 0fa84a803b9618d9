//! Vega-Lite chart specification for the upstream level dashboard.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::series::{Measurement, SeriesTable};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// d3-format string shared by axis, tooltip and label.
pub const LEVEL_FORMAT: &str = ".2f";

const LINE_COLOR: &str = "green";
const THRESHOLD_COLOR: &str = "red";
const LABEL_COLOR: &str = "yellow";
const BACKGROUND: &str = "black";
const CHART_HEIGHT: u32 = 500;

/// Threshold band and y-axis layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub axis_min: f64,
    pub axis_max: f64,
    pub axis_step: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            lower_threshold: 220.40,
            upper_threshold: 220.44,
            axis_min: 220.39,
            axis_max: 220.45,
            axis_step: 0.01,
        }
    }
}

/// Why the dashboard shows a warning instead of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    /// No cycle has completed yet
    Pending,
    /// The telemetry request or its decoding failed
    FetchFailed,
    /// The payload held no measurements
    EmptyData,
}

impl NoDataReason {
    pub fn message(&self) -> &'static str {
        match self {
            NoDataReason::Pending => "Aguardando a primeira leitura.",
            NoDataReason::FetchFailed => "Não foi possível obter os dados de telemetria.",
            NoDataReason::EmptyData => "Nenhum dado disponível para exibir.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartView {
    Chart {
        #[schema(value_type = Object)]
        spec: Value,
    },
    NoData {
        reason: NoDataReason,
        message: String,
    },
}

impl ChartView {
    pub fn no_data(reason: NoDataReason) -> Self {
        ChartView::NoData {
            reason,
            message: reason.message().to_string(),
        }
    }

    pub fn spec(&self) -> Option<&Value> {
        match self {
            ChartView::Chart { spec } => Some(spec),
            ChartView::NoData { .. } => None,
        }
    }
}

/// Two-decimal rendering of a level, as shown on the latest-point label.
pub fn format_level(value: f64) -> String {
    format!("{value:.2}")
}

/// Upper bound on explicit y-axis tick values.
pub const MAX_AXIS_TICKS: usize = 1000;

/// Number of ticks `axis_ticks` produces, or `None` when the range is
/// invalid or would need more than `MAX_AXIS_TICKS` values.
pub fn axis_tick_count(start: f64, stop: f64, step: f64) -> Option<usize> {
    tick_steps(start, stop, step).map(|steps| steps + 1)
}

fn tick_steps(start: f64, stop: f64, step: f64) -> Option<usize> {
    if !step.is_finite() || step <= 0.0 || !start.is_finite() || !stop.is_finite() || stop < start
    {
        return None;
    }

    let steps = ((stop - start) / step + 1e-9).floor();
    if !steps.is_finite() || steps >= MAX_AXIS_TICKS as f64 {
        return None;
    }
    Some(steps as usize)
}

/// Inclusive tick values from `start` to `stop`, rounded to two decimals.
///
/// Values are computed from the step index, so there is no accumulated
/// floating-point drift and `stop` is always reached when it lies on the grid.
/// Invalid ranges and ranges over `MAX_AXIS_TICKS` values yield no ticks.
pub fn axis_ticks(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let Some(steps) = tick_steps(start, stop, step) else {
        warn!(
            "Skipping explicit axis ticks for range [{}, {}] step {}",
            start, stop, step
        );
        return Vec::new();
    };

    (0..=steps)
        .map(|i| round2(start + i as f64 * step))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn tooltip() -> Value {
    json!([
        {"field": "hora", "type": "ordinal", "title": "Hora"},
        {"field": "montante", "type": "quantitative", "title": "Montante", "format": LEVEL_FORMAT}
    ])
}

fn x_encoding() -> Value {
    json!({"field": "hora", "type": "ordinal", "title": "Hora", "sort": null})
}

fn y_encoding(settings: &ChartSettings) -> Value {
    json!({
        "field": "montante",
        "type": "quantitative",
        "title": "Montante",
        "scale": {"domain": [settings.axis_min, settings.axis_max]},
        "axis": {
            "format": LEVEL_FORMAT,
            "values": axis_ticks(settings.axis_min, settings.axis_max, settings.axis_step)
        }
    })
}

fn line_layer(table: &SeriesTable, settings: &ChartSettings) -> Value {
    json!({
        "data": {"values": table.rows},
        "mark": {
            "type": "line",
            "color": LINE_COLOR,
            "interpolate": "monotone",
            "strokeWidth": 5
        },
        "encoding": {
            "x": x_encoding(),
            "y": y_encoding(settings),
            "tooltip": tooltip()
        }
    })
}

fn threshold_layer(settings: &ChartSettings) -> Value {
    json!({
        "data": {"values": [{"y": settings.lower_threshold}, {"y": settings.upper_threshold}]},
        "mark": {
            "type": "rule",
            "color": THRESHOLD_COLOR,
            "strokeWidth": 1,
            "strokeDash": [6, 4]
        },
        "encoding": {
            "y": {"field": "y", "type": "quantitative"}
        }
    })
}

fn latest_layers(hora: &str, level: f64) -> [Value; 2] {
    let point = json!([{"hora": hora, "montante": level, "rotulo": format_level(level)}]);

    let marker = json!({
        "data": {"values": point},
        "mark": {"type": "circle", "color": LINE_COLOR, "size": 100, "opacity": 1},
        "encoding": {
            "x": x_encoding(),
            "y": {"field": "montante", "type": "quantitative"},
            "tooltip": tooltip()
        }
    });

    let label = json!({
        "data": {"values": point},
        "mark": {
            "type": "text",
            "align": "center",
            "baseline": "bottom",
            "dy": -15,
            "color": LABEL_COLOR,
            "fontSize": 18
        },
        "encoding": {
            "x": x_encoding(),
            "y": {"field": "montante", "type": "quantitative"},
            "text": {"field": "rotulo", "type": "nominal"}
        }
    });

    [marker, label]
}

/// Build the dashboard chart, or the no-data view for an empty table.
///
/// When the latest reading itself is missing there is nothing to anchor the
/// marker to, so only the line and threshold layers are drawn.
pub fn render(table: &SeriesTable, settings: &ChartSettings) -> ChartView {
    let Some(latest) = table.latest() else {
        debug!("Empty series, rendering no-data view");
        return ChartView::no_data(NoDataReason::EmptyData);
    };

    let mut layers = vec![line_layer(table, settings), threshold_layer(settings)];
    if let Measurement {
        hora,
        montante: Some(level),
    } = latest
    {
        layers.extend(latest_layers(hora, *level));
    }
    debug!("Rendered chart with {} rows and {} layers", table.len(), layers.len());

    let spec = json!({
        "$schema": VEGA_LITE_SCHEMA,
        "width": "container",
        "height": CHART_HEIGHT,
        "background": BACKGROUND,
        "padding": {"left": 20, "right": 20, "top": 20, "bottom": 20},
        "layer": layers,
        "config": {
            "axis": {"labelFontSize": 18, "titleFontSize": 20},
            "legend": {"labelFontSize": 18, "titleFontSize": 20},
            "title": {"fontSize": 24}
        }
    });

    ChartView::Chart { spec }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, Option<f64>)]) -> SeriesTable {
        SeriesTable {
            rows: rows
                .iter()
                .map(|(hora, montante)| Measurement {
                    hora: hora.to_string(),
                    montante: *montante,
                })
                .collect(),
        }
    }

    fn layer_with_mark<'a>(spec: &'a Value, mark: &str) -> Option<&'a Value> {
        spec["layer"]
            .as_array()
            .unwrap()
            .iter()
            .find(|layer| layer["mark"]["type"] == mark)
    }

    #[test]
    fn test_axis_ticks_default_band() {
        let ticks = axis_ticks(220.39, 220.45, 0.01);
        assert_eq!(
            ticks,
            vec![220.39, 220.40, 220.41, 220.42, 220.43, 220.44, 220.45]
        );
    }

    #[test]
    fn test_axis_ticks_have_no_drift() {
        for tick in axis_ticks(220.39, 220.45, 0.01) {
            let text = tick.to_string();
            let decimals = text.split('.').nth(1).map_or(0, str::len);
            assert!(decimals <= 2, "tick {} has drift", text);
        }
    }

    #[test]
    fn test_axis_ticks_invalid_input() {
        assert!(axis_ticks(1.0, 0.0, 0.1).is_empty());
        assert!(axis_ticks(0.0, 1.0, 0.0).is_empty());
        assert!(axis_ticks(0.0, 1.0, f64::NAN).is_empty());
        assert_eq!(axis_ticks(5.0, 5.0, 0.5), vec![5.0]);
    }

    #[test]
    fn test_axis_ticks_tiny_step_is_capped() {
        assert!(axis_ticks(220.39, 220.45, 1e-300).is_empty());
        assert!(axis_ticks(220.39, 220.45, 1e-9).is_empty());
        assert_eq!(axis_tick_count(220.39, 220.45, 1e-300), None);
    }

    #[test]
    fn test_axis_tick_count() {
        assert_eq!(axis_tick_count(220.39, 220.45, 0.01), Some(7));
        assert_eq!(axis_tick_count(0.0, 999.0, 1.0), Some(MAX_AXIS_TICKS));
        assert_eq!(axis_tick_count(0.0, 1000.0, 1.0), None);
        assert_eq!(axis_tick_count(1.0, 0.0, 0.1), None);
    }

    #[test]
    fn test_render_tiny_step_does_not_panic() {
        let settings = ChartSettings {
            axis_step: 1e-300,
            ..ChartSettings::default()
        };
        let view = render(&table(&[("08:00", Some(220.41))]), &settings);
        let line = layer_with_mark(view.spec().unwrap(), "line").unwrap();
        assert_eq!(line["encoding"]["y"]["axis"]["values"], json!([]));
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(220.43), "220.43");
        assert_eq!(format_level(220.4), "220.40");
        assert_eq!(format_level(220.456), "220.46");
    }

    #[test]
    fn test_render_empty_table() {
        let view = render(&SeriesTable::default(), &ChartSettings::default());
        assert_eq!(view, ChartView::no_data(NoDataReason::EmptyData));
        assert!(view.spec().is_none());
    }

    #[test]
    fn test_render_latest_point_label() {
        let view = render(
            &table(&[("08:00", Some(220.41)), ("08:01", Some(220.43))]),
            &ChartSettings::default(),
        );
        let spec = view.spec().unwrap();

        let label = layer_with_mark(spec, "text").unwrap();
        assert_eq!(label["data"]["values"][0]["hora"], "08:01");
        assert_eq!(label["data"]["values"][0]["montante"], 220.43);
        assert_eq!(label["data"]["values"][0]["rotulo"], "220.43");
        assert_eq!(label["mark"]["dy"], -15);

        let marker = layer_with_mark(spec, "circle").unwrap();
        assert_eq!(marker["data"]["values"][0]["hora"], "08:01");
        assert_eq!(marker["encoding"]["tooltip"][1]["format"], LEVEL_FORMAT);
    }

    #[test]
    fn test_render_line_keeps_row_order_and_gaps() {
        let view = render(
            &table(&[("23:50", Some(220.41)), ("00:00", None), ("00:10", Some(220.42))]),
            &ChartSettings::default(),
        );
        let line = layer_with_mark(view.spec().unwrap(), "line").unwrap();

        assert_eq!(line["encoding"]["x"]["sort"], Value::Null);
        assert_eq!(line["mark"]["interpolate"], "monotone");
        let values = line["data"]["values"].as_array().unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0]["hora"], "23:50");
        assert_eq!(values[1]["montante"], Value::Null);
    }

    #[test]
    fn test_render_axis_and_thresholds() {
        let view = render(&table(&[("08:00", Some(220.41))]), &ChartSettings::default());
        let spec = view.spec().unwrap();

        let line = layer_with_mark(spec, "line").unwrap();
        assert_eq!(line["encoding"]["y"]["scale"]["domain"], json!([220.39, 220.45]));
        assert_eq!(line["encoding"]["y"]["axis"]["format"], ".2f");
        assert_eq!(line["encoding"]["y"]["axis"]["values"].as_array().unwrap().len(), 7);

        let rules = layer_with_mark(spec, "rule").unwrap();
        assert_eq!(rules["data"]["values"], json!([{"y": 220.40}, {"y": 220.44}]));
        assert_eq!(rules["mark"]["strokeDash"], json!([6, 4]));
    }

    #[test]
    fn test_render_missing_latest_omits_marker() {
        let view = render(
            &table(&[("08:00", Some(220.41)), ("08:01", None)]),
            &ChartSettings::default(),
        );
        let spec = view.spec().unwrap();
        assert!(layer_with_mark(spec, "line").is_some());
        assert!(layer_with_mark(spec, "circle").is_none());
        assert!(layer_with_mark(spec, "text").is_none());
    }

    #[test]
    fn test_render_custom_thresholds() {
        let settings = ChartSettings {
            lower_threshold: 100.0,
            upper_threshold: 105.5,
            ..ChartSettings::default()
        };
        let view = render(&table(&[("08:00", Some(101.0))]), &settings);
        let rules = layer_with_mark(view.spec().unwrap(), "rule").unwrap();
        assert_eq!(rules["data"]["values"], json!([{"y": 100.0}, {"y": 105.5}]));
    }
}
