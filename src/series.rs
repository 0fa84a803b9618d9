//! Reshapes the telemetry payload into the two-column series the chart draws.
//!
//! The payload looks like `{"medicoes": [{"data": "...", "cotareal": "220.41", ...}]}`.
//! Each record is flattened (`{"a": {"b": 1}}` becomes column `a.b`), the
//! `data` timestamp is turned into an `HH:MM` label and `cotareal` is kept as
//! the `montante` level. Rows stay in source order, which is chronological.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use utoipa::ToSchema;

pub const MEASUREMENTS_FIELD: &str = "medicoes";
pub const TIMESTAMP_COLUMN: &str = "data";
pub const LEVEL_COLUMN: &str = "cotareal";

/// Timestamp layouts seen from the telemetry provider, tried in order after RFC 3339.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Layouts with a trailing numeric offset that RFC 3339 rejects, e.g. `-0300`.
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// One plotted reading.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Measurement {
    /// Time of day, `HH:MM`
    pub hora: String,
    /// Upstream water level; `None` when the source value was not numeric
    pub montante: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SeriesTable {
    pub rows: Vec<Measurement>,
}

impl SeriesTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The chronologically last reading.
    pub fn latest(&self) -> Option<&Measurement> {
        self.rows.last()
    }

    pub fn missing_count(&self) -> usize {
        self.rows.iter().filter(|m| m.montante.is_none()).count()
    }
}

/// Build the series table from a decoded payload.
///
/// A `null` payload, a missing or non-list `medicoes` field and an empty list
/// all produce an empty table.
pub fn extract(payload: &Value) -> SeriesTable {
    let Some(records) = payload.get(MEASUREMENTS_FIELD).and_then(Value::as_array) else {
        debug!("Payload has no '{}' list", MEASUREMENTS_FIELD);
        return SeriesTable::default();
    };

    let mut rows = Vec::with_capacity(records.len());
    let mut skipped_rows = 0;

    for (index, record) in records.iter().enumerate() {
        let columns = flatten_record(record);

        let Some(hora) = columns
            .get(TIMESTAMP_COLUMN)
            .and_then(Value::as_str)
            .and_then(hour_label)
        else {
            warn!(
                "Skipping measurement {}: missing or unparseable '{}' timestamp ({:?})",
                index,
                TIMESTAMP_COLUMN,
                columns.get(TIMESTAMP_COLUMN)
            );
            skipped_rows += 1;
            continue;
        };

        let raw_level = columns.get(LEVEL_COLUMN);
        let montante = coerce_level(raw_level);
        if montante.is_none() {
            warn!(
                "Measurement {} at {}: '{}' value {:?} is not numeric, leaving a gap",
                index, hora, LEVEL_COLUMN, raw_level
            );
        }

        rows.push(Measurement { hora, montante });
    }

    if skipped_rows > 0 {
        warn!("Skipped {} measurements out of {}", skipped_rows, records.len());
    }
    debug!("Extracted {} measurements", rows.len());

    SeriesTable { rows }
}

/// Flatten nested objects into dotted column names.
///
/// Arrays and scalars are kept as leaf values. A record that is not an
/// object has no columns.
pub fn flatten_record(record: &Value) -> Map<String, Value> {
    let mut columns = Map::new();
    if let Value::Object(fields) = record {
        flatten_into(&mut columns, None, fields);
    }
    columns
}

fn flatten_into(
    columns: &mut Map<String, Value>,
    prefix: Option<&str>,
    fields: &Map<String, Value>,
) {
    for (key, value) in fields {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                flatten_into(columns, Some(&name), nested);
            }
            other => {
                columns.insert(name, other.clone());
            }
        }
    }
}

/// `HH:MM` label for a provider timestamp, in the timestamp's own wall-clock time.
pub fn hour_label(timestamp: &str) -> Option<String> {
    let timestamp = timestamp.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.format("%H:%M").to_string());
    }

    if let Some(dt) = OFFSET_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(timestamp, fmt).ok())
    {
        return Some(dt.format("%H:%M").to_string());
    }

    // A bare `Z` is UTC, so the wall-clock time is the naive time
    let naive = timestamp
        .strip_suffix(['Z', 'z'])
        .unwrap_or(timestamp);

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.format("%H:%M").to_string())
}

/// Numeric coercion for a level cell: anything that is not a finite number
/// (or a string holding one) becomes `None`.
pub fn coerce_level(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
