//! Schema-driven decoding of one telemetry event into a [`FieldRecord`].
//!
//! Every record starts with the receipt time. The payload is then classified
//! and each field of its type's table is decoded on its own: a field whose key
//! is missing or whose values have the wrong shape is reported and left out,
//! and the remaining fields are still decoded.

use chrono::{DateTime, SecondsFormat};
use log::{error, warn};
use serde_json::{Map, Value};

use crate::data_capture::types::TelemetryEvent;
use crate::error_handling::types::DecodeError;

use super::field_record::FieldRecord;
use super::payload::{MessageType, TelemetryPayload};
use super::role_naming::{
    combiner_column_label, combiner_label, system_label, unit_label, CombinerPolicy, UnitKind,
    UnitRole,
};
use super::schema::{FieldSpec, Layout, ValueKind, TIMESTAMP_COLUMN};

type Entries = Vec<(String, String)>;

pub fn decode_event(event: &TelemetryEvent) -> FieldRecord {
    let mut record = FieldRecord::new();
    record.push(TIMESTAMP_COLUMN, format_timestamp(event.timestamp_millis()));

    match TelemetryPayload::classify(event.payload()).parts() {
        Some((ty, body)) => decode_fields(ty, body, &mut record),
        None => warn!(
            "Unexpected payload; don't know how to format this line: {}",
            event.raw_payload()
        ),
    }
    record
}

/// Appends the fields of `ty` found in `body`, in table order.
pub fn decode_fields(ty: MessageType, body: &Map<String, Value>, record: &mut FieldRecord) {
    for spec in ty.fields() {
        match decode_field(ty.tag(), spec, body) {
            Ok(entries) => record.extend(entries),
            Err(e) => error!("Skipping '{}' field '{}': {}", ty, spec.key, e),
        }
    }
}

/// All entries of one field, or the first problem that prevents decoding it.
pub fn decode_field(
    tag: &'static str,
    spec: &FieldSpec,
    body: &Map<String, Value>,
) -> Result<Entries, DecodeError> {
    let key = spec.key;
    let value = body
        .get(key)
        .ok_or(DecodeError::MissingKey { tag, key })?;
    let kind = spec.kind;

    match spec.layout {
        Layout::Scalar(name) => Ok(vec![(name.to_string(), render(value, kind, key)?)]),
        Layout::FirstElement(name) => {
            let values = as_array(value, key)?;
            match values.first() {
                Some(first) => Ok(vec![(name.to_string(), render(first, kind, key)?)]),
                None => Ok(Vec::new()),
            }
        }
        Layout::Pair(first, second) => {
            let values = as_array(value, key)?;
            if values.is_empty() {
                return Ok(Vec::new());
            }
            require(values, 2, key, 0)?;
            Ok(vec![
                (first.to_string(), render(&values[0], kind, key)?),
                (second.to_string(), render(&values[1], kind, key)?),
            ])
        }
        Layout::RowPair(first, second) => {
            let mut entries = Vec::new();
            for (i, row) in rows(value, key)?.enumerate() {
                let row = row?;
                require(row, 2, key, i)?;
                entries.push((first.to_string(), render(&row[0], kind, key)?));
                entries.push((second.to_string(), render(&row[1], kind, key)?));
            }
            Ok(entries)
        }
        Layout::UnitMatrix {
            unit,
            combiner,
            suffix,
        } => unit_matrix(value, key, kind, unit, combiner, suffix),
        Layout::UnitList(suffix) => unit_list(value, key, kind, suffix),
    }
}

fn unit_matrix(
    value: &Value,
    key: &'static str,
    kind: ValueKind,
    unit: UnitKind,
    combiner: CombinerPolicy,
    suffix: &str,
) -> Result<Entries, DecodeError> {
    let count = as_array(value, key)?.len();
    let width = unit.width();
    let mut entries = Vec::new();

    for (i, row) in rows(value, key)?.enumerate() {
        let row = row?;
        match UnitRole::for_row(i, count) {
            UnitRole::Combiner => match combiner {
                CombinerPolicy::ByRow => {
                    require(row, 1, key, i)?;
                    entries.push((combiner_label(suffix), render(&row[0], kind, key)?));
                }
                CombinerPolicy::PerColumnPair => {
                    require(row, 2, key, i)?;
                    for (j, cell) in row.iter().take(2).enumerate() {
                        entries.push((combiner_column_label(suffix, j), render(cell, kind, key)?));
                    }
                }
                CombinerPolicy::Break => {}
            },
            role => {
                require(row, width, key, i)?;
                for (j, cell) in row.iter().take(width).enumerate() {
                    entries.push((unit_label(role, unit, j, suffix), render(cell, kind, key)?));
                }
            }
        }
    }
    Ok(entries)
}

/// A list with more than one unit stops at the combiner slot, so only
/// single-unit lists produce an entry.
fn unit_list(
    value: &Value,
    key: &'static str,
    kind: ValueKind,
    suffix: &str,
) -> Result<Entries, DecodeError> {
    let values = as_array(value, key)?;
    let mut entries = Vec::new();

    for (i, cell) in values.iter().enumerate() {
        match UnitRole::for_row(i, values.len()) {
            UnitRole::Combiner => break,
            role => entries.push((system_label(role, suffix), render(cell, kind, key)?)),
        }
    }
    Ok(entries)
}

fn as_array<'a>(value: &'a Value, key: &'static str) -> Result<&'a Vec<Value>, DecodeError> {
    value.as_array().ok_or(DecodeError::UnexpectedType {
        key,
        expected: "an array",
    })
}

fn rows<'a>(
    value: &'a Value,
    key: &'static str,
) -> Result<impl Iterator<Item = Result<&'a Vec<Value>, DecodeError>> + 'a, DecodeError> {
    Ok(as_array(value, key)?.iter().map(move |row| {
        row.as_array().ok_or(DecodeError::UnexpectedType {
            key,
            expected: "an array of arrays",
        })
    }))
}

fn require(row: &[Value], width: usize, key: &'static str, index: usize) -> Result<(), DecodeError> {
    if row.len() < width {
        return Err(DecodeError::ShortRow {
            key,
            row: index,
            len: row.len(),
            width,
        });
    }
    Ok(())
}

fn render(value: &Value, kind: ValueKind, key: &'static str) -> Result<String, DecodeError> {
    match kind {
        ValueKind::Int => as_int(value)
            .map(|n| n.to_string())
            .ok_or(DecodeError::UnexpectedType {
                key,
                expected: "an integer",
            }),
        ValueKind::Float => as_float(value)
            .map(format_float)
            .ok_or(DecodeError::UnexpectedType {
                key,
                expected: "a number",
            }),
        ValueKind::Text => value
            .as_str()
            .map(str::to_string)
            .ok_or(DecodeError::UnexpectedType {
                key,
                expected: "a string",
            }),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Renders a reading as its shortest single-precision form with at least one
/// fractional digit, switching to `E` notation outside `[1e-3, 1e7)`.
pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{:?}", value);
    }

    let scientific = format!("{:e}", value);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{}E{}", mantissa, exponent),
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => scientific,
    }
}

/// ISO-8601 instant in UTC, truncated to whole seconds.
pub fn format_timestamp(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(instant) => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => {
            warn!("Timestamp {} is out of range", millis);
            millis.to_string()
        }
    }
}
