//! BigQuery REST result decoding.
//!
//! `jobs.query` and `jobs.getQueryResults` return rows as `{"f": [{"v": ...}]}`
//! with every scalar encoded as a JSON string; the schema tells us how to
//! read each cell back.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::warehouse::Value;

/// The subset of a query/getQueryResults response the cursor needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ResultPage {
    #[serde(default)]
    pub job_complete: Option<bool>,
    #[serde(default)]
    pub job_reference: Option<JobRef>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub schema: Option<WireSchema>,
    #[serde(default)]
    pub rows: Option<Vec<WireRow>>,
}

impl ResultPage {
    /// Re-reads a client model through its REST wire form.
    pub fn from_model<T: Serialize>(model: &T) -> Result<Self> {
        let raw = serde_json::to_value(model)
            .map_err(|e| ReportError::decode(format!("cannot encode response: {e}")))?;
        Self::from_json(raw)
    }

    pub fn from_json(raw: serde_json::Value) -> Result<Self> {
        serde_json::from_value(raw)
            .map_err(|e| ReportError::decode(format!("unexpected response shape: {e}")))
    }

    /// A missing flag means the rows are already there.
    pub fn is_complete(&self) -> bool {
        self.job_complete.unwrap_or(true)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_reference.as_ref()?.job_id.as_deref()
    }

    pub fn job_location(&self) -> Option<&str> {
        self.job_reference.as_ref()?.location.as_deref()
    }

    pub fn take_fields(&mut self) -> Vec<WireField> {
        self.schema
            .take()
            .and_then(|s| s.fields)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JobRef {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct WireSchema {
    #[serde(default)]
    pub fields: Option<Vec<WireField>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct WireField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<WireField>>,
}

impl WireField {
    fn is_repeated(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("REPEATED"))
    }

    fn subfields(&self) -> &[WireField] {
        self.fields.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct WireRow {
    #[serde(default)]
    pub f: Option<Vec<WireCell>>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct WireCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

/// How a column's cells are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FieldKind {
    Int,
    Float,
    Bool,
    Timestamp,
    Record,
    Text,
}

impl FieldKind {
    pub fn parse(kind: &str) -> Self {
        match kind.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT64" => Self::Int,
            "FLOAT" | "FLOAT64" => Self::Float,
            "BOOLEAN" | "BOOL" => Self::Bool,
            "TIMESTAMP" => Self::Timestamp,
            "RECORD" | "STRUCT" => Self::Record,
            // NUMERIC, BIGNUMERIC, DATE, TIME, DATETIME, BYTES, GEOGRAPHY, JSON, STRING
            _ => Self::Text,
        }
    }
}

/// Decodes one row against the schema fields, positionally.
pub(super) fn decode_row(fields: &[WireField], row: WireRow) -> Result<Vec<Value>> {
    let cells = row.f.unwrap_or_default();
    if cells.len() != fields.len() {
        return Err(ReportError::decode(format!(
            "row has {} cells but schema has {} fields",
            cells.len(),
            fields.len()
        )));
    }
    fields
        .iter()
        .zip(cells)
        .map(|(field, cell)| decode_cell(field, cell.v))
        .collect()
}

fn decode_cell(field: &WireField, raw: serde_json::Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if !field.is_repeated() {
        return decode_scalar(field, raw);
    }

    let serde_json::Value::Array(items) = raw else {
        return Err(mismatch(field, "array", &raw));
    };
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Object(mut wrapper) => {
                let inner = wrapper.remove("v").unwrap_or_default();
                decode_element(field, inner)
            }
            bare => decode_element(field, bare),
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn decode_element(field: &WireField, raw: serde_json::Value) -> Result<Value> {
    if raw.is_null() {
        Ok(Value::Null)
    } else {
        decode_scalar(field, raw)
    }
}

fn decode_scalar(field: &WireField, raw: serde_json::Value) -> Result<Value> {
    match FieldKind::parse(&field.kind) {
        FieldKind::Record => decode_record(field, raw),
        FieldKind::Int => match &raw {
            serde_json::Value::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| mismatch(field, "integer", &raw)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| mismatch(field, "integer", &raw)),
            _ => Err(mismatch(field, "integer", &raw)),
        },
        FieldKind::Float => match &raw {
            serde_json::Value::String(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(field, "float", &raw)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| mismatch(field, "float", &raw)),
            _ => Err(mismatch(field, "float", &raw)),
        },
        FieldKind::Bool => match &raw {
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("false") => {
                Ok(Value::Bool(false))
            }
            _ => Err(mismatch(field, "boolean", &raw)),
        },
        FieldKind::Timestamp => {
            let seconds = match &raw {
                serde_json::Value::String(s) => s.parse::<f64>().ok(),
                serde_json::Value::Number(n) => n.as_f64(),
                _ => None,
            };
            seconds
                .and_then(timestamp_from_seconds)
                .map(Value::Timestamp)
                .ok_or_else(|| mismatch(field, "timestamp", &raw))
        }
        FieldKind::Text => Ok(match raw {
            serde_json::Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
    }
}

fn decode_record(field: &WireField, raw: serde_json::Value) -> Result<Value> {
    let cells = match raw {
        serde_json::Value::Object(mut obj) => obj.remove("f"),
        _ => None,
    };
    let Some(serde_json::Value::Array(cells)) = cells else {
        return Err(ReportError::decode(format!(
            "field '{}' is a record but the cell is not {{\"f\": [...]}}",
            field.name
        )));
    };

    let mut out = IndexMap::with_capacity(field.subfields().len());
    for (sub, cell) in field.subfields().iter().zip(cells) {
        let inner = match cell {
            serde_json::Value::Object(mut wrapper) => wrapper.remove("v").unwrap_or_default(),
            other => other,
        };
        out.insert(sub.name.clone(), decode_cell(sub, inner)?);
    }
    Ok(Value::Record(out))
}

/// BigQuery encodes TIMESTAMP cells as fractional epoch seconds.
fn timestamp_from_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

fn mismatch(field: &WireField, expected: &str, raw: &serde_json::Value) -> ReportError {
    ReportError::decode(format!(
        "field '{}' ({}) expected {expected}, got {raw}",
        field.name, field.kind
    ))
}
