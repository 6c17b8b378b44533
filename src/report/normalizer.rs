//! Row normalization.
//!
//! Turns cursor records, keyed or positional, into uniform `ResultRow`s and
//! works out the column names, with or without explicit schema metadata.

use crate::error::{ReportError, Result};
use crate::warehouse::{QueryContext, Record, ResultRow, RowCursor, Value};

/// Everything read from one cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedRows {
    /// Rows in cursor order.
    pub rows: Vec<ResultRow>,
    /// Column names: from metadata when present, else from the first record's keys.
    pub columns: Vec<String>,
}

/// Reads `cursor` to exhaustion.
///
/// With column metadata, every row is mapped onto exactly those names,
/// whatever keys it physically carries. Without it, names come from the
/// first record and later records keep their own keys. Any cursor error
/// aborts the scan; no partial rows are returned.
pub async fn scan_all(cursor: &mut dyn RowCursor, ctx: &QueryContext) -> Result<ScannedRows> {
    let declared: Option<Vec<String>> = cursor.columns().map(<[String]>::to_vec);
    let mut out = ScannedRows {
        columns: declared.clone().unwrap_or_default(),
        ..Default::default()
    };

    while let Some(record) = ctx.run("row fetch", cursor.next_record()).await? {
        let row = match &declared {
            Some(columns) => map_declared(columns, record),
            None => map_inferred(record)?,
        };
        if declared.is_none() && out.rows.is_empty() {
            out.columns = row.keys().cloned().collect();
        }
        out.rows.push(row);
    }

    Ok(out)
}

fn map_declared(columns: &[String], record: Record) -> ResultRow {
    match record {
        Record::Positional(values) => {
            let mut values = values.into_iter();
            columns
                .iter()
                .map(|name| (name.clone(), values.next().unwrap_or_default()))
                .collect()
        }
        Record::Keyed(mut row) => columns
            .iter()
            .map(|name| {
                let value = row.shift_remove(name).unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect(),
    }
}

fn map_inferred(record: Record) -> Result<ResultRow> {
    match record {
        Record::Keyed(row) => Ok(row),
        Record::Positional(values) => Err(ReportError::decode(format!(
            "cursor returned a positional record of {} values without column metadata",
            values.len()
        ))),
    }
}
