//! Row-oriented CSV/JSON readers and writers shared by the file operator,
//! the relational exports and the key-value exports.
//!
//! CSV policy: the header is the first row's column list; every other row is
//! written against that list, missing fields as empty cells and extra fields
//! dropped, with a warning per divergent row. Keyed exports use the union of
//! all column names instead, so no entry loses fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use log::warn;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::{OrmError, Row, Value};

/// Parse CSV text into rows. Every cell loads as [`Value::Text`].
pub fn read_csv(text: &str) -> Result<Vec<Row>, OrmError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, field)| (h.clone(), Value::Text(field.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Parse JSON text into rows. The document must be an array of objects.
pub fn read_json(text: &str) -> Result<Vec<Row>, OrmError> {
    let document: serde_json::Value = serde_json::from_str(text)?;
    let array = document
        .as_array()
        .ok_or_else(|| OrmError::MalformedData(String::from("expected a JSON array of rows")))?;
    let mut rows = Vec::with_capacity(array.len());
    for entry in array {
        let object = entry.as_object().ok_or_else(|| {
            OrmError::MalformedData(String::from("expected every JSON row to be an object"))
        })?;
        let row: Row = object
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn row_to_json(row: &Row) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (key, value) in row {
        object.insert(key.clone(), value.to_json());
    }
    serde_json::Value::Object(object)
}

/// Write rows as CSV, header taken from the first row.
pub fn write_csv(path: &Path, rows: &[&Row]) -> Result<(), OrmError> {
    let Some(first) = rows.first() else {
        warn!("no data to write to {}", path.display());
        return Ok(());
    };
    let fields: Vec<&String> = first.keys().collect();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(fields.iter().map(|f| f.as_str()))?;
    for row in rows {
        if row.len() != fields.len() || !fields.iter().all(|f| row.contains_key(*f)) {
            warn!(
                "row columns {:?} diverge from header {:?}, cells realigned",
                row.keys().collect::<Vec<_>>(),
                fields
            );
        }
        let record: Vec<String> = fields
            .iter()
            .map(|f| row.get(*f).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write rows as a JSON array with 4-space indentation.
pub fn write_json(path: &Path, rows: &[&Row]) -> Result<(), OrmError> {
    let array: Vec<serde_json::Value> = rows.iter().map(|r| row_to_json(r)).collect();
    write_pretty(path, &serde_json::Value::Array(array))
}

/// Write keyed entries as CSV: one `key` column plus the union of all entry
/// columns, missing cells left empty.
pub fn write_keyed_csv(
    path: &Path,
    key_label: &str,
    entries: &IndexMap<String, Row>,
) -> Result<(), OrmError> {
    let mut fields: IndexSet<&String> = IndexSet::new();
    for row in entries.values() {
        fields.extend(row.keys());
    }
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![key_label.to_string()];
    header.extend(fields.iter().map(|f| f.to_string()));
    writer.write_record(&header)?;
    for (key, row) in entries {
        let mut record = vec![key.clone()];
        record.extend(
            fields
                .iter()
                .map(|f| row.get(*f).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write keyed entries as one JSON object keyed by the original key strings.
pub fn write_keyed_json(path: &Path, entries: &IndexMap<String, Row>) -> Result<(), OrmError> {
    let mut object = serde_json::Map::new();
    for (key, row) in entries {
        object.insert(key.clone(), row_to_json(row));
    }
    write_pretty(path, &serde_json::Value::Object(object))
}

fn write_pretty(path: &Path, value: &serde_json::Value) -> Result<(), OrmError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}
