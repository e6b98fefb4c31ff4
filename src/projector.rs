//! Shapes query results into JSON payloads.

use serde_json::{Map, Value};

use crate::model::GtfsRecord;

/// Converts one record into a JSON object holding the columns it was loaded
/// with.
///
/// Declared columns the source file lacked are left out. A column that was
/// present but empty comes back as `""`. Extra columns are merged in as their
/// raw text.
pub fn project_one<T: GtfsRecord>(row: &T) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(fields) = &mut value {
        shape_fields(fields, row);
    }
    Ok(value)
}

fn shape_fields<T: GtfsRecord>(fields: &mut Map<String, Value>, row: &T) {
    let columns = row.columns();
    for name in columns.absent.iter() {
        fields.remove(*name);
    }
    for field in fields.values_mut() {
        if field.is_null() {
            *field = Value::String(String::new());
        }
    }
    for (column, raw) in &columns.extra {
        fields
            .entry(column.clone())
            .or_insert_with(|| Value::String(raw.clone()));
    }
}

/// Converts a result set into an array of objects. Empty input gives `[]`.
pub fn project<'a, T, I>(rows: I) -> Result<Vec<Value>, serde_json::Error>
where
    T: GtfsRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    rows.into_iter().map(project_one).collect()
}
