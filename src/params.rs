//! Conversion between [`RowValues`] and rusqlite's owned values, and result-set extraction.

use rusqlite::types::Value;
use rusqlite::{Statement, ToSql};

use crate::error::TaskQueueError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Convert a single `RowValues` into the value rusqlite binds.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Owned statement arguments, safe to move onto the queue worker.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Self {
        Params(params.iter().map(row_value_to_sqlite_value).collect())
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }

    /// Borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn ToSql> {
        self.0.iter().map(|v| v as &dyn ToSql).collect()
    }
}

/// Extract a `RowValues` from a rusqlite row.
///
/// # Errors
/// Returns `TaskQueueError::SqliteError` if the column cannot be read.
pub fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<RowValues, TaskQueueError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Check that `params` supplies exactly one value per placeholder of `stmt`.
///
/// # Errors
/// Returns `TaskQueueError::ParameterError` on an arity mismatch.
pub fn check_arity(stmt: &Statement<'_>, params: &Params) -> Result<(), TaskQueueError> {
    let expected = stmt.parameter_count();
    let actual = params.0.len();
    if expected == actual {
        Ok(())
    } else {
        Err(TaskQueueError::ParameterError(format!(
            "statement expects {expected} arguments but got {actual}"
        )))
    }
}

/// Run `stmt` with `params` and copy every row into a [`ResultSet`].
///
/// # Errors
/// Returns `TaskQueueError::ParameterError` on an arity mismatch, or
/// `TaskQueueError::SqliteError` if binding, stepping or reading a column fails.
pub fn build_result_set(stmt: &mut Statement<'_>, params: &Params) -> Result<ResultSet, TaskQueueError> {
    check_arity(stmt, params)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_columns(column_names, 10);

    let param_refs = params.as_refs();
    let mut rows = stmt.query(&param_refs[..])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(extract_value(row, i)?);
        }
        result_set.add_row_values(values);
    }

    Ok(result_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn bools_and_json_bind_as_sqlite_storage_classes() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .expect("valid timestamp");
        let params = Params::convert(&[
            RowValues::Bool(true),
            RowValues::JSON(serde_json::json!({"a": 1})),
            RowValues::Timestamp(ts),
        ]);
        assert_eq!(params.as_values()[0], Value::Integer(1));
        assert_eq!(params.as_values()[1], Value::Text("{\"a\":1}".into()));
        assert_eq!(params.as_values()[2], Value::Text("2024-01-02 03:04:05".into()));
    }

    #[test]
    fn build_result_set_reads_all_storage_classes() -> Result<(), TaskQueueError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let mut stmt = conn.prepare("SELECT ?1 AS i, 2.5 AS f, 'x' AS t, NULL AS n, x'0102' AS b")?;
        let rs = build_result_set(&mut stmt, &Params::convert(&[RowValues::Int(7)]))?;
        assert_eq!(rs.column_names(), ["i", "f", "t", "n", "b"]);
        let row = &rs.results[0];
        assert_eq!(row.get("i"), Some(&RowValues::Int(7)));
        assert_eq!(row.get("f"), Some(&RowValues::Float(2.5)));
        assert_eq!(row.get("t"), Some(&RowValues::Text("x".into())));
        assert!(row.get("n").is_some_and(RowValues::is_null));
        assert_eq!(row.get("b").and_then(RowValues::as_blob), Some(&[1u8, 2][..]));
        Ok(())
    }

    #[test]
    fn wrong_argument_count_is_a_parameter_error() -> Result<(), TaskQueueError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let mut stmt = conn.prepare("SELECT ?1 + ?2")?;
        let err = build_result_set(&mut stmt, &Params::convert(&[RowValues::Int(1)])).unwrap_err();
        assert!(matches!(err, TaskQueueError::ParameterError(_)));
        assert_eq!(err.to_string(), "Parameter conversion error: statement expects 2 arguments but got 1");
        Ok(())
    }
}
