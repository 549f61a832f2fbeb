use std::collections::HashMap;
use std::sync::Arc;

use super::row::QueryRow;
use crate::types::RowValues;

/// Rows read by a query task, copied off the worker so they can be iterated anywhere.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<QueryRow>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    ///
    /// When a name repeats (e.g. `SELECT a.id, b.id`), by-name lookup resolves to the first
    /// occurrence.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> Self {
        let mut index = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self {
            results: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
            column_index: Arc::new(index),
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append a row; `values` must be in column order.
    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.results.push(QueryRow {
            column_names: Arc::clone(&self.column_names),
            column_index: Arc::clone(&self.column_index),
            values,
        });
    }
}

impl IntoIterator for ResultSet {
    type Item = QueryRow;
    type IntoIter = std::vec::IntoIter<QueryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_column_names_resolve_to_first() {
        let mut rs = ResultSet::with_columns(vec!["id".into(), "id".into()], 1);
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Int(2)]);
        assert_eq!(rs.results[0].get("id"), Some(&RowValues::Int(1)));
        assert_eq!(rs.results[0].get_by_index(1), Some(&RowValues::Int(2)));
        assert_eq!(rs.results[0].get("missing"), None);
    }
}
