use crate::driver::{Next, Rows};
use crate::error::TaskQueueError;
use crate::results::{QueryRow, ResultSet};
use crate::types::RowValues;

/// Cursor returned by a queued query.
///
/// The rows were read on the worker when the query task ran; advancing the cursor does not go
/// through the queue, so writes queued after the query are not visible here.
#[derive(Debug, Clone)]
pub struct QueuedRows {
    rows: std::vec::IntoIter<QueryRow>,
    columns: Vec<String>,
    closed: bool,
}

impl QueuedRows {
    pub(crate) fn new(result_set: ResultSet) -> Self {
        let columns = result_set.column_names().to_vec();
        Self {
            rows: result_set.into_iter(),
            columns,
            closed: false,
        }
    }

    /// Take the next whole row, or `None` when exhausted or closed.
    pub fn next_row(&mut self) -> Option<QueryRow> {
        if self.closed {
            None
        } else {
            self.rows.next()
        }
    }

    /// Rows not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        if self.closed { 0 } else { self.rows.len() }
    }
}

/// Consumes the remaining rows. `Iterator` itself is not implemented so that
/// [`Rows::next`] stays unambiguous.
impl IntoIterator for QueuedRows {
    type Item = QueryRow;
    type IntoIter = std::vec::IntoIter<QueryRow>;

    fn into_iter(self) -> Self::IntoIter {
        if self.closed {
            Vec::new().into_iter()
        } else {
            self.rows
        }
    }
}

impl Rows for QueuedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self, dest: &mut [RowValues]) -> Result<Next, TaskQueueError> {
        if self.remaining() == 0 {
            return Ok(Next::EndOfRows);
        }
        if dest.len() != self.columns.len() {
            return Err(TaskQueueError::ColumnMismatch {
                expected: dest.len(),
                actual: self.columns.len(),
            });
        }
        let Some(row) = self.rows.next() else {
            return Ok(Next::EndOfRows);
        };
        for (slot, value) in dest.iter_mut().zip(row.into_values()) {
            *slot = value;
        }
        Ok(Next::Row)
    }

    fn close(&mut self) -> Result<(), TaskQueueError> {
        self.closed = true;
        Ok(())
    }
}
