use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::driver::{ExecSummary, Stmt};
use crate::error::TaskQueueError;
use crate::params::{Params, build_result_set, check_arity};
use crate::queue::TaskQueue;
use crate::types::RowValues;

use super::rows::QueuedRows;

/// Statement text bound to a queue.
///
/// Preparing does not touch the database; each `exec`/`query` is one queued task that uses
/// rusqlite's per-connection statement cache on the worker.
#[derive(Debug)]
pub struct QueuedStatement {
    queue: TaskQueue,
    query: Arc<String>,
    closed: AtomicBool,
}

impl QueuedStatement {
    pub(crate) fn new(queue: TaskQueue, query: &str) -> Self {
        Self {
            queue,
            query: Arc::new(query.to_owned()),
            closed: AtomicBool::new(false),
        }
    }

    /// The raw SQL of the statement.
    #[must_use]
    pub fn sql(&self) -> &str {
        self.query.as_str()
    }

    fn ensure_open(&self) -> Result<(), TaskQueueError> {
        if self.closed.load(Ordering::Acquire) {
            Err(TaskQueueError::ExecutionError(format!(
                "statement already closed: {}",
                self.query
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Stmt for QueuedStatement {
    type Rows = QueuedRows;

    fn num_input(&self) -> Option<usize> {
        None
    }

    async fn exec(&self, args: &[RowValues]) -> Result<ExecSummary, TaskQueueError> {
        self.ensure_open()?;
        let query = Arc::clone(&self.query);
        let params = Params::convert(args);
        self.queue
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(query.as_str())?;
                check_arity(&stmt, &params)?;
                let readonly = stmt.readonly();
                // Rows from pragmas or RETURNING clauses are stepped through and discarded.
                let mut rows = stmt.query(&params.as_refs()[..])?;
                while rows.next()?.is_some() {}
                drop(rows);
                let rows_affected = if readonly {
                    0
                } else {
                    usize::try_from(conn.changes()).unwrap_or(usize::MAX)
                };
                Ok(ExecSummary {
                    rows_affected,
                    last_insert_id: conn.last_insert_rowid(),
                })
            })
            .await
    }

    async fn query(&self, args: &[RowValues]) -> Result<QueuedRows, TaskQueueError> {
        self.ensure_open()?;
        let query = Arc::clone(&self.query);
        let params = Params::convert(args);
        let result_set = self
            .queue
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(query.as_str())?;
                build_result_set(&mut stmt, &params)
            })
            .await?;
        Ok(QueuedRows::new(result_set))
    }

    async fn close(&self) -> Result<(), TaskQueueError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
