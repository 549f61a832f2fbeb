//! The connection / statement / rows / transaction capability set that generic client code is
//! written against.
//!
//! Code that takes `impl Conn` (or a `Driver`) works unchanged whether the implementation runs
//! statements directly or, like [`crate::adapter`], routes each one through a
//! [`TaskQueue`](crate::TaskQueue).

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TaskQueueError;
use crate::types::RowValues;

/// Outcome of a statement executed for its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExecSummary {
    pub rows_affected: usize,
    /// Rowid of the most recent successful insert on the handle.
    pub last_insert_id: i64,
}

/// Result of advancing a cursor. Running out of rows is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// The destination slots now hold the next row.
    Row,
    /// The cursor is exhausted (or closed); the destination slots were not touched.
    EndOfRows,
}

/// Entry point: hands out connections.
#[async_trait]
pub trait Driver: Send + Sync {
    type Conn: Conn + 'static;

    async fn open(&self, name: &str) -> Result<Self::Conn, TaskQueueError>;

    async fn connect(&self) -> Result<Self::Conn, TaskQueueError> {
        self.open("").await
    }
}

#[async_trait]
pub trait Conn: Send + Sync {
    type Stmt: Stmt + 'static;
    type Tx: Tx + 'static;

    async fn prepare(&self, query: &str) -> Result<Self::Stmt, TaskQueueError>;

    async fn begin(&self) -> Result<Self::Tx, TaskQueueError>;

    async fn close(&self) -> Result<(), TaskQueueError>;

    /// Prepare, execute once, close.
    async fn exec(&self, query: &str, args: &[RowValues]) -> Result<ExecSummary, TaskQueueError> {
        let stmt = self.prepare(query).await?;
        let summary = stmt.exec(args).await;
        stmt.close().await?;
        summary
    }

    /// Prepare, query once, close the statement. The rows stay usable.
    async fn query(
        &self,
        query: &str,
        args: &[RowValues],
    ) -> Result<<Self::Stmt as Stmt>::Rows, TaskQueueError> {
        let stmt = self.prepare(query).await?;
        let rows = stmt.query(args).await;
        stmt.close().await?;
        rows
    }
}

#[async_trait]
pub trait Stmt: Send + Sync {
    type Rows: Rows + 'static;

    /// Number of placeholders, or `None` if the implementation does not know.
    fn num_input(&self) -> Option<usize>;

    async fn exec(&self, args: &[RowValues]) -> Result<ExecSummary, TaskQueueError>;

    async fn query(&self, args: &[RowValues]) -> Result<Self::Rows, TaskQueueError>;

    async fn close(&self) -> Result<(), TaskQueueError>;
}

/// A cursor over query results.
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    /// Copy the next row into `dest`, which must have exactly one slot per column.
    ///
    /// # Errors
    /// Returns `TaskQueueError::ColumnMismatch` when `dest.len()` differs from the column
    /// count; the cursor does not advance in that case.
    fn next(&mut self, dest: &mut [RowValues]) -> Result<Next, TaskQueueError>;

    fn close(&mut self) -> Result<(), TaskQueueError>;
}

#[async_trait]
pub trait Tx: Send + Sized {
    async fn commit(self) -> Result<(), TaskQueueError>;

    async fn rollback(self) -> Result<(), TaskQueueError>;
}
