//! Queue-backed implementation of the [`crate::driver`] capability set.
//!
//! Every `exec` and `query` becomes exactly one task on the [`TaskQueue`] and the caller waits
//! for its ticket. Opening connections, preparing statements and transaction boundaries do not
//! submit anything.
//!
//! Known limitations:
//! - `begin`/`commit`/`rollback` are no-ops. Statements from one logical transaction may
//!   interleave with other callers' tasks. Use [`TaskQueue::transaction`] when atomicity
//!   matters.
//! - A query's rows are read on the worker when the query runs and iterated afterwards outside
//!   the queue, so iteration is never ordered against later writers.

mod connection;
mod driver;
mod rows;
mod statement;
mod transaction;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conn_string::ConnectionString;
use crate::driver::{Conn, Driver, ExecSummary};
use crate::error::TaskQueueError;
use crate::queue::TaskQueue;
use crate::types::RowValues;

pub use connection::QueuedConnection;
pub use driver::QueuedDriver;
pub use rows::QueuedRows;
pub use statement::QueuedStatement;
pub use transaction::QueuedTx;

/// Options applied by [`open_db`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Run `PRAGMA foreign_keys = ON` through the queue before handing out the database.
    pub foreign_keys: bool,
    /// Raw `key[=value]` options merged into the connection string; keys already present win.
    pub extra_pragmas: Vec<String>,
}

impl AdapterOptions {
    #[must_use]
    pub fn with_foreign_keys(mut self) -> Self {
        self.foreign_keys = true;
        self
    }

    #[must_use]
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.extra_pragmas.push(option.into());
        self
    }
}

/// Database facade over a queue: the adapter's counterpart of a pooled client handle.
#[derive(Debug, Clone)]
pub struct QueuedDb {
    driver: QueuedDriver,
}

/// Build a [`QueuedDb`] over `queue`.
///
/// # Errors
/// Returns the failure of the foreign-key pragma when `options.foreign_keys` is set, or
/// `TaskQueueError::QueueClosed` if the queue is already closed.
pub async fn open_db(queue: &TaskQueue, options: AdapterOptions) -> Result<QueuedDb, TaskQueueError> {
    let mut connection_string = ConnectionString::parse(queue.connection_string());
    connection_string.merge(&options.extra_pragmas);
    let connection_string = connection_string.to_string();
    debug!(%connection_string, "opening queued database adapter");

    let db = QueuedDb {
        driver: QueuedDriver::new(queue.clone(), connection_string),
    };
    if options.foreign_keys {
        db.exec("PRAGMA foreign_keys = ON;", &[]).await?;
    }
    Ok(db)
}

impl QueuedDb {
    #[must_use]
    pub fn driver(&self) -> &QueuedDriver {
        &self.driver
    }

    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        self.driver.queue()
    }

    /// The queue's connection string with the adapter's extra options merged in.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        self.driver.connection_string()
    }

    /// Get a connection.
    ///
    /// # Errors
    /// Returns `TaskQueueError::QueueClosed` if the queue is closed.
    pub async fn conn(&self) -> Result<QueuedConnection, TaskQueueError> {
        self.driver.connect().await
    }

    /// # Errors
    /// Returns `TaskQueueError::QueueClosed` if the queue is closed.
    pub async fn prepare(&self, query: &str) -> Result<QueuedStatement, TaskQueueError> {
        self.conn().await?.prepare(query).await
    }

    /// Execute one statement as one queued task.
    ///
    /// # Errors
    /// Returns the statement's failure or a queue-level error.
    pub async fn exec(&self, query: &str, args: &[RowValues]) -> Result<ExecSummary, TaskQueueError> {
        self.conn().await?.exec(query, args).await
    }

    /// Run one query as one queued task and return its cursor.
    ///
    /// # Errors
    /// Returns the statement's failure or a queue-level error.
    pub async fn query(&self, query: &str, args: &[RowValues]) -> Result<QueuedRows, TaskQueueError> {
        self.conn().await?.query(query, args).await
    }

    /// Begin a transaction. See the module docs: boundaries are not enforced.
    ///
    /// # Errors
    /// Returns `TaskQueueError::QueueClosed` if the queue is closed.
    pub async fn begin(&self) -> Result<QueuedTx, TaskQueueError> {
        self.conn().await?.begin().await
    }
}
