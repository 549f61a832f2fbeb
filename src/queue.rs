//! Ticketed single-writer task queue.
//!
//! A [`TaskQueue`] owns exactly one `rusqlite::Connection` on a dedicated worker thread. Tasks
//! are closures over that connection; they run one at a time in the order their tickets were
//! issued, across all submitters. Results come back through a one-shot slot per ticket.
//!
//! A task must never submit to the same queue and then wait for the result from inside the
//! worker: the worker would be waiting on itself.

mod channel;
mod dispatcher;
mod manager;
mod pending;
mod ticket;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::{QueueOptions, QueueOptionsBuilder, open_handle};
use crate::error::TaskQueueError;

use channel::{BoxedResponse, BoxedTask};
use manager::QueueWorker;
use pending::ResultSlot;

pub use ticket::Ticket;

/// Handle to a task queue. Clones share the same queue and worker.
#[derive(Clone)]
pub struct TaskQueue {
    worker: Arc<QueueWorker>,
}

impl TaskQueue {
    /// Open the database described by `options` and start the worker.
    ///
    /// # Errors
    /// Returns `TaskQueueError::ConfigError` for malformed pragmas,
    /// `TaskQueueError::ConnectionError` if the database cannot be opened or the worker thread
    /// cannot be spawned, and `TaskQueueError::SqliteError` if a pragma is rejected.
    pub fn open(options: QueueOptions) -> Result<Self, TaskQueueError> {
        options.validate()?;
        let uri = options.connection_string().to_string();
        let conn = open_handle(&options, &uri)?;
        let worker = QueueWorker::spawn(conn, uri)?;
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Open a queue over a private in-memory database.
    ///
    /// # Errors
    /// See [`TaskQueue::open`].
    pub fn open_in_memory() -> Result<Self, TaskQueueError> {
        Self::open(QueueOptions::memory())
    }

    #[must_use]
    pub fn builder() -> QueueOptionsBuilder {
        QueueOptionsBuilder::new()
    }

    /// Connection string the handle was opened with.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        self.worker.connection_string()
    }

    /// Enqueue `task` and return its ticket without waiting for it to run.
    ///
    /// The ticket's result is held until it is read or the ticket is passed to
    /// [`TaskQueue::forget`], including after the queue closes. Callers that never read a ticket
    /// should forget it, otherwise its result stays counted in
    /// [`TaskQueue::pending_tickets`] for the life of the queue.
    ///
    /// # Errors
    /// Returns `TaskQueueError::QueueClosed` once the queue has been closed.
    pub fn submit<F, R>(&self, task: F) -> Result<Ticket, TaskQueueError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, TaskQueueError> + Send + 'static,
        R: Send + 'static,
    {
        let boxed: BoxedTask =
            Box::new(move |conn| task(conn).map(|value| Box::new(value) as Box<dyn Any + Send>));
        self.worker.submit(boxed)
    }

    /// Wait for the result of `ticket`. Reading a ticket consumes it.
    ///
    /// Dropping the returned future abandons the ticket; the task still runs and its result is
    /// discarded.
    ///
    /// # Errors
    /// Returns the task's own error, `TaskQueueError::QueueClosed` if the queue closed before
    /// the task ran, `TaskQueueError::UnknownTicket` for a ticket that was never issued or was
    /// already read, and `TaskQueueError::ResultType` if the task produced something other
    /// than `R`.
    pub async fn await_result<R: Send + 'static>(&self, ticket: Ticket) -> Result<R, TaskQueueError> {
        let slot = self.worker.take_slot(ticket)?;
        unbox(ticket, slot.await.unwrap_or(Err(TaskQueueError::QueueClosed)))
    }

    /// Blocking form of [`TaskQueue::await_result`] for callers outside an async runtime.
    ///
    /// # Panics
    /// Panics if called from within an asynchronous execution context.
    ///
    /// # Errors
    /// Same as [`TaskQueue::await_result`].
    pub fn await_result_blocking<R: Send + 'static>(&self, ticket: Ticket) -> Result<R, TaskQueueError> {
        let slot = self.worker.take_slot(ticket)?;
        unbox(ticket, slot.blocking_recv().unwrap_or(Err(TaskQueueError::QueueClosed)))
    }

    /// Wait at most `timeout` for `ticket`.
    ///
    /// On expiry the ticket stays readable and the task stays queued.
    ///
    /// # Errors
    /// Returns `TaskQueueError::Timeout` on expiry, otherwise the same as
    /// [`TaskQueue::await_result`].
    pub async fn await_result_timeout<R: Send + 'static>(
        &self,
        ticket: Ticket,
        timeout: Duration,
    ) -> Result<R, TaskQueueError> {
        let mut slot: ResultSlot = self.worker.take_slot(ticket)?;
        match tokio::time::timeout(timeout, &mut slot).await {
            Ok(received) => unbox(ticket, received.unwrap_or(Err(TaskQueueError::QueueClosed))),
            Err(_) => {
                self.worker.restore_slot(ticket, slot);
                Err(TaskQueueError::Timeout(ticket))
            }
        }
    }

    /// Abandon `ticket`; its result is dropped when the task finishes. Returns `false` if the
    /// ticket was unknown or already read.
    pub fn forget(&self, ticket: Ticket) -> bool {
        self.worker.take_slot(ticket).is_ok()
    }

    /// Submit `task` and wait for its result.
    ///
    /// # Errors
    /// Any error from [`TaskQueue::submit`] or [`TaskQueue::await_result`].
    pub async fn call<F, R>(&self, task: F) -> Result<R, TaskQueueError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, TaskQueueError> + Send + 'static,
        R: Send + 'static,
    {
        let ticket = self.submit(task)?;
        self.await_result(ticket).await
    }

    /// Blocking form of [`TaskQueue::call`].
    ///
    /// # Panics
    /// Panics if called from within an asynchronous execution context.
    ///
    /// # Errors
    /// Any error from [`TaskQueue::submit`] or [`TaskQueue::await_result_blocking`].
    pub fn call_blocking<F, R>(&self, task: F) -> Result<R, TaskQueueError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, TaskQueueError> + Send + 'static,
        R: Send + 'static,
    {
        let ticket = self.submit(task)?;
        self.await_result_blocking(ticket)
    }

    /// Run a batch of semicolon-separated statements as a single task.
    ///
    /// # Errors
    /// Returns `TaskQueueError::SqliteError` if any statement fails, or a queue-level error.
    pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<(), TaskQueueError> {
        let sql = sql.into();
        self.call(move |conn| Ok(conn.execute_batch(&sql)?)).await
    }

    /// Run `task` inside a real SQLite transaction, as one task.
    ///
    /// Commits when `task` returns `Ok`, rolls back otherwise. No other task can interleave.
    ///
    /// # Errors
    /// Returns the task's error (after rollback), a begin/commit failure, or a queue-level
    /// error.
    pub async fn transaction<F, R>(&self, task: F) -> Result<R, TaskQueueError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<R, TaskQueueError> + Send + 'static,
        R: Send + 'static,
    {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let value = task(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
    }

    /// Stop the queue: refuse new work, fail everything still queued with
    /// `TaskQueueError::QueueClosed`, close the handle and wait for the worker to exit.
    ///
    /// Idempotent. A task that is already running finishes normally.
    ///
    /// # Errors
    /// Returns an error if called from inside a queued task (shutdown still begins) or if the
    /// worker thread panicked.
    pub async fn close(&self) -> Result<(), TaskQueueError> {
        let worker = Arc::clone(&self.worker);
        tokio::task::spawn_blocking(move || worker.close_blocking())
            .await
            .map_err(|e| TaskQueueError::Other(format!("task queue close join error: {e}")))?
    }

    /// Blocking form of [`TaskQueue::close`].
    ///
    /// # Errors
    /// Same as [`TaskQueue::close`].
    pub fn close_blocking(&self) -> Result<(), TaskQueueError> {
        self.worker.close_blocking()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.worker.is_closed()
    }

    /// Number of issued tickets whose results have not been read or forgotten.
    #[must_use]
    pub fn pending_tickets(&self) -> usize {
        self.worker.pending_len()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("connection_string", &self.connection_string())
            .field("closed", &self.is_closed())
            .field("pending_tickets", &self.pending_tickets())
            .finish()
    }
}

fn unbox<R: 'static>(ticket: Ticket, response: BoxedResponse) -> Result<R, TaskQueueError> {
    response?
        .downcast::<R>()
        .map(|boxed| *boxed)
        .map_err(|_| TaskQueueError::ResultType {
            ticket,
            expected: std::any::type_name::<R>(),
        })
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
