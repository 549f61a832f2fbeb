use thiserror::Error;

use crate::queue::Ticket;

#[derive(Debug, Error)]
pub enum TaskQueueError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// The queue was closed before the task could run, or a submission arrived after close.
    #[error("Task queue closed")]
    QueueClosed,

    #[error("Unknown ticket: {0} was never issued by this queue or was already read")]
    UnknownTicket(Ticket),

    #[error("Timed out waiting for {0}")]
    Timeout(Ticket),

    #[error("Result for {ticket} is not a `{expected}`")]
    ResultType {
        ticket: Ticket,
        expected: &'static str,
    },

    #[error("Task panicked on the queue worker: {0}")]
    TaskPanicked(String),

    #[error("expected {expected} columns but got {actual}")]
    ColumnMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl TaskQueueError {
    /// True for the systemic failure every pending ticket receives when the queue shuts down.
    #[must_use]
    pub fn is_queue_closed(&self) -> bool {
        matches!(self, TaskQueueError::QueueClosed)
    }
}
