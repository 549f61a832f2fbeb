use std::sync::Arc;

use async_trait::async_trait;

use crate::driver::Driver;
use crate::error::TaskQueueError;
use crate::queue::TaskQueue;

use super::connection::QueuedConnection;

/// Hands out [`QueuedConnection`]s that all share one queue.
#[derive(Debug, Clone)]
pub struct QueuedDriver {
    queue: TaskQueue,
    connection_string: Arc<str>,
}

impl QueuedDriver {
    #[must_use]
    pub fn new(queue: TaskQueue, connection_string: impl Into<Arc<str>>) -> Self {
        Self {
            queue,
            connection_string: connection_string.into(),
        }
    }

    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

#[async_trait]
impl Driver for QueuedDriver {
    type Conn = QueuedConnection;

    /// `name` is ignored: the queue already owns the only real handle.
    async fn open(&self, _name: &str) -> Result<QueuedConnection, TaskQueueError> {
        if self.queue.is_closed() {
            return Err(TaskQueueError::QueueClosed);
        }
        Ok(QueuedConnection::new(
            self.queue.clone(),
            Arc::clone(&self.connection_string),
        ))
    }
}
