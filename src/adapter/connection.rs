use std::sync::Arc;

use async_trait::async_trait;

use crate::driver::Conn;
use crate::error::TaskQueueError;
use crate::queue::TaskQueue;

use super::statement::QueuedStatement;
use super::transaction::QueuedTx;

/// Lightweight connection bound to a queue. Holds no database resources of its own.
#[derive(Debug, Clone)]
pub struct QueuedConnection {
    queue: TaskQueue,
    connection_string: Arc<str>,
}

impl QueuedConnection {
    pub(crate) fn new(queue: TaskQueue, connection_string: Arc<str>) -> Self {
        Self {
            queue,
            connection_string,
        }
    }

    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

#[async_trait]
impl Conn for QueuedConnection {
    type Stmt = QueuedStatement;
    type Tx = QueuedTx;

    async fn prepare(&self, query: &str) -> Result<QueuedStatement, TaskQueueError> {
        Ok(QueuedStatement::new(self.queue.clone(), query))
    }

    async fn begin(&self) -> Result<QueuedTx, TaskQueueError> {
        Ok(QueuedTx::new())
    }

    async fn close(&self) -> Result<(), TaskQueueError> {
        Ok(())
    }
}
