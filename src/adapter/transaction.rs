use async_trait::async_trait;
use tracing::debug;

use crate::driver::Tx;
use crate::error::TaskQueueError;

/// Transaction handle whose boundaries are not enforced.
///
/// Statements issued between `begin` and `commit` are separate queued tasks and can interleave
/// with tasks from other callers; `commit` and `rollback` do nothing. For atomic multi-statement
/// work use [`TaskQueue::transaction`](crate::TaskQueue::transaction), which runs the whole
/// unit as one task.
#[derive(Debug, Default)]
pub struct QueuedTx {
    _private: (),
}

impl QueuedTx {
    pub(crate) fn new() -> Self {
        debug!("begin on a queued connection is a no-op");
        Self::default()
    }
}

#[async_trait]
impl Tx for QueuedTx {
    async fn commit(self) -> Result<(), TaskQueueError> {
        Ok(())
    }

    async fn rollback(self) -> Result<(), TaskQueueError> {
        debug!("rollback on a queued connection is a no-op; earlier statements stay applied");
        Ok(())
    }
}
