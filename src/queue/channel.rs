use std::any::Any;

use tokio::sync::oneshot;

use crate::error::TaskQueueError;

use super::ticket::Ticket;

pub(super) type BoxedResponse = Result<Box<dyn Any + Send>, TaskQueueError>;
pub(super) type BoxedTask = Box<dyn FnOnce(&mut rusqlite::Connection) -> BoxedResponse + Send>;

/// A task in flight between a submitter and the worker.
pub(super) struct Job {
    pub(super) ticket: Ticket,
    pub(super) task: BoxedTask,
    pub(super) respond_to: oneshot::Sender<BoxedResponse>,
}
