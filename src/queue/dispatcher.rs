use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

use tracing::{debug, error, info, warn};

use crate::error::TaskQueueError;

use super::channel::{BoxedResponse, BoxedTask, Job};
use super::ticket::Ticket;

/// Worker loop: the only code that ever touches `conn`.
///
/// Runs jobs in channel order until every sender is gone and the channel is empty. Once
/// `closing` is set, remaining jobs are answered with `QueueClosed` instead of being run.
pub(super) fn run_queue_worker(
    mut conn: rusqlite::Connection,
    receiver: &Receiver<Job>,
    closing: &AtomicBool,
    name: &str,
) {
    info!(worker = name, "task queue worker started");
    let mut executed: u64 = 0;
    let mut drained: u64 = 0;

    while let Ok(job) = receiver.recv() {
        let Job {
            ticket,
            task,
            respond_to,
        } = job;

        if closing.load(Ordering::Acquire) {
            drained += 1;
            let _ = respond_to.send(Err(TaskQueueError::QueueClosed));
            continue;
        }

        debug!(worker = name, %ticket, "running task");
        let outcome = run_task(&mut conn, ticket, task);
        executed += 1;
        if respond_to.send(outcome).is_err() {
            debug!(worker = name, %ticket, "result discarded, ticket was abandoned");
        }
    }

    match conn.close() {
        Ok(()) => info!(worker = name, executed, drained, "task queue worker stopped"),
        Err((_conn, err)) => error!(
            worker = name,
            executed,
            drained,
            error = %err,
            "task queue worker stopped but the database handle failed to close"
        ),
    }
}

fn run_task(conn: &mut rusqlite::Connection, ticket: Ticket, task: BoxedTask) -> BoxedResponse {
    match panic::catch_unwind(AssertUnwindSafe(|| task(conn))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%ticket, panic = %message, "queued task panicked");
            Err(TaskQueueError::TaskPanicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
