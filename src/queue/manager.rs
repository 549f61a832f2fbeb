use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::TaskQueueError;

use super::channel::{BoxedTask, Job};
use super::dispatcher::run_queue_worker;
use super::lock_unpoisoned;
use super::pending::{PendingResults, ResultSlot};
use super::ticket::Ticket;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Ticket issuance and the sending half of the job channel, guarded together so that ticket
/// order and channel order always agree.
struct Intake {
    next_ticket: u64,
    sender: Option<Sender<Job>>,
}

pub(super) struct QueueWorker {
    intake: Mutex<Intake>,
    pending: PendingResults,
    closing: Arc<AtomicBool>,
    join: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    connection_string: String,
}

impl QueueWorker {
    pub(super) fn spawn(
        conn: rusqlite::Connection,
        connection_string: String,
    ) -> Result<Self, TaskQueueError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let closing = Arc::new(AtomicBool::new(false));
        let queue_id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
        let name = format!("sqlite-queue-{queue_id}");
        let handle = Handle::try_current().ok();

        let worker_closing = Arc::clone(&closing);
        let thread_name = name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let runtime_guard = handle.as_ref().map(Handle::enter);
                run_queue_worker(conn, &receiver, &worker_closing, &thread_name);
                drop(runtime_guard);
            })
            .map_err(|err| {
                TaskQueueError::ConnectionError(format!(
                    "failed to spawn task queue worker thread: {err}"
                ))
            })?;

        Ok(Self {
            intake: Mutex::new(Intake {
                next_ticket: 1,
                sender: Some(sender),
            }),
            pending: PendingResults::default(),
            closing,
            thread_id: join.thread().id(),
            join: Mutex::new(Some(join)),
            connection_string,
        })
    }

    pub(super) fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub(super) fn submit(&self, task: BoxedTask) -> Result<Ticket, TaskQueueError> {
        let mut intake = lock_unpoisoned(&self.intake);
        let Some(sender) = intake.sender.as_ref() else {
            return Err(TaskQueueError::QueueClosed);
        };

        let ticket = Ticket::new(intake.next_ticket);
        let (respond_to, slot) = oneshot::channel();
        if sender
            .send(Job {
                ticket,
                task,
                respond_to,
            })
            .is_err()
        {
            // The worker is gone without a close; stop accepting work.
            intake.sender = None;
            return Err(TaskQueueError::QueueClosed);
        }
        intake.next_ticket += 1;
        self.pending.insert(ticket, slot);
        Ok(ticket)
    }

    pub(super) fn take_slot(&self, ticket: Ticket) -> Result<ResultSlot, TaskQueueError> {
        self.pending
            .take(ticket)
            .ok_or(TaskQueueError::UnknownTicket(ticket))
    }

    pub(super) fn restore_slot(&self, ticket: Ticket, slot: ResultSlot) {
        self.pending.restore(ticket, slot);
    }

    pub(super) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Refuse new submissions and make the worker fail whatever is still queued.
    fn begin_shutdown(&self) {
        self.closing.store(true, Ordering::Release);
        let sender = lock_unpoisoned(&self.intake).sender.take();
        drop(sender);
    }

    pub(super) fn close_blocking(&self) -> Result<(), TaskQueueError> {
        self.begin_shutdown();
        if thread::current().id() == self.thread_id {
            return Err(TaskQueueError::ExecutionError(
                "close called from inside a queued task; shutdown started but the worker cannot wait for itself".into(),
            ));
        }

        // Holding the lock while joining makes concurrent closers wait for termination too.
        let mut join = lock_unpoisoned(&self.join);
        if let Some(handle) = join.take() {
            handle.join().map_err(|_| {
                TaskQueueError::Other("task queue worker thread panicked".into())
            })?;
        }
        Ok(())
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        self.begin_shutdown();
    }
}
