use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use super::channel::BoxedResponse;
use super::lock_unpoisoned;
use super::ticket::Ticket;

pub(super) type ResultSlot = oneshot::Receiver<BoxedResponse>;

/// Result slots for tickets that have been issued but not yet read.
///
/// A slot lives until it is taken; closing the queue does not clear it.
#[derive(Default)]
pub(super) struct PendingResults {
    slots: Mutex<HashMap<Ticket, ResultSlot>>,
}

impl PendingResults {
    pub(super) fn insert(&self, ticket: Ticket, slot: ResultSlot) {
        lock_unpoisoned(&self.slots).insert(ticket, slot);
    }

    /// Claim the slot for `ticket`. Each slot can be claimed once.
    pub(super) fn take(&self, ticket: Ticket) -> Option<ResultSlot> {
        lock_unpoisoned(&self.slots).remove(&ticket)
    }

    /// Put back a slot whose wait was abandoned before it resolved.
    pub(super) fn restore(&self, ticket: Ticket, slot: ResultSlot) {
        lock_unpoisoned(&self.slots).insert(ticket, slot);
    }

    pub(super) fn len(&self) -> usize {
        lock_unpoisoned(&self.slots).len()
    }
}
