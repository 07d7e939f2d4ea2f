//! Work items and their result slots.
//!
//! A work item is split in two halves when it is created: the
//! [`WorkTicket`] travels to a worker through the worker queue and holds
//! the sending ends of the result slots, the [`PendingResult`] travels to
//! the writer through the writer queue and holds the receiving ends.

use std::collections::BTreeMap;

use tokio::sync::oneshot;

use crate::demand::UnroutableDemand;
use crate::domain::{Candidate, ZoneId};
use crate::error::AssignmentError;

/// Everything produced for one origin zone on one output channel.
#[derive(Debug, Clone)]
pub struct WorkResult {
    pub origin: ZoneId,
    /// Surviving candidates per destination zone.
    pub routes: BTreeMap<ZoneId, Vec<Candidate>>,
    pub unroutable: UnroutableDemand,
}

/// A queue entry: an item, or the end-of-work marker.
pub(crate) enum Message<T> {
    Item(T),
    End,
}

/// Worker side of a work item.
pub(crate) struct WorkTicket {
    pub origin: ZoneId,
    slots: Vec<oneshot::Sender<WorkResult>>,
}

/// Writer side of a work item.
pub(crate) struct PendingResult {
    pub origin: ZoneId,
    slots: Vec<oneshot::Receiver<WorkResult>>,
}

/// Creates a work item for `origin` with one result slot per channel.
pub(crate) fn work_item(origin: ZoneId, channels: usize) -> (WorkTicket, PendingResult) {
    let (senders, receivers): (Vec<_>, Vec<_>) =
        (0..channels).map(|_| oneshot::channel()).unzip();
    (
        WorkTicket {
            origin,
            slots: senders,
        },
        PendingResult {
            origin,
            slots: receivers,
        },
    )
}

impl WorkTicket {
    /// Publishes one result per channel.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the number of results doesn't match the number of
    /// channels, or if the writer has gone away.
    pub fn resolve(self, results: Vec<WorkResult>) -> Result<(), AssignmentError> {
        if results.len() != self.slots.len() {
            return Err(AssignmentError::Configuration(format!(
                "{} results for {} output channels of zone {}",
                results.len(),
                self.slots.len(),
                self.origin
            )));
        }
        for (slot, result) in self.slots.into_iter().zip(results) {
            slot.send(result)
                .map_err(|_| AssignmentError::QueueClosed("writer"))?;
        }
        Ok(())
    }
}

impl PendingResult {
    /// Blocks until every slot is resolved.
    ///
    /// Must not be called from within an async runtime.
    pub fn wait(self) -> Result<Vec<WorkResult>, AssignmentError> {
        let origin = self.origin;
        self.slots
            .into_iter()
            .map(|slot| {
                slot.blocking_recv()
                    .map_err(|_| AssignmentError::ResultAbandoned { origin })
            })
            .collect()
    }
}
