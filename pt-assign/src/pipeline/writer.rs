//! The single writer thread.

use crossbeam::channel::Receiver;
use tracing::{debug, trace};

use super::listener::SinkSet;
use super::work::{Message, PendingResult, WorkResult};
use crate::error::AssignmentError;

/// What the writer delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Delivered {
    pub zones: usize,
    pub routes: usize,
    pub unroutable: f64,
}

fn deliver(
    result: &WorkResult,
    sinks: &mut SinkSet<'_>,
    delivered: &mut Delivered,
) -> Result<(), AssignmentError> {
    let origin = result.origin;
    for part in result.unroutable.parts() {
        for sink in sinks.iter_mut() {
            sink.on_unroutable(part)?;
        }
        delivered.unroutable += part.amount;
    }

    for (&destination, candidates) in &result.routes {
        for candidate in candidates {
            for sink in sinks.iter_mut() {
                sink.on_route(origin, destination, candidate)?;
            }
        }
        for sink in sinks.iter_mut() {
            sink.on_od_pair_done(origin, destination)?;
        }
        delivered.routes += candidates.len();
    }
    Ok(())
}

/// Delivers results in submission order until the end marker arrives,
/// then finishes every sink.
pub(crate) fn run_writer(
    queue: Receiver<Message<PendingResult>>,
    sinks: &mut [SinkSet<'_>],
) -> Result<Delivered, AssignmentError> {
    let mut delivered = Delivered::default();

    loop {
        match queue.recv() {
            Ok(Message::Item(pending)) => {
                let origin = pending.origin;
                let results = pending.wait()?;
                for (result, channel) in results.iter().zip(sinks.iter_mut()) {
                    deliver(result, channel, &mut delivered)?;
                }
                delivered.zones += 1;
                trace!(origin = %origin, "zone delivered");
            }
            Ok(Message::End) => break,
            Err(_) => return Err(AssignmentError::QueueClosed("writer")),
        }
    }

    for sink in sinks.iter_mut().flat_map(|channel| channel.iter_mut()) {
        sink.on_finish()?;
    }
    debug!(zones = delivered.zones, routes = delivered.routes, "writer finished");
    Ok(delivered)
}
