//! Worker threads.

use crossbeam::channel::Receiver;
use tracing::{debug, trace};

use super::work::{Message, WorkResult, WorkTicket};
use crate::domain::ZoneId;
use crate::error::AssignmentError;

/// Turns an origin zone into one result per output channel.
///
/// A processor lives on a single worker thread and may keep private
/// state between zones, such as a path-search handle.
pub trait ZoneProcessor {
    fn process(&mut self, origin: ZoneId) -> Result<Vec<WorkResult>, AssignmentError>;
}

/// Creates one [`ZoneProcessor`] per worker thread.
///
/// The processor is created on the worker thread itself, so it need not
/// be `Send`.
pub trait ProcessorFactory: Sync {
    type Processor: ZoneProcessor;

    fn create(&self, worker: usize) -> Result<Self::Processor, AssignmentError>;
}

fn failed(worker: usize, source: AssignmentError) -> AssignmentError {
    AssignmentError::Worker {
        worker,
        source: Box::new(source),
    }
}

/// Processes tickets until the end marker arrives. Returns the number of
/// zones processed.
///
/// A processing failure ends the worker. Its ticket is dropped unresolved,
/// which the writer sees as an abandoned result.
pub(crate) fn run_worker<F: ProcessorFactory>(
    worker: usize,
    factory: &F,
    queue: Receiver<Message<WorkTicket>>,
) -> Result<usize, AssignmentError> {
    let mut processor = factory.create(worker).map_err(|e| failed(worker, e))?;
    let mut processed = 0;

    loop {
        match queue.recv() {
            Ok(Message::Item(ticket)) => {
                trace!(worker, origin = %ticket.origin, "processing zone");
                let results = processor
                    .process(ticket.origin)
                    .map_err(|e| failed(worker, e))?;
                ticket.resolve(results)?;
                processed += 1;
            }
            Ok(Message::End) => break,
            Err(_) => return Err(AssignmentError::QueueClosed("worker")),
        }
    }

    debug!(worker, processed, "worker finished");
    Ok(processed)
}
