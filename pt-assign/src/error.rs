//! Run-level error type.
//!
//! Every failure aborts the run. Demand that cannot be routed is not an
//! error; it is tracked in [`crate::demand::UnroutableDemand`].

use crate::domain::{DomainError, StopId, ZoneId};

/// Errors that abort an assignment run.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    /// A zone id was not found in the zone network
    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),

    /// An itinerary violates its construction invariants
    #[error("inconsistent itinerary from {origin} to {destination}: {reason}")]
    InconsistentItinerary {
        origin: StopId,
        destination: StopId,
        reason: String,
    },

    /// A journey could not be built from search output
    #[error("malformed journey: {0}")]
    MalformedJourney(#[from] DomainError),

    /// Invalid configuration or input data
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The path search failed
    #[error("path search from {stop} failed: {message}")]
    Search { stop: StopId, message: String },

    /// Choice utilities could not be normalised
    #[error("non-finite utilities for {origin} -> {destination} in slice {slice}")]
    NonFiniteUtility {
        origin: ZoneId,
        destination: ZoneId,
        slice: String,
    },

    /// A worker went away without resolving a result slot
    #[error("result for zone {origin} was abandoned by its worker")]
    ResultAbandoned { origin: ZoneId },

    /// A pipeline queue was disconnected
    #[error("{0} queue closed unexpectedly")]
    QueueClosed(&'static str),

    /// Processing failed inside a worker thread
    #[error("worker {worker} failed: {source}")]
    Worker {
        worker: usize,
        #[source]
        source: Box<AssignmentError>,
    },

    /// A pipeline thread panicked
    #[error("thread {0} panicked")]
    WorkerPanicked(String),

    /// A pipeline thread could not be started
    #[error("failed to start thread: {0}")]
    Thread(String),

    /// A result sink failed
    #[error("sink error: {0}")]
    Sink(String),
}

impl AssignmentError {
    /// Process exit code for this error.
    ///
    /// Lookup and configuration problems exit with 2, consistency
    /// violations with 3, pipeline failures with 4 and sink failures with 5.
    pub fn exit_code(&self) -> u8 {
        match self {
            AssignmentError::UnknownZone(_) | AssignmentError::Configuration(_) => 2,
            AssignmentError::InconsistentItinerary { .. }
            | AssignmentError::MalformedJourney(_)
            | AssignmentError::Search { .. }
            | AssignmentError::NonFiniteUtility { .. } => 3,
            AssignmentError::ResultAbandoned { .. }
            | AssignmentError::QueueClosed(_)
            | AssignmentError::WorkerPanicked(_)
            | AssignmentError::Thread(_) => 4,
            AssignmentError::Worker { source, .. } => source.exit_code(),
            AssignmentError::Sink(_) => 5,
        }
    }

    /// Returns the innermost error, looking through worker wrappers.
    pub fn root_cause(&self) -> &AssignmentError {
        match self {
            AssignmentError::Worker { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AssignmentError::UnknownZone(ZoneId(4));
        assert_eq!(err.to_string(), "unknown zone Z4");

        let err = AssignmentError::QueueClosed("writer");
        assert_eq!(err.to_string(), "writer queue closed unexpectedly");

        let err = AssignmentError::Worker {
            worker: 2,
            source: Box::new(AssignmentError::UnknownZone(ZoneId(1))),
        };
        assert_eq!(err.to_string(), "worker 2 failed: unknown zone Z1");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(AssignmentError::UnknownZone(ZoneId(1)).exit_code(), 2);
        assert_eq!(
            AssignmentError::Configuration("bad".into()).exit_code(),
            2
        );
        assert_eq!(
            AssignmentError::MalformedJourney(DomainError::EmptyJourney).exit_code(),
            3
        );
        assert_eq!(AssignmentError::QueueClosed("worker").exit_code(), 4);
        assert_eq!(AssignmentError::Sink("disk full".into()).exit_code(), 5);
    }

    #[test]
    fn worker_wrapper_keeps_cause() {
        let err = AssignmentError::Worker {
            worker: 0,
            source: Box::new(AssignmentError::UnknownZone(ZoneId(8))),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(matches!(
            err.root_cause(),
            AssignmentError::UnknownZone(ZoneId(8))
        ));
    }
}
