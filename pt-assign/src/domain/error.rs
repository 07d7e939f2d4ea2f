//! Domain error types.
//!
//! These errors represent validation failures when building journeys
//! and zone networks. They are distinct from pipeline errors.

use super::{StopId, ZoneId};

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Journey has no segments
    #[error("journey must have at least one segment")]
    EmptyJourney,

    /// Journey consists only of transfers
    #[error("journey must contain at least one ride")]
    NoRide,

    /// Consecutive segments don't share a stop
    #[error("segments do not connect: {0} then {1}")]
    SegmentsNotConnected(StopId, StopId),

    /// A segment ends before it starts
    #[error("segment from {0} arrives before it departs")]
    NegativeDuration(StopId),

    /// A segment starts before the previous one ended
    #[error("segment from {0} departs before the previous segment arrives")]
    OverlappingSegments(StopId),

    /// A connected stop refers to a zone that was never declared
    #[error("connected stop {stop} refers to unknown zone {zone}")]
    UnknownZone { zone: ZoneId, stop: StopId },

    /// Walk times must not be negative
    #[error("connected stop {stop} of zone {zone} has a negative walk time")]
    NegativeWalk { zone: ZoneId, stop: StopId },

    /// Walk times are bounded by two service days
    #[error("connected stop {stop} of zone {zone} has an implausibly long walk time")]
    WalkTooLong { zone: ZoneId, stop: StopId },
}
