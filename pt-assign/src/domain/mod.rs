//! Domain types for the demand assignment.
//!
//! Journeys and zone access points are validated at construction time,
//! so code receiving them can rely on their invariants.

mod candidate;
mod error;
mod ids;
mod journey;
mod time;
mod zone;

pub use candidate::{Assigned, Candidate};
pub use error::DomainError;
pub use ids::{LineId, RouteId, StopId, TripId, ZoneId};
pub use journey::{Ride, Segment, StopToStopJourney, Transfer};
pub use time::{MAX_INPUT_SECONDS, ServiceTime, TimeError, minutes_of};
pub use zone::{ConnectedStop, Zone, ZoneNetwork};
