//! Stop-to-stop journey types.
//!
//! A `StopToStopJourney` is one itinerary produced by the path search:
//! a sequence of vehicle rides joined by transfers (walks or same-stop
//! changes), possibly starting or ending with a walk.

use std::hash::{Hash, Hasher};

use chrono::Duration;

use super::{DomainError, LineId, RouteId, ServiceTime, StopId, TripId};

/// A ride on one vehicle between two of its stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Ride {
    pub trip: TripId,
    pub line: LineId,
    pub route: RouteId,
    pub from: StopId,
    pub to: StopId,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    /// Vehicle distance covered, in metres.
    pub distance: f64,
    /// Intermediate stops added when consecutive vehicles were merged
    /// into one through-service ride.
    pub additional_stops: u32,
}

impl Ride {
    /// Returns the in-vehicle duration.
    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }
}

/// A transfer between two stops (or a change at one stop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: StopId,
    pub to: StopId,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
}

impl Transfer {
    /// Returns the walking duration.
    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }
}

/// A segment of a journey: either a ride or a transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Ride(Ride),
    Transfer(Transfer),
}

impl Segment {
    /// Returns the stop this segment starts at.
    pub fn from(&self) -> StopId {
        match self {
            Segment::Ride(ride) => ride.from,
            Segment::Transfer(transfer) => transfer.from,
        }
    }

    /// Returns the stop this segment ends at.
    pub fn to(&self) -> StopId {
        match self {
            Segment::Ride(ride) => ride.to,
            Segment::Transfer(transfer) => transfer.to,
        }
    }

    pub fn departure(&self) -> ServiceTime {
        match self {
            Segment::Ride(ride) => ride.departure,
            Segment::Transfer(transfer) => transfer.departure,
        }
    }

    pub fn arrival(&self) -> ServiceTime {
        match self {
            Segment::Ride(ride) => ride.arrival,
            Segment::Transfer(transfer) => transfer.arrival,
        }
    }

    /// Returns the ride if this is a ride segment.
    pub fn as_ride(&self) -> Option<&Ride> {
        match self {
            Segment::Ride(ride) => Some(ride),
            Segment::Transfer(_) => None,
        }
    }

    /// Returns the transfer if this is a transfer segment.
    pub fn as_transfer(&self) -> Option<&Transfer> {
        match self {
            Segment::Ride(_) => None,
            Segment::Transfer(transfer) => Some(transfer),
        }
    }
}

/// A journey from one stop to another, as produced by the path search.
///
/// # Invariants
///
/// - At least one ride
/// - Consecutive segments connect (`to` of one = `from` of the next)
/// - No segment ends before it starts, and no segment starts before
///   the previous one ends
///
/// Equality and hashing only look at the departure and arrival times,
/// the transfer count, the end stops and the line/route of every ride.
/// Two journeys using different vehicles of the same route at the same
/// times are therefore equal.
#[derive(Debug, Clone)]
pub struct StopToStopJourney {
    segments: Vec<Segment>,
    transfers: usize,
    distance: f64,
}

impl StopToStopJourney {
    /// Constructs a journey from its segments.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the segments are empty, contain no ride, don't
    /// connect, or run backwards in time.
    pub fn new(segments: Vec<Segment>) -> Result<Self, DomainError> {
        if segments.is_empty() {
            return Err(DomainError::EmptyJourney);
        }

        let rides = segments.iter().filter(|s| s.as_ride().is_some()).count();
        if rides == 0 {
            return Err(DomainError::NoRide);
        }

        for segment in &segments {
            if segment.arrival() < segment.departure() {
                return Err(DomainError::NegativeDuration(segment.from()));
            }
        }

        for window in segments.windows(2) {
            if window[0].to() != window[1].from() {
                return Err(DomainError::SegmentsNotConnected(
                    window[0].to(),
                    window[1].from(),
                ));
            }
            if window[1].departure() < window[0].arrival() {
                return Err(DomainError::OverlappingSegments(window[1].from()));
            }
        }

        let distance = segments
            .iter()
            .filter_map(Segment::as_ride)
            .map(|r| r.distance)
            .sum();

        Ok(Self {
            transfers: rides - 1,
            segments,
            distance,
        })
    }

    /// Returns all segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns all rides in order.
    pub fn rides(&self) -> impl Iterator<Item = &Ride> {
        self.segments.iter().filter_map(Segment::as_ride)
    }

    pub fn origin(&self) -> StopId {
        self.segments[0].from()
    }

    pub fn destination(&self) -> StopId {
        self.segments[self.segments.len() - 1].to()
    }

    /// Departure of the first segment.
    pub fn departure(&self) -> ServiceTime {
        self.segments[0].departure()
    }

    /// Arrival of the last segment.
    pub fn arrival(&self) -> ServiceTime {
        self.segments[self.segments.len() - 1].arrival()
    }

    /// Stop-to-stop travel time (arrival minus departure).
    pub fn travel_time(&self) -> Duration {
        self.arrival() - self.departure()
    }

    /// Number of vehicle changes (rides minus one).
    pub fn transfer_count(&self) -> usize {
        self.transfers
    }

    /// Cumulative vehicle distance in metres.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Returns true if the journey uses a single vehicle.
    pub fn is_direct(&self) -> bool {
        self.transfers == 0
    }

    fn ride_identity(&self) -> impl Iterator<Item = (LineId, RouteId)> + '_ {
        self.rides().map(|r| (r.line, r.route))
    }
}

impl PartialEq for StopToStopJourney {
    fn eq(&self, other: &Self) -> bool {
        self.departure() == other.departure()
            && self.arrival() == other.arrival()
            && self.transfers == other.transfers
            && self.origin() == other.origin()
            && self.destination() == other.destination()
            && self.ride_identity().eq(other.ride_identity())
    }
}

impl Eq for StopToStopJourney {}

impl Hash for StopToStopJourney {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.departure().hash(state);
        self.arrival().hash(state);
        self.transfers.hash(state);
        self.origin().hash(state);
        self.destination().hash(state);
        for identity in self.ride_identity() {
            identity.hash(state);
        }
    }
}
