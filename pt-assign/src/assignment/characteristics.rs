//! Perceived journey time and search impedance.
//!
//! Both scalars are weighted sums of the same journey components; they
//! only differ in their weights and in whether additional intermediate
//! stops are penalised.

use chrono::Duration;

use super::config::TimeWeights;
use crate::domain::{Candidate, Segment, StopToStopJourney, minutes_of};
use crate::error::AssignmentError;

/// Time components of a journey, gathered in one pass over its segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JourneyComponents {
    pub in_vehicle: Duration,
    pub walk: Duration,
    pub transfer_wait: Duration,
    pub additional_stops: u32,
}

impl JourneyComponents {
    /// Collects the components of `journey`.
    ///
    /// # Errors
    ///
    /// Returns `InconsistentItinerary` if walk, wait and in-vehicle time
    /// don't add up to the journey's span, which means the segments have
    /// gaps the search engine should never produce.
    pub fn of(journey: &StopToStopJourney) -> Result<Self, AssignmentError> {
        let mut in_vehicle = Duration::zero();
        let mut walk = Duration::zero();
        let mut transfer_wait = Duration::zero();
        let mut additional_stops = 0;
        let mut transfer_end = None;

        for segment in journey.segments() {
            match segment {
                Segment::Ride(ride) => {
                    in_vehicle += ride.duration();
                    additional_stops += ride.additional_stops;
                    if let Some(end) = transfer_end.take() {
                        transfer_wait += ride.departure - end;
                    }
                }
                Segment::Transfer(transfer) => {
                    walk += transfer.duration();
                    transfer_end = Some(transfer.arrival);
                }
            }
        }

        let span = journey.travel_time();
        if walk + transfer_wait + in_vehicle != span {
            return Err(AssignmentError::InconsistentItinerary {
                origin: journey.origin(),
                destination: journey.destination(),
                reason: format!(
                    "walk {}s + wait {}s + in-vehicle {}s != span {}s",
                    walk.num_seconds(),
                    transfer_wait.num_seconds(),
                    in_vehicle.num_seconds(),
                    span.num_seconds()
                ),
            });
        }

        Ok(Self {
            in_vehicle,
            walk,
            transfer_wait,
            additional_stops,
        })
    }
}

/// Weighted sum of a candidate's components, in minutes.
fn weighted(
    weights: &TimeWeights,
    components: &JourneyComponents,
    candidate: &Candidate,
    with_additional_stops: bool,
) -> f64 {
    let transfers = candidate.transfer_count() as f64;
    let travel_time = minutes_of(candidate.travel_time_with_access());

    let mut value = weights.in_vehicle * minutes_of(components.in_vehicle)
        + weights.access * minutes_of(candidate.origin().walk_time())
        + weights.egress * minutes_of(candidate.destination().walk_time())
        + weights.walk * minutes_of(components.walk)
        + weights.transfer_wait * minutes_of(components.transfer_wait)
        + transfers * (weights.transfer_fixed + weights.transfer_proportional * travel_time);

    if with_additional_stops {
        value += weights.additional_stop * f64::from(components.additional_stops);
    }
    value
}

/// Fills in `perceived_journey_time` and `search_impedance`.
pub fn apply_characteristics(
    candidate: &mut Candidate,
    perceived: &TimeWeights,
    impedance: &TimeWeights,
) -> Result<(), AssignmentError> {
    let components = JourneyComponents::of(candidate.journey())?;
    candidate.perceived_journey_time = weighted(perceived, &components, candidate, true);
    candidate.search_impedance = weighted(impedance, &components, candidate, false);
    Ok(())
}
