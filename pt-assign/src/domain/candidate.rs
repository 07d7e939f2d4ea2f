//! Zone-to-zone candidate journeys.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;

use super::{ConnectedStop, ServiceTime, StopToStopJourney, ZoneId};

/// Demand and adaptation time assigned to a candidate for one destination zone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Assigned {
    pub demand: f64,
    /// Sum of schedule deviation (minutes) weighted by assigned demand.
    pub adaptation_time: f64,
}

/// A stop-to-stop journey dressed with zone access and egress.
///
/// The journey itself is shared and immutable. The scalar fields are
/// filled in by the characteristics calculator, the originality weighting
/// and the demand assignment, in that order.
#[derive(Debug, Clone)]
pub struct Candidate {
    journey: Arc<StopToStopJourney>,
    origin: ConnectedStop,
    destination: ConnectedStop,
    travel_time_with_access: Duration,
    pub search_impedance: f64,
    pub perceived_journey_time: f64,
    pub originality: f64,
    assigned: BTreeMap<ZoneId, Assigned>,
}

impl Candidate {
    pub fn new(
        journey: Arc<StopToStopJourney>,
        origin: ConnectedStop,
        destination: ConnectedStop,
    ) -> Self {
        let travel_time_with_access =
            journey.travel_time() + origin.walk_time() + destination.walk_time();
        Self {
            journey,
            origin,
            destination,
            travel_time_with_access,
            search_impedance: 0.0,
            perceived_journey_time: 0.0,
            originality: 1.0,
            assigned: BTreeMap::new(),
        }
    }

    pub fn journey(&self) -> &StopToStopJourney {
        &self.journey
    }

    pub fn origin(&self) -> &ConnectedStop {
        &self.origin
    }

    pub fn destination(&self) -> &ConnectedStop {
        &self.destination
    }

    pub fn departure(&self) -> ServiceTime {
        self.journey.departure()
    }

    pub fn arrival(&self) -> ServiceTime {
        self.journey.arrival()
    }

    /// Departure from the origin zone, i.e. the stop departure minus the
    /// access walk.
    pub fn access_departure(&self) -> ServiceTime {
        self.journey.departure() - self.origin.walk_time()
    }

    pub fn transfer_count(&self) -> usize {
        self.journey.transfer_count()
    }

    pub fn travel_time_without_access(&self) -> Duration {
        self.journey.travel_time()
    }

    /// Stop-to-stop travel time plus access and egress walks.
    pub fn travel_time_with_access(&self) -> Duration {
        self.travel_time_with_access
    }

    /// Adds a demand increment for `zone`.
    pub fn add_demand(&mut self, zone: ZoneId, demand: f64, adaptation_minutes: f64) {
        let entry = self.assigned.entry(zone).or_default();
        entry.demand += demand;
        entry.adaptation_time += adaptation_minutes * demand;
    }

    /// Demand assigned for `zone` (zero if none).
    pub fn assigned(&self, zone: ZoneId) -> Assigned {
        self.assigned.get(&zone).copied().unwrap_or_default()
    }
}
