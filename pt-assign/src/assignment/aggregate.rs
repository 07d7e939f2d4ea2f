//! Route aggregation: stop-level journeys to zone-level candidates.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::demand::DemandMatrices;
use crate::domain::{Candidate, Segment, StopId, StopToStopJourney, ZoneId, ZoneNetwork};
use crate::error::AssignmentError;
use crate::search::PathSearch;

/// Stops the path search has to reach: every stop connected to a
/// destination that receives demand from at least one origin.
pub fn destination_stop_filter(
    zones: &ZoneNetwork,
    demand: &dyn DemandMatrices,
    origins: &[ZoneId],
    destinations: &[ZoneId],
) -> Result<HashSet<StopId>, AssignmentError> {
    let mut stops = HashSet::new();
    for &destination in destinations {
        let wanted = origins
            .iter()
            .any(|&origin| origin != destination && demand.has_demand(origin, destination));
        if wanted {
            stops.extend(zones.connected_stops(destination)?.iter().map(|c| c.stop));
        }
    }
    Ok(stops)
}

/// Returns true if `segment` is a transfer between two access points of
/// `zone`.
fn within_zone(zones: &ZoneNetwork, zone: ZoneId, segment: Option<&Segment>) -> bool {
    match segment {
        Some(Segment::Transfer(t)) => {
            zones.stop_in_zone(t.from, zone) && zones.stop_in_zone(t.to, zone)
        }
        _ => false,
    }
}

/// Returns true if the journey starts with a walk inside the origin zone
/// or ends with a walk inside the destination zone.
fn is_invalid(
    zones: &ZoneNetwork,
    origin: ZoneId,
    destination: ZoneId,
    journey: &StopToStopJourney,
) -> bool {
    within_zone(zones, origin, journey.segments().first())
        || within_zone(zones, destination, journey.segments().last())
}

/// Distinct journeys per (origin stop, destination stop).
type JourneyGroups = HashMap<(StopId, StopId), Vec<Arc<StopToStopJourney>>>;

fn search_journeys<S: PathSearch>(
    search: &mut S,
    zones: &ZoneNetwork,
    origin: ZoneId,
    targets: &HashSet<StopId>,
) -> Result<JourneyGroups, AssignmentError> {
    let mut groups = JourneyGroups::new();
    let mut searched = HashSet::new();

    for connected in zones.connected_stops(origin)? {
        if !searched.insert(connected.stop) {
            continue;
        }
        let mut seen = HashSet::new();
        for journey in search.find_journeys(connected.stop, targets)? {
            if journey.origin() != connected.stop {
                return Err(AssignmentError::InconsistentItinerary {
                    origin: journey.origin(),
                    destination: journey.destination(),
                    reason: format!("returned by a search from {}", connected.stop),
                });
            }
            let journey = Arc::new(journey);
            if seen.insert(Arc::clone(&journey)) {
                groups
                    .entry((journey.origin(), journey.destination()))
                    .or_default()
                    .push(journey);
            }
        }
    }
    Ok(groups)
}

/// Builds the candidates from `origin` to each of `destinations`.
///
/// Every destination other than `origin` gets an entry, empty if no
/// journey was found.
pub fn collect_candidates<S: PathSearch>(
    search: &mut S,
    zones: &ZoneNetwork,
    origin: ZoneId,
    destinations: &[ZoneId],
    targets: &HashSet<StopId>,
) -> Result<BTreeMap<ZoneId, Vec<Candidate>>, AssignmentError> {
    let groups = search_journeys(search, zones, origin, targets)?;
    let origin_stops = zones.connected_stops(origin)?;

    let mut result = BTreeMap::new();
    let mut invalid = 0usize;

    for &destination in destinations {
        if destination == origin {
            continue;
        }
        let mut candidates = Vec::new();
        for to in zones.connected_stops(destination)? {
            for from in origin_stops {
                let Some(journeys) = groups.get(&(from.stop, to.stop)) else {
                    continue;
                };
                for journey in journeys {
                    if is_invalid(zones, origin, destination, journey) {
                        invalid += 1;
                        continue;
                    }
                    candidates.push(Candidate::new(
                        Arc::clone(journey),
                        from.clone(),
                        to.clone(),
                    ));
                }
            }
        }
        trace!(
            origin = %origin,
            destination = %destination,
            candidates = candidates.len(),
            "aggregated"
        );
        result.insert(destination, candidates);
    }

    debug!(
        origin = %origin,
        stop_pairs = groups.len(),
        invalid,
        "route aggregation complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::DemandTable;
    use crate::domain::{
        ConnectedStop, LineId, Ride, RouteId, ServiceTime, Transfer, TripId, Zone,
    };
    use chrono::Duration;

    /// Replays fixed journeys per origin stop.
    struct FixedSearch {
        journeys: HashMap<StopId, Vec<StopToStopJourney>>,
        calls: Vec<StopId>,
    }

    impl PathSearch for FixedSearch {
        fn find_journeys(
            &mut self,
            origin: StopId,
            targets: &HashSet<StopId>,
        ) -> Result<Vec<StopToStopJourney>, AssignmentError> {
            self.calls.push(origin);
            Ok(self
                .journeys
                .get(&origin)
                .into_iter()
                .flatten()
                .filter(|j| targets.contains(&j.destination()))
                .cloned()
                .collect())
        }
    }

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse_hhmm(s).unwrap()
    }

    fn ride(trip: u32, from: u32, to: u32, dep: &str, arr: &str) -> Segment {
        Segment::Ride(Ride {
            trip: TripId(trip),
            line: LineId(1),
            route: RouteId(1),
            from: StopId(from),
            to: StopId(to),
            departure: t(dep),
            arrival: t(arr),
            distance: 0.0,
            additional_stops: 0,
        })
    }

    fn walk(from: u32, to: u32, dep: &str, arr: &str) -> Segment {
        Segment::Transfer(Transfer {
            from: StopId(from),
            to: StopId(to),
            departure: t(dep),
            arrival: t(arr),
        })
    }

    fn journey(segments: Vec<Segment>) -> StopToStopJourney {
        StopToStopJourney::new(segments).unwrap()
    }

    /// Zone 1 has stops 1 and 2, zone 2 has stops 3 and 4, zone 3 has stop 5.
    fn network() -> ZoneNetwork {
        ZoneNetwork::new(
            [
                Zone::new(ZoneId(1), "one"),
                Zone::new(ZoneId(2), "two"),
                Zone::new(ZoneId(3), "three"),
            ],
            [
                ConnectedStop::new(ZoneId(1), StopId(1), Duration::minutes(3)),
                ConnectedStop::new(ZoneId(1), StopId(2), Duration::minutes(5)),
                ConnectedStop::new(ZoneId(2), StopId(3), Duration::minutes(2)),
                ConnectedStop::new(ZoneId(2), StopId(4), Duration::minutes(4)),
                ConnectedStop::new(ZoneId(3), StopId(5), Duration::minutes(1)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn filter_covers_destinations_with_demand() {
        let zones = network();
        let mut demand = DemandTable::new(["07:00".to_string()]).unwrap();
        demand.set(ZoneId(1), ZoneId(2), "07:00", 3.0).unwrap();
        // Intrazonal demand doesn't count
        demand.set(ZoneId(3), ZoneId(3), "07:00", 3.0).unwrap();

        let all = [ZoneId(1), ZoneId(2), ZoneId(3)];
        let filter = destination_stop_filter(&zones, &demand, &all, &all).unwrap();
        assert_eq!(filter, HashSet::from([StopId(3), StopId(4)]));
    }

    #[test]
    fn filter_looks_up_wanted_zones_only() {
        let zones = network();
        let demand = DemandTable::new(["07:00".to_string()]).unwrap();
        // No demand to zone 9 means it is never looked up
        let filter = destination_stop_filter(&zones, &demand, &[ZoneId(1)], &[ZoneId(9)]);
        assert!(filter.unwrap().is_empty());

        let mut demand = DemandTable::new(["07:00".to_string()]).unwrap();
        demand.set(ZoneId(1), ZoneId(9), "07:00", 1.0).unwrap();
        let err = destination_stop_filter(&zones, &demand, &[ZoneId(1)], &[ZoneId(9)]);
        assert!(matches!(err, Err(AssignmentError::UnknownZone(ZoneId(9)))));
    }

    #[test]
    fn builds_candidates_per_stop_pair() {
        let zones = network();
        let mut search = FixedSearch {
            journeys: HashMap::from([
                (
                    StopId(1),
                    vec![
                        journey(vec![ride(1, 1, 3, "07:00", "07:20")]),
                        // Same line and times on another vehicle: a duplicate
                        journey(vec![ride(2, 1, 3, "07:00", "07:20")]),
                        journey(vec![ride(3, 1, 4, "07:00", "07:25")]),
                    ],
                ),
                (StopId(2), vec![journey(vec![ride(4, 2, 3, "07:30", "07:45")])]),
            ]),
            calls: Vec::new(),
        };
        let targets = HashSet::from([StopId(3), StopId(4)]);

        let result = collect_candidates(
            &mut search,
            &zones,
            ZoneId(1),
            &[ZoneId(1), ZoneId(2), ZoneId(3)],
            &targets,
        )
        .unwrap();

        assert_eq!(search.calls, vec![StopId(1), StopId(2)]);
        assert!(!result.contains_key(&ZoneId(1)));
        assert!(result[&ZoneId(3)].is_empty());

        let to_two = &result[&ZoneId(2)];
        assert_eq!(to_two.len(), 3);
        let from_two = to_two
            .iter()
            .find(|c| c.origin().stop == StopId(2))
            .unwrap();
        assert_eq!(from_two.origin().walk_time(), Duration::minutes(5));
        assert_eq!(from_two.destination().walk_time(), Duration::minutes(2));
        assert_eq!(from_two.travel_time_with_access(), Duration::minutes(22));
    }

    #[test]
    fn drops_walks_within_end_zones() {
        let zones = network();
        let mut search = FixedSearch {
            journeys: HashMap::from([(
                StopId(1),
                vec![
                    // Walks from stop 1 to stop 2, both in the origin zone
                    journey(vec![
                        walk(1, 2, "06:55", "07:00"),
                        ride(1, 2, 3, "07:00", "07:20"),
                    ]),
                    // Walks from stop 3 to stop 4, both in the destination zone
                    journey(vec![
                        ride(2, 1, 3, "07:30", "07:50"),
                        walk(3, 4, "07:50", "07:54"),
                    ]),
                    // Walks to stop 5, outside the origin zone
                    journey(vec![
                        walk(1, 5, "07:55", "08:00"),
                        ride(3, 5, 3, "08:00", "08:20"),
                    ]),
                ],
            )]),
            calls: Vec::new(),
        };
        let targets = HashSet::from([StopId(3), StopId(4)]);

        let result =
            collect_candidates(&mut search, &zones, ZoneId(1), &[ZoneId(2)], &targets).unwrap();

        let candidates = &result[&ZoneId(2)];
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].departure(), t("07:55"));
    }

    #[test]
    fn rejects_journeys_from_other_stops() {
        let zones = network();
        let mut search = FixedSearch {
            journeys: HashMap::from([(
                StopId(1),
                vec![journey(vec![ride(1, 2, 3, "07:00", "07:20")])],
            )]),
            calls: Vec::new(),
        };
        let targets = HashSet::from([StopId(3)]);

        let err = collect_candidates(&mut search, &zones, ZoneId(1), &[ZoneId(2)], &targets)
            .unwrap_err();
        assert!(matches!(err, AssignmentError::InconsistentItinerary { .. }));
    }
}
