//! Round-based journey enumeration over a [`Timetable`].
//!
//! For every departure leaving the origin (directly or after a footpath)
//! the search explores transfers round by round, one round per extra
//! vehicle. Within one start, a stop is only reported again in a later
//! round if it is reached strictly earlier, so the result per start is
//! Pareto-optimal in (arrival, transfers). Dominance across different
//! starts is left to the assignment's own filter.

use std::collections::{HashMap, HashSet};

use chrono::Duration;
use tracing::{debug, trace};

use super::Timetable;
use crate::domain::{
    LineId, Ride, RouteId, Segment, ServiceTime, StopId, StopToStopJourney, Transfer,
};
use crate::error::AssignmentError;
use crate::search::PathSearch;

/// A partial journey ending with a ride at `stop`.
#[derive(Clone)]
struct Label {
    stop: StopId,
    time: ServiceTime,
    segments: Vec<Segment>,
    routes: Vec<(LineId, RouteId)>,
}

/// Path-search handle over a shared timetable.
///
/// The handle keeps per-search scratch state, so each worker thread owns
/// its own.
pub struct TimetableSearch<'a> {
    timetable: &'a Timetable,
    max_transfers: usize,
    best: HashMap<StopId, ServiceTime>,
}

impl<'a> TimetableSearch<'a> {
    pub fn new(timetable: &'a Timetable, max_transfers: usize) -> Self {
        Self {
            timetable,
            max_transfers,
            best: HashMap::new(),
        }
    }

    /// Labels for riding trip `trip` from `position` to each later stop.
    fn ride_labels(
        &self,
        prefix: &[Segment],
        routes: &[(LineId, RouteId)],
        trip_idx: usize,
        position: usize,
    ) -> Vec<Label> {
        let trip = self.timetable.trip(trip_idx);
        let board = &trip.stop_times[position];
        let mut routes = routes.to_vec();
        routes.push((trip.line, trip.route));

        trip.stop_times[position + 1..]
            .iter()
            .map(|alight| {
                let mut segments = prefix.to_vec();
                segments.push(Segment::Ride(Ride {
                    trip: trip.id,
                    line: trip.line,
                    route: trip.route,
                    from: board.stop,
                    to: alight.stop,
                    departure: board.departure,
                    arrival: alight.arrival,
                    distance: alight.distance - board.distance,
                    additional_stops: 0,
                }));
                Label {
                    stop: alight.stop,
                    time: alight.arrival,
                    segments,
                    routes: routes.clone(),
                }
            })
            .collect()
    }

    /// Earliest departure of each route at `stop` not before `ready`.
    fn earliest_per_route(&self, stop: StopId, ready: ServiceTime) -> Vec<(usize, usize)> {
        let departures = self.timetable.departures_at(stop);
        let first = departures.partition_point(|d| d.time < ready);
        let mut seen = HashSet::new();
        departures[first..]
            .iter()
            .filter(|d| {
                let trip = self.timetable.trip(d.trip);
                seen.insert((trip.line, trip.route))
            })
            .map(|d| (d.trip, d.position))
            .collect()
    }

    fn improves(&mut self, stop: StopId, time: ServiceTime) -> bool {
        match self.best.get(&stop) {
            Some(best) if *best <= time => false,
            _ => {
                self.best.insert(stop, time);
                true
            }
        }
    }

    /// Explores every journey starting with the given boarding.
    fn search_from_start(
        &mut self,
        origin: StopId,
        targets: &HashSet<StopId>,
        prefix: Vec<Segment>,
        trip_idx: usize,
        position: usize,
        found: &mut Vec<StopToStopJourney>,
    ) -> Result<(), AssignmentError> {
        let timetable = self.timetable;
        self.best.clear();
        let mut rides = self.ride_labels(&prefix, &[], trip_idx, position);

        for round in 0..=self.max_transfers {
            let mut improved = Vec::new();
            for label in rides {
                if label.stop != origin && self.improves(label.stop, label.time) {
                    improved.push(label);
                }
            }

            for label in &improved {
                if targets.contains(&label.stop) {
                    found.push(StopToStopJourney::new(label.segments.clone())?);
                }
            }

            // Walks ending the journey at a target
            for label in &improved {
                for &(to, walk) in timetable.walkable_from(label.stop) {
                    if to == origin || !targets.contains(&to) {
                        continue;
                    }
                    let arrival = label.time + walk;
                    if self.improves(to, arrival) {
                        let mut segments = label.segments.clone();
                        segments.push(Segment::Transfer(Transfer {
                            from: label.stop,
                            to,
                            departure: label.time,
                            arrival,
                        }));
                        found.push(StopToStopJourney::new(segments)?);
                    }
                }
            }

            if round == self.max_transfers {
                break;
            }

            let mut next = Vec::new();
            for label in &improved {
                let mut changes = vec![(label.stop, Duration::zero(), timetable.min_change())];
                changes.extend(
                    timetable
                        .walkable_from(label.stop)
                        .iter()
                        .map(|&(to, walk)| (to, walk, walk)),
                );

                for (stop, walk, slack) in changes {
                    let ready = label.time + slack;
                    for (next_trip, next_position) in self.earliest_per_route(stop, ready) {
                        let trip = timetable.trip(next_trip);
                        if label.routes.contains(&(trip.line, trip.route)) {
                            continue;
                        }
                        let mut segments = label.segments.clone();
                        segments.push(Segment::Transfer(Transfer {
                            from: label.stop,
                            to: stop,
                            departure: label.time,
                            arrival: label.time + walk,
                        }));
                        next.extend(self.ride_labels(
                            &segments,
                            &label.routes,
                            next_trip,
                            next_position,
                        ));
                    }
                }
            }

            if next.is_empty() {
                break;
            }
            rides = next;
        }

        Ok(())
    }
}

impl PathSearch for TimetableSearch<'_> {
    fn find_journeys(
        &mut self,
        origin: StopId,
        targets: &HashSet<StopId>,
    ) -> Result<Vec<StopToStopJourney>, AssignmentError> {
        let mut found = Vec::new();

        let mut access = vec![(origin, Duration::zero())];
        access.extend(self.timetable.walkable_from(origin).iter().copied());

        for (stop, walk) in access {
            let departures = self.timetable.departures_at(stop).to_vec();
            for departure in departures {
                let prefix = if stop == origin {
                    Vec::new()
                } else {
                    vec![Segment::Transfer(Transfer {
                        from: origin,
                        to: stop,
                        departure: departure.time - walk,
                        arrival: departure.time,
                    })]
                };
                trace!(
                    origin = %origin,
                    board = %stop,
                    departure = %departure.time,
                    "exploring start"
                );
                self.search_from_start(
                    origin,
                    targets,
                    prefix,
                    departure.trip,
                    departure.position,
                    &mut found,
                )?;
            }
        }

        debug!(origin = %origin, journeys = found.len(), "timetable search complete");
        Ok(found)
    }
}
