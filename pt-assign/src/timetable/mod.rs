//! In-memory timetable.
//!
//! A timetable is a list of trips (vehicle runs with their stop times)
//! plus walkable footpaths between stops. It is the data behind
//! [`TimetableSearch`], the path-search engine used by the binary and
//! the scenario tests.

mod search;

use std::collections::HashMap;

use chrono::Duration;
use serde::Deserialize;

use crate::domain::{LineId, MAX_INPUT_SECONDS, RouteId, ServiceTime, StopId, TripId};
use crate::error::AssignmentError;

pub use search::TimetableSearch;

/// A vehicle call at a stop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopTime {
    pub stop: StopId,
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    /// Distance travelled since the first stop of the trip, in metres.
    #[serde(default)]
    pub distance: f64,
}

/// A single run of a vehicle along a route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub line: LineId,
    pub route: RouteId,
    pub stop_times: Vec<StopTime>,
}

/// A walkable connection between two stops.
///
/// Footpaths are symmetric: walking back takes the same time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Footpath {
    pub from: StopId,
    pub to: StopId,
    pub walk_seconds: i64,
}

fn default_min_change_seconds() -> i64 {
    120
}

/// Raw timetable as read from input files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimetableData {
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub footpaths: Vec<Footpath>,
    /// Minimum time to change vehicles at the same stop.
    #[serde(default = "default_min_change_seconds")]
    pub min_change_seconds: i64,
}

/// A departure event: trip `trip` leaves its `position`-th stop at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Departure {
    pub time: ServiceTime,
    pub trip: usize,
    pub position: usize,
}

/// Validated, indexed timetable.
#[derive(Debug, Clone)]
pub struct Timetable {
    trips: Vec<Trip>,
    departures: HashMap<StopId, Vec<Departure>>,
    footpaths: HashMap<StopId, Vec<(StopId, Duration)>>,
    min_change: Duration,
}

impl Timetable {
    /// Validates and indexes the raw data.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a trip has fewer than two stops or runs backwards
    /// in time, or if a walk or change time is negative.
    pub fn new(data: TimetableData) -> Result<Self, AssignmentError> {
        if !(0..=MAX_INPUT_SECONDS).contains(&data.min_change_seconds) {
            return Err(AssignmentError::Configuration(format!(
                "minimum change time must be between 0 and {MAX_INPUT_SECONDS} seconds"
            )));
        }

        let mut departures: HashMap<StopId, Vec<Departure>> = HashMap::new();
        for (trip_idx, trip) in data.trips.iter().enumerate() {
            validate_trip(trip)?;
            // The last call has no onward departure.
            for (position, call) in trip.stop_times.iter().enumerate() {
                if position + 1 == trip.stop_times.len() {
                    break;
                }
                departures.entry(call.stop).or_default().push(Departure {
                    time: call.departure,
                    trip: trip_idx,
                    position,
                });
            }
        }
        for list in departures.values_mut() {
            list.sort_by_key(|d| (d.time, d.trip, d.position));
        }

        let mut footpaths: HashMap<StopId, Vec<(StopId, Duration)>> = HashMap::new();
        for path in &data.footpaths {
            if !(0..=MAX_INPUT_SECONDS).contains(&path.walk_seconds) {
                return Err(AssignmentError::Configuration(format!(
                    "footpath {} -> {} has walk time {}s out of range",
                    path.from, path.to, path.walk_seconds
                )));
            }
            if path.from == path.to {
                continue;
            }
            let walk = Duration::seconds(path.walk_seconds);
            footpaths.entry(path.from).or_default().push((path.to, walk));
            footpaths.entry(path.to).or_default().push((path.from, walk));
        }

        Ok(Self {
            trips: data.trips,
            departures,
            footpaths,
            min_change: Duration::seconds(data.min_change_seconds),
        })
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn trip(&self, idx: usize) -> &Trip {
        &self.trips[idx]
    }

    /// Departures from `stop`, sorted by time.
    pub(crate) fn departures_at(&self, stop: StopId) -> &[Departure] {
        self.departures
            .get(&stop)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Stops walkable from `stop`, with walk durations.
    pub fn walkable_from(&self, stop: StopId) -> &[(StopId, Duration)] {
        self.footpaths
            .get(&stop)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn min_change(&self) -> Duration {
        self.min_change
    }
}

fn validate_trip(trip: &Trip) -> Result<(), AssignmentError> {
    if trip.stop_times.len() < 2 {
        return Err(AssignmentError::Configuration(format!(
            "trip {} must call at two or more stops",
            trip.id
        )));
    }
    for call in &trip.stop_times {
        if call.departure < call.arrival {
            return Err(AssignmentError::Configuration(format!(
                "trip {} departs {} before arriving",
                trip.id, call.stop
            )));
        }
    }
    for window in trip.stop_times.windows(2) {
        if window[1].arrival < window[0].departure {
            return Err(AssignmentError::Configuration(format!(
                "trip {} arrives at {} before leaving {}",
                trip.id, window[1].stop, window[0].stop
            )));
        }
        if window[1].distance < window[0].distance {
            return Err(AssignmentError::Configuration(format!(
                "trip {} has decreasing distance at {}",
                trip.id, window[1].stop
            )));
        }
    }
    Ok(())
}
