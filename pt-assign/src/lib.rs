//! Public-transport demand assignment.
//!
//! Splits time-sliced origin-destination demand between the journeys a
//! path search finds for each origin zone, and streams the surviving
//! candidates with their assigned demand to result sinks.

pub mod assignment;
pub mod context;
pub mod demand;
pub mod domain;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod search;
pub mod skim;
pub mod timetable;
