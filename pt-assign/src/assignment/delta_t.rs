//! Schedule-deviation ("delta-t") models.
//!
//! A traveller who wants to leave within a sample interval but takes a
//! candidate departing outside it has to adapt: leave early or leave late.
//! The models return the deviation in seconds; at most one of the two is
//! nonzero.

use super::config::DeltaTConfig;
use crate::domain::ServiceTime;

/// Pluggable schedule-deviation model.
pub trait DeltaTCalculator: Send + Sync {
    /// Seconds the traveller has to leave before the desired interval.
    fn early(&self, departure: ServiceTime, start: ServiceTime, end: ServiceTime) -> f64;

    /// Seconds the traveller has to leave after the desired interval.
    fn late(&self, departure: ServiceTime, start: ServiceTime, end: ServiceTime) -> f64;
}

/// Deviation from the interval boundaries; zero inside the interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalDeltaT;

impl DeltaTCalculator for IntervalDeltaT {
    fn early(&self, departure: ServiceTime, start: ServiceTime, _end: ServiceTime) -> f64 {
        f64::from((start.seconds() - departure.seconds()).max(0))
    }

    fn late(&self, departure: ServiceTime, _start: ServiceTime, end: ServiceTime) -> f64 {
        f64::from((departure.seconds() - end.seconds()).max(0))
    }
}

/// Deviation from the interval midpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointDeltaT;

impl MidpointDeltaT {
    fn midpoint(start: ServiceTime, end: ServiceTime) -> f64 {
        (f64::from(start.seconds()) + f64::from(end.seconds())) / 2.0
    }
}

impl DeltaTCalculator for MidpointDeltaT {
    fn early(&self, departure: ServiceTime, start: ServiceTime, end: ServiceTime) -> f64 {
        (Self::midpoint(start, end) - f64::from(departure.seconds())).max(0.0)
    }

    fn late(&self, departure: ServiceTime, start: ServiceTime, end: ServiceTime) -> f64 {
        (f64::from(departure.seconds()) - Self::midpoint(start, end)).max(0.0)
    }
}

/// Builds the configured model.
pub fn build_delta_t(config: DeltaTConfig) -> Box<dyn DeltaTCalculator> {
    match config {
        DeltaTConfig::Interval => Box::new(IntervalDeltaT),
        DeltaTConfig::Midpoint => Box::new(MidpointDeltaT),
    }
}
