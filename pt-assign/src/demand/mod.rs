//! Demand matrices, time slices and unroutable demand.

mod matrices;
mod time_slice;
mod unroutable;

pub use matrices::{DemandMatrices, DemandRecord, DemandTable};
pub use time_slice::{TimeSlice, TimeSlicing};
pub use unroutable::{UnroutableDemand, UnroutableDemandPart};
