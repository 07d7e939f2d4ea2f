//! Run-wide read-only state.

use crate::demand::{DemandMatrices, TimeSlicing};
use crate::domain::ZoneNetwork;
use crate::error::AssignmentError;

/// Everything the assignment reads but never changes during a run.
///
/// Built once at startup and shared by reference with every worker.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub zones: &'a ZoneNetwork,
    pub demand: &'a (dyn DemandMatrices + Sync),
    pub slicing: TimeSlicing,
}

impl<'a> RunContext<'a> {
    /// # Errors
    ///
    /// Returns `Err` if the slice width isn't positive or a demand slice
    /// name isn't a valid start time.
    pub fn new(
        zones: &'a ZoneNetwork,
        demand: &'a (dyn DemandMatrices + Sync),
        slice_mins: i64,
    ) -> Result<Self, AssignmentError> {
        let slicing = TimeSlicing::new(slice_mins)?;
        for name in demand.time_slice_names() {
            slicing.resolve(name)?;
        }
        Ok(Self {
            zones,
            demand,
            slicing,
        })
    }
}
