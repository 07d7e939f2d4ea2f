//! Path-search contract.
//!
//! The assignment never searches the timetable itself. It asks a
//! [`PathSearch`] handle for every journey leaving a stop during the
//! service day. Handles keep private scratch state and are therefore
//! owned by exactly one worker; a [`SearchFactory`] creates one per
//! worker thread.

use std::collections::HashSet;

use crate::domain::{StopId, StopToStopJourney};
use crate::error::AssignmentError;

/// A single-threaded path-search handle.
pub trait PathSearch {
    /// All journeys leaving `origin` during the service day that arrive
    /// at one of the stops in `targets`.
    ///
    /// The result may contain equal journeys (see
    /// [`StopToStopJourney`]'s equality); callers deduplicate.
    fn find_journeys(
        &mut self,
        origin: StopId,
        targets: &HashSet<StopId>,
    ) -> Result<Vec<StopToStopJourney>, AssignmentError>;
}

/// Creates one [`PathSearch`] handle per worker.
pub trait SearchFactory: Sync {
    type Search: PathSearch;

    fn create(&self) -> Result<Self::Search, AssignmentError>;
}

impl<F, S> SearchFactory for F
where
    F: Fn() -> Result<S, AssignmentError> + Sync,
    S: PathSearch,
{
    type Search = S;

    fn create(&self) -> Result<S, AssignmentError> {
        self()
    }
}
