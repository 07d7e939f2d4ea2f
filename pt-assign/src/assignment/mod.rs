//! Route processing and demand assignment for one origin zone.
//!
//! For every destination the candidates pass through the same stages:
//! aggregation of stop-level journeys into zone-level candidates,
//! characteristics, dominance filtering and preselection, originality
//! weighting, and finally the time-sampled demand split.

mod aggregate;
mod characteristics;
mod config;
mod delta_t;
mod dominance;
mod originality;
mod processor;
mod split;
mod utility;


pub use aggregate::{collect_candidates, destination_stop_filter};
pub use characteristics::{JourneyComponents, apply_characteristics};
pub use config::{
    AssignmentConfig, ChoiceConfig, DeltaTConfig, PreselectionConfig, TimeWeights, UtilityConfig,
};
pub use delta_t::{DeltaTCalculator, IntervalDeltaT, MidpointDeltaT, build_delta_t};
pub use dominance::{preselect, remove_dominated, sort_candidates};
pub use originality::apply_originality;
pub use processor::{AssignmentProcessor, AssignmentVariant, run_assignment};
pub use split::DemandSplitter;
pub use utility::{BoxCox, Lohse, UtilityFunction, build_utility};
