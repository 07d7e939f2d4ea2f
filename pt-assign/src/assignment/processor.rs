//! Per-origin processing and the run entry point.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use super::aggregate::{collect_candidates, destination_stop_filter};
use super::characteristics::apply_characteristics;
use super::config::AssignmentConfig;
use super::delta_t::{DeltaTCalculator, build_delta_t};
use super::dominance::{preselect, remove_dominated};
use super::originality::apply_originality;
use super::split::DemandSplitter;
use super::utility::{UtilityFunction, build_utility};
use crate::context::RunContext;
use crate::demand::UnroutableDemand;
use crate::domain::{Candidate, StopId, ZoneId};
use crate::error::AssignmentError;
use crate::pipeline::{
    Pipeline, PipelineConfig, PipelineStats, ProcessorFactory, SinkSet, WorkResult,
    ZoneProcessor,
};
use crate::search::{PathSearch, SearchFactory};

/// One assignment scenario: a named configuration with its choice model.
///
/// Each variant feeds its own output channel.
pub struct AssignmentVariant {
    name: String,
    config: AssignmentConfig,
    utility: Box<dyn UtilityFunction>,
    delta_t: Box<dyn DeltaTCalculator>,
}

impl AssignmentVariant {
    /// Builds a variant with the utility and delta-t models named in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the configuration doesn't validate.
    pub fn new(
        name: impl Into<String>,
        config: AssignmentConfig,
    ) -> Result<Self, AssignmentError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            utility: build_utility(&config.choice.utility),
            delta_t: build_delta_t(config.choice.delta_t),
            config,
        })
    }

    /// Replace the utility function.
    pub fn with_utility(mut self, utility: Box<dyn UtilityFunction>) -> Self {
        self.utility = utility;
        self
    }

    /// Replace the schedule-deviation model.
    pub fn with_delta_t(mut self, delta_t: Box<dyn DeltaTCalculator>) -> Self {
        self.delta_t = delta_t;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    fn splitter(&self) -> DemandSplitter<'_> {
        DemandSplitter::new(&self.config.choice, self.utility.as_ref(), self.delta_t.as_ref())
    }

    /// Runs characteristics, filtering, originality and the demand split
    /// for one OD pair.
    fn assign(
        &self,
        ctx: &RunContext<'_>,
        origin: ZoneId,
        destination: ZoneId,
        mut candidates: Vec<Candidate>,
        unroutable: &mut UnroutableDemand,
    ) -> Result<Vec<Candidate>, AssignmentError> {
        let config = &self.config;
        // The search may run with a larger limit shared by all variants
        candidates.retain(|c| c.transfer_count() <= config.max_transfers);
        for candidate in &mut candidates {
            apply_characteristics(candidate, &config.perceived_time, &config.search_impedance)?;
        }
        let found = candidates.len();

        let candidates = remove_dominated(candidates);
        let mut candidates = preselect(candidates, &config.preselection);
        apply_originality(&mut candidates);

        self.splitter().assign(
            origin,
            destination,
            &mut candidates,
            ctx.demand,
            &ctx.slicing,
            unroutable,
        )?;

        if found > 0 {
            debug!(
                variant = %self.name,
                origin = %origin,
                destination = %destination,
                found,
                kept = candidates.len(),
                "od pair assigned"
            );
        }
        Ok(candidates)
    }
}

impl fmt::Debug for AssignmentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssignmentVariant")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Processes origin zones on one worker thread.
pub struct AssignmentProcessor<'a, S> {
    ctx: &'a RunContext<'a>,
    search: S,
    variants: &'a [AssignmentVariant],
    /// Sorted, without duplicates.
    destinations: &'a [ZoneId],
    targets: &'a HashSet<StopId>,
}

impl<S: PathSearch> ZoneProcessor for AssignmentProcessor<'_, S> {
    fn process(&mut self, origin: ZoneId) -> Result<Vec<WorkResult>, AssignmentError> {
        let zones = self.ctx.zones;
        zones.zone(origin)?;

        let by_destination = collect_candidates(
            &mut self.search,
            zones,
            origin,
            self.destinations,
            self.targets,
        )?;

        // Journeys never stay inside one zone, so intrazonal demand can only
        // be unroutable.
        let intrazonal = self.destinations.binary_search(&origin).is_ok();

        let mut results = Vec::with_capacity(self.variants.len());
        for variant in self.variants {
            let mut routes = BTreeMap::new();
            let mut unroutable = UnroutableDemand::new();
            for (&destination, candidates) in &by_destination {
                let kept = variant.assign(
                    self.ctx,
                    origin,
                    destination,
                    candidates.clone(),
                    &mut unroutable,
                )?;
                routes.insert(destination, kept);
            }
            if intrazonal {
                let kept =
                    variant.assign(self.ctx, origin, origin, Vec::new(), &mut unroutable)?;
                routes.insert(origin, kept);
            }

            if !unroutable.is_empty() {
                warn!(
                    variant = %variant.name,
                    origin = %origin,
                    parts = unroutable.parts().len(),
                    demand = unroutable.total(),
                    "unroutable demand"
                );
            }
            results.push(WorkResult {
                origin,
                routes,
                unroutable,
            });
        }
        Ok(results)
    }
}

/// Hands each worker its own processor and search handle.
struct AssignmentFactory<'a, F> {
    ctx: &'a RunContext<'a>,
    search: &'a F,
    variants: &'a [AssignmentVariant],
    destinations: &'a [ZoneId],
    targets: &'a HashSet<StopId>,
}

impl<'a, F: SearchFactory> ProcessorFactory for AssignmentFactory<'a, F> {
    type Processor = AssignmentProcessor<'a, F::Search>;

    fn create(&self, worker: usize) -> Result<Self::Processor, AssignmentError> {
        debug!(worker, "creating search handle");
        Ok(AssignmentProcessor {
            ctx: self.ctx,
            search: self.search.create()?,
            variants: self.variants,
            destinations: self.destinations,
            targets: self.targets,
        })
    }
}

/// Resolve a zone list: `None` means every zone. The result is sorted and
/// free of duplicates.
fn resolve_zones(
    ctx: &RunContext<'_>,
    zones: Option<&[ZoneId]>,
) -> Result<Vec<ZoneId>, AssignmentError> {
    let Some(zones) = zones else {
        return Ok(ctx.zones.zone_ids().collect());
    };
    let mut resolved = Vec::with_capacity(zones.len());
    for &zone in zones {
        ctx.zones.zone(zone)?;
        resolved.push(zone);
    }
    resolved.sort();
    resolved.dedup();
    Ok(resolved)
}

/// Assigns the demand from `origins` to `destinations` and streams the
/// results into `sinks`, one sink set per variant. Blocks until every
/// origin has been delivered.
///
/// # Errors
///
/// Fails fast on the first error of any worker, the writer or a sink.
pub fn run_assignment<F: SearchFactory>(
    ctx: &RunContext<'_>,
    search: &F,
    origins: Option<&[ZoneId]>,
    destinations: Option<&[ZoneId]>,
    variants: &[AssignmentVariant],
    pipeline: &PipelineConfig,
    sinks: &mut [SinkSet<'_>],
) -> Result<PipelineStats, AssignmentError> {
    if variants.is_empty() {
        return Err(AssignmentError::Configuration(
            "at least one assignment variant is required".to_string(),
        ));
    }
    let slice_width = ctx.slicing.width().num_minutes();
    if let Some(variant) = variants
        .iter()
        .find(|v| v.config.time_slice_mins != slice_width)
    {
        return Err(AssignmentError::Configuration(format!(
            "variant {} uses {} minute slices, the demand uses {slice_width}",
            variant.name, variant.config.time_slice_mins
        )));
    }

    let origins = resolve_zones(ctx, origins)?;
    let destinations = resolve_zones(ctx, destinations)?;
    let targets = destination_stop_filter(ctx.zones, ctx.demand, &origins, &destinations)?;
    info!(
        origins = origins.len(),
        destinations = destinations.len(),
        target_stops = targets.len(),
        variants = variants.len(),
        "starting assignment"
    );

    let factory = AssignmentFactory {
        ctx,
        search,
        variants,
        destinations: &destinations,
        targets: &targets,
    };
    let mut pipeline = Pipeline::new(pipeline.clone(), variants.len())?;
    pipeline.run(&factory, &origins, sinks)
}
