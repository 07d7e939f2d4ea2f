//! Origin-destination skims.
//!
//! A skim condenses the candidates of one OD pair into demand-weighted
//! averages. Pairs without assigned demand are averaged over their
//! candidates with equal weights, so the travel times of pairs nobody
//! travels between are still reported.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::demand::UnroutableDemandPart;
use crate::domain::{Candidate, ZoneId, minutes_of};
use crate::error::AssignmentError;
use crate::pipeline::RouteSink;

/// Aggregated figures for one OD pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdSkim {
    pub origin: ZoneId,
    pub destination: ZoneId,
    /// Demand assigned to candidates.
    pub demand: f64,
    /// Demand without any usable candidate.
    pub unroutable: f64,
    pub candidates: usize,
    /// Travel time including access and egress (minutes).
    pub travel_time: Option<f64>,
    pub perceived_journey_time: Option<f64>,
    pub transfers: Option<f64>,
    /// Vehicle distance (metres).
    pub distance: Option<f64>,
    /// Schedule adaptation per traveller (minutes).
    pub adaptation_time: Option<f64>,
}

#[derive(Debug, Default)]
struct PairAccumulator {
    candidates: usize,
    demand: f64,
    adaptation: f64,
    weighted: [f64; 4],
    unweighted: [f64; 4],
}

impl PairAccumulator {
    fn add(&mut self, destination: ZoneId, candidate: &Candidate) {
        let assigned = candidate.assigned(destination);
        let values = [
            minutes_of(candidate.travel_time_with_access()),
            candidate.perceived_journey_time,
            candidate.transfer_count() as f64,
            candidate.journey().distance(),
        ];
        for (i, value) in values.into_iter().enumerate() {
            self.weighted[i] += value * assigned.demand;
            self.unweighted[i] += value;
        }
        self.candidates += 1;
        self.demand += assigned.demand;
        self.adaptation += assigned.adaptation_time;
    }

    fn finish(self, origin: ZoneId, destination: ZoneId, unroutable: f64) -> OdSkim {
        let means = if self.demand > 0.0 {
            self.weighted.map(|sum| Some(sum / self.demand))
        } else if self.candidates > 0 {
            let n = self.candidates as f64;
            self.unweighted.map(|sum| Some(sum / n))
        } else {
            [None; 4]
        };
        let adaptation_time = (self.demand > 0.0).then(|| self.adaptation / self.demand);

        OdSkim {
            origin,
            destination,
            demand: self.demand,
            unroutable,
            candidates: self.candidates,
            travel_time: means[0],
            perceived_journey_time: means[1],
            transfers: means[2],
            distance: means[3],
            adaptation_time,
        }
    }
}

/// Sink building one [`OdSkim`] per delivered OD pair.
#[derive(Debug, Default)]
pub struct SkimAggregator {
    open: HashMap<(ZoneId, ZoneId), PairAccumulator>,
    unroutable: HashMap<(ZoneId, ZoneId), f64>,
    records: Vec<OdSkim>,
    finished: bool,
}

impl SkimAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skims in delivery order.
    pub fn records(&self) -> &[OdSkim] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OdSkim> {
        self.records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn total_demand(&self) -> f64 {
        self.records.iter().map(|r| r.demand).sum()
    }

    pub fn total_unroutable(&self) -> f64 {
        self.records.iter().map(|r| r.unroutable).sum()
    }

    /// Share of all demand that could not be routed, or zero without
    /// demand.
    pub fn unroutable_share(&self) -> f64 {
        let unroutable = self.total_unroutable();
        let total = self.total_demand() + unroutable;
        if total > 0.0 { unroutable / total } else { 0.0 }
    }

    /// Returns true if the unroutable share doesn't exceed `threshold`.
    pub fn unroutable_within(&self, threshold: f64) -> bool {
        self.unroutable_share() <= threshold
    }
}

impl RouteSink for SkimAggregator {
    fn on_route(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
        candidate: &Candidate,
    ) -> Result<(), AssignmentError> {
        self.open
            .entry((origin, destination))
            .or_default()
            .add(destination, candidate);
        Ok(())
    }

    fn on_od_pair_done(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
    ) -> Result<(), AssignmentError> {
        let pair = (origin, destination);
        let accumulator = self.open.remove(&pair).unwrap_or_default();
        let unroutable = self.unroutable.remove(&pair).unwrap_or(0.0);
        self.records
            .push(accumulator.finish(origin, destination, unroutable));
        Ok(())
    }

    fn on_unroutable(&mut self, part: &UnroutableDemandPart) -> Result<(), AssignmentError> {
        *self
            .unroutable
            .entry((part.origin, part.destination))
            .or_default() += part.amount;
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), AssignmentError> {
        if !self.open.is_empty() {
            return Err(AssignmentError::Sink(format!(
                "{} OD pairs never completed",
                self.open.len()
            )));
        }
        self.finished = true;
        info!(
            pairs = self.records.len(),
            demand = self.total_demand(),
            unroutable = self.total_unroutable(),
            "skims complete"
        );
        Ok(())
    }
}
