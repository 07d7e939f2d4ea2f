//! Time-sampled discrete-choice demand split.
//!
//! Each demand slice is sampled minute by minute. At every sample the
//! slice's share of demand is split between the candidates according to
//! their utilities, so candidates departing close to the sample attract
//! more of it than those that force the traveller to adapt.

use chrono::Duration;
use tracing::trace;

use super::config::ChoiceConfig;
use super::delta_t::DeltaTCalculator;
use super::utility::UtilityFunction;
use crate::demand::{DemandMatrices, TimeSlice, TimeSlicing, UnroutableDemand};
use crate::domain::{Candidate, ZoneId};
use crate::error::AssignmentError;

/// Sampling step within a slice, in seconds.
const SAMPLE_STEP_SECS: i64 = 60;

/// Splits OD demand between candidates.
pub struct DemandSplitter<'a> {
    choice: &'a ChoiceConfig,
    utility: &'a dyn UtilityFunction,
    delta_t: &'a dyn DeltaTCalculator,
}

impl<'a> DemandSplitter<'a> {
    pub fn new(
        choice: &'a ChoiceConfig,
        utility: &'a dyn UtilityFunction,
        delta_t: &'a dyn DeltaTCalculator,
    ) -> Self {
        Self {
            choice,
            utility,
            delta_t,
        }
    }

    /// Assigns every slice of demand from `origin` to `destination` onto
    /// `candidates`. Slices without an eligible candidate are recorded in
    /// `unroutable`.
    pub fn assign(
        &self,
        origin: ZoneId,
        destination: ZoneId,
        candidates: &mut [Candidate],
        demand: &dyn DemandMatrices,
        slicing: &TimeSlicing,
        unroutable: &mut UnroutableDemand,
    ) -> Result<(), AssignmentError> {
        for name in demand.time_slice_names() {
            let od = demand.value(origin, destination, name);
            if od <= 0.0 {
                continue;
            }
            let slice = slicing.resolve(name)?;

            let eligible = self.eligible(candidates, &slice);
            if eligible.is_empty() {
                trace!(
                    origin = %origin,
                    destination = %destination,
                    slice = %name,
                    demand = od,
                    "no candidate for slice"
                );
                unroutable.add(origin, destination, name, od);
                continue;
            }

            self.assign_slice(origin, destination, candidates, &eligible, &slice, od)?;
        }
        Ok(())
    }

    /// Indices of candidates departing within the slice's margins.
    fn eligible(&self, candidates: &[Candidate], slice: &TimeSlice) -> Vec<usize> {
        if !self.choice.limit_to_margins {
            return (0..candidates.len()).collect();
        }
        let from = slice.start - Duration::minutes(self.choice.margin_before_mins);
        let to = slice.end + Duration::minutes(self.choice.margin_after_mins);
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                let departure = c.access_departure();
                departure >= from && departure <= to
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn assign_slice(
        &self,
        origin: ZoneId,
        destination: ZoneId,
        candidates: &mut [Candidate],
        eligible: &[usize],
        slice: &TimeSlice,
        od: f64,
    ) -> Result<(), AssignmentError> {
        let samples = (slice.width().num_seconds() / SAMPLE_STEP_SECS).max(1);
        let per_sample = od / samples as f64;

        // (early, late, impedance) per eligible candidate
        let mut scratch = Vec::with_capacity(eligible.len());
        let mut utilities = Vec::with_capacity(eligible.len());

        for i in 0..samples {
            let start = slice.start + Duration::seconds(SAMPLE_STEP_SECS * i);
            let end = start + Duration::seconds(SAMPLE_STEP_SECS);

            scratch.clear();
            let mut min_impedance = f64::INFINITY;
            for &idx in eligible {
                let candidate = &candidates[idx];
                let departure = candidate.access_departure();
                let early = self.delta_t.early(departure, start, end);
                let late = self.delta_t.late(departure, start, end);
                let impedance = self.choice.beta_pjt * candidate.perceived_journey_time
                    + self.choice.beta_delta_t_early * early / 60.0
                    + self.choice.beta_delta_t_late * late / 60.0;
                if !impedance.is_finite() {
                    return Err(non_finite(origin, destination, slice));
                }
                min_impedance = min_impedance.min(impedance);
                scratch.push((early, late, impedance));
            }

            utilities.clear();
            let mut total = 0.0;
            for (&idx, &(_, _, impedance)) in eligible.iter().zip(&scratch) {
                let u =
                    self.utility.utility(impedance, min_impedance) * candidates[idx].originality;
                if !u.is_finite() {
                    return Err(non_finite(origin, destination, slice));
                }
                total += u;
                utilities.push(u);
            }
            if !total.is_finite() || total <= 0.0 {
                return Err(non_finite(origin, destination, slice));
            }

            let shares = eligible.iter().zip(&scratch).zip(&utilities);
            for ((&idx, &(early, late, _)), u) in shares {
                let increment = u / total * per_sample;
                let adaptation = (early + late).abs() / 60.0;
                candidates[idx].add_demand(destination, increment, adaptation);
            }
        }
        Ok(())
    }
}

fn non_finite(origin: ZoneId, destination: ZoneId, slice: &TimeSlice) -> AssignmentError {
    AssignmentError::NonFiniteUtility {
        origin,
        destination,
        slice: slice.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::delta_t::IntervalDeltaT;
    use crate::assignment::utility::BoxCox;
    use crate::demand::DemandTable;
    use crate::domain::{
        ConnectedStop, LineId, Ride, RouteId, Segment, ServiceTime, StopId, StopToStopJourney,
        TripId,
    };
    use std::sync::Arc;

    const O: ZoneId = ZoneId(1);
    const D: ZoneId = ZoneId(2);

    fn candidate(dep: ServiceTime, minutes: i64, pjt: f64) -> Candidate {
        let journey = StopToStopJourney::new(vec![Segment::Ride(Ride {
            trip: TripId(1),
            line: LineId(1),
            route: RouteId(1),
            from: StopId(1),
            to: StopId(2),
            departure: dep,
            arrival: dep + Duration::minutes(minutes),
            distance: 0.0,
            additional_stops: 0,
        })])
        .unwrap();
        let mut c = Candidate::new(
            Arc::new(journey),
            ConnectedStop::new(O, StopId(1), Duration::zero()),
            ConnectedStop::new(D, StopId(2), Duration::zero()),
        );
        c.perceived_journey_time = pjt;
        c
    }

    fn demand(slice: &str, value: f64) -> DemandTable {
        let mut table = DemandTable::new(["07:00".to_string(), "07:10".to_string()]).unwrap();
        table.set(O, D, slice, value).unwrap();
        table
    }

    fn assigned_total(candidates: &[Candidate]) -> f64 {
        candidates.iter().map(|c| c.assigned(D).demand).sum()
    }

    #[test]
    fn single_candidate_takes_everything() {
        let choice = ChoiceConfig::default();
        let utility = BoxCox { beta: 1.0, tau: 0.5 };
        let splitter = DemandSplitter::new(&choice, &utility, &IntervalDeltaT);
        let mut candidates = vec![candidate(ServiceTime::from_hm(7, 5), 20, 20.0)];
        let mut unroutable = UnroutableDemand::new();

        splitter
            .assign(
                O,
                D,
                &mut candidates,
                &demand("07:00", 10.0),
                &TimeSlicing::new(10).unwrap(),
                &mut unroutable,
            )
            .unwrap();

        assert!((assigned_total(&candidates) - 10.0).abs() < 1e-9);
        assert!(unroutable.is_empty());
        // Samples 07:00..07:03 wait 4..1 min, 07:06..07:09 leave 1..4 min early
        let adaptation = candidates[0].assigned(D).adaptation_time;
        assert!((adaptation - 20.0).abs() < 1e-9);
    }

    #[test]
    fn closer_departures_attract_more_demand() {
        let choice = ChoiceConfig::default();
        let utility = BoxCox { beta: 1.0, tau: 0.5 };
        let splitter = DemandSplitter::new(&choice, &utility, &IntervalDeltaT);
        let mut candidates = vec![
            candidate(ServiceTime::from_hm(7, 5), 20, 20.0),
            candidate(ServiceTime::from_hm(7, 50), 20, 20.0),
        ];
        let mut unroutable = UnroutableDemand::new();

        splitter
            .assign(
                O,
                D,
                &mut candidates,
                &demand("07:00", 10.0),
                &TimeSlicing::new(10).unwrap(),
                &mut unroutable,
            )
            .unwrap();

        assert!((assigned_total(&candidates) - 10.0).abs() < 1e-9);
        assert!(candidates[0].assigned(D).demand > candidates[1].assigned(D).demand);
    }

    #[test]
    fn slice_without_candidates_is_unroutable_once() {
        let choice = ChoiceConfig::default();
        let utility = BoxCox { beta: 1.0, tau: 0.5 };
        let splitter = DemandSplitter::new(&choice, &utility, &IntervalDeltaT);
        // Departs far outside the 60 minute margins
        let mut candidates = vec![candidate(ServiceTime::from_hm(12, 0), 20, 20.0)];
        let mut unroutable = UnroutableDemand::new();

        splitter
            .assign(
                O,
                D,
                &mut candidates,
                &demand("07:10", 4.0),
                &TimeSlicing::new(10).unwrap(),
                &mut unroutable,
            )
            .unwrap();

        assert_eq!(unroutable.parts().len(), 1);
        let part = &unroutable.parts()[0];
        assert_eq!((part.origin, part.destination), (O, D));
        assert_eq!(part.slice, "07:10");
        assert_eq!(part.amount, 4.0);
        assert_eq!(assigned_total(&candidates), 0.0);
    }

    #[test]
    fn margins_can_be_disabled() {
        let choice = ChoiceConfig {
            limit_to_margins: false,
            ..ChoiceConfig::default()
        };
        let utility = BoxCox { beta: 1.0, tau: 0.5 };
        let splitter = DemandSplitter::new(&choice, &utility, &IntervalDeltaT);
        let mut candidates = vec![candidate(ServiceTime::from_hm(12, 0), 20, 20.0)];
        let mut unroutable = UnroutableDemand::new();

        splitter
            .assign(
                O,
                D,
                &mut candidates,
                &demand("07:10", 4.0),
                &TimeSlicing::new(10).unwrap(),
                &mut unroutable,
            )
            .unwrap();

        assert!(unroutable.is_empty());
        assert!((assigned_total(&candidates) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn nan_impedance_is_an_error() {
        let choice = ChoiceConfig::default();
        let utility = BoxCox { beta: 1.0, tau: 0.5 };
        let splitter = DemandSplitter::new(&choice, &utility, &IntervalDeltaT);
        let mut candidates = vec![candidate(ServiceTime::from_hm(7, 5), 20, f64::NAN)];
        let mut unroutable = UnroutableDemand::new();

        let err = splitter
            .assign(
                O,
                D,
                &mut candidates,
                &demand("07:00", 1.0),
                &TimeSlicing::new(10).unwrap(),
                &mut unroutable,
            )
            .unwrap_err();
        assert!(matches!(err, AssignmentError::NonFiniteUtility { .. }));
    }
}
