//! Dominance filtering and preselection of candidates.
//!
//! Both run per destination zone, after the characteristics are known.

use std::cmp::Ordering;

use super::config::PreselectionConfig;
use crate::domain::Candidate;

/// Sort by departure, then latest arrival first, then fewest transfers.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.departure()
            .cmp(&b.departure())
            .then_with(|| b.arrival().cmp(&a.arrival()))
            .then_with(|| a.transfer_count().cmp(&b.transfer_count()))
    });
}

/// Returns true if `b` dominates `a`.
///
/// `b` must lie within `a`'s departure/arrival interval, have no more
/// transfers and no higher impedance, and be strictly better in at least
/// one of those.
fn dominates(b: &Candidate, a: &Candidate) -> bool {
    let within = b.departure() >= a.departure() && b.arrival() <= a.arrival();
    let fewer_or_equal = b.transfer_count() <= a.transfer_count();
    let cheaper_or_equal = b.search_impedance <= a.search_impedance;
    if !(within && fewer_or_equal && cheaper_or_equal) {
        return false;
    }

    let strictly_within = b.departure() > a.departure() || b.arrival() < a.arrival();
    strictly_within
        || b.transfer_count() < a.transfer_count()
        || b.search_impedance < a.search_impedance
}

/// Remove dominated candidates.
///
/// The result is sorted with [`sort_candidates`]. Direct candidates are
/// never removed.
pub fn remove_dominated(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    sort_candidates(&mut candidates);
    if candidates.len() <= 1 {
        return candidates;
    }

    let mut keep = vec![true; candidates.len()];
    let mut group_start = 0;

    for i in 0..candidates.len() {
        let a = &candidates[i];
        if a.departure() != candidates[group_start].departure() {
            group_start = i;
        }
        if a.transfer_count() == 0 {
            continue;
        }

        // Candidates departing with `a` may sort before it
        for (j, b) in candidates.iter().enumerate().skip(group_start) {
            if b.departure() > a.arrival() {
                break;
            }
            if j != i && dominates(b, a) {
                keep[i] = false;
                break;
            }
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect()
}

/// Drop candidates that are implausible next to the best alternative.
///
/// A candidate is dropped if its impedance exceeds
/// `min_impedance * beta_min_impedance + const_impedance`, or if it has
/// more than `max_extra_transfers` transfers beyond the minimum while not
/// being the fastest.
pub fn preselect(candidates: Vec<Candidate>, config: &PreselectionConfig) -> Vec<Candidate> {
    let Some(min_transfers) = candidates.iter().map(Candidate::transfer_count).min() else {
        return candidates;
    };
    let min_impedance = candidates
        .iter()
        .map(|c| c.search_impedance)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);
    let min_travel_time = candidates
        .iter()
        .map(Candidate::travel_time_with_access)
        .min()
        .unwrap_or_default();

    let max_impedance = min_impedance * config.beta_min_impedance + config.const_impedance;
    let max_transfers = min_transfers + config.max_extra_transfers;

    candidates
        .into_iter()
        .filter(|c| {
            let too_costly = c.search_impedance > max_impedance;
            let too_many_transfers = c.transfer_count() > max_transfers
                && c.travel_time_with_access() > min_travel_time;
            !(too_costly || too_many_transfers)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConnectedStop, LineId, Ride, RouteId, Segment, ServiceTime, StopId, StopToStopJourney,
        Transfer, TripId, ZoneId,
    };
    use chrono::Duration;
    use std::sync::Arc;

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse_hhmm(s).unwrap()
    }

    /// A candidate from stop 1 to stop 9 with `transfers` changes spread
    /// evenly over `[dep, arr]`.
    pub(super) fn make_candidate(
        dep: ServiceTime,
        arr: ServiceTime,
        transfers: usize,
        impedance: f64,
    ) -> Candidate {
        let rides = transfers + 1;
        let step = (arr - dep).num_seconds() / rides as i64;
        let mut segments = Vec::new();
        let mut at = dep;
        for r in 0..rides {
            let from = if r == 0 { 1 } else { 100 + r as u32 };
            let to = if r + 1 == rides { 9 } else { 101 + r as u32 };
            let end = if r + 1 == rides {
                arr
            } else {
                at + Duration::seconds(step)
            };
            if r > 0 {
                segments.push(Segment::Transfer(Transfer {
                    from: StopId(from),
                    to: StopId(from),
                    departure: at,
                    arrival: at,
                }));
            }
            segments.push(Segment::Ride(Ride {
                trip: TripId(r as u32),
                line: LineId(r as u32),
                route: RouteId(r as u32),
                from: StopId(from),
                to: StopId(to),
                departure: at,
                arrival: end,
                distance: 0.0,
                additional_stops: 0,
            }));
            at = end;
        }

        let mut c = Candidate::new(
            Arc::new(StopToStopJourney::new(segments).unwrap()),
            ConnectedStop::new(ZoneId(1), StopId(1), Duration::zero()),
            ConnectedStop::new(ZoneId(2), StopId(9), Duration::zero()),
        );
        c.search_impedance = impedance;
        c
    }

    #[test]
    fn sorts_by_departure_then_latest_arrival() {
        let mut candidates = vec![
            make_candidate(t("07:10"), t("07:40"), 0, 30.0),
            make_candidate(t("07:00"), t("07:30"), 1, 30.0),
            make_candidate(t("07:00"), t("07:50"), 0, 50.0),
            make_candidate(t("07:00"), t("07:30"), 0, 30.0),
        ];
        sort_candidates(&mut candidates);

        let keys: Vec<_> = candidates
            .iter()
            .map(|c| (c.departure(), c.arrival(), c.transfer_count()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (t("07:00"), t("07:50"), 0),
                (t("07:00"), t("07:30"), 0),
                (t("07:00"), t("07:30"), 1),
                (t("07:10"), t("07:40"), 0),
            ]
        );
    }

    #[test]
    fn contained_journey_dominates() {
        let candidates = vec![
            make_candidate(t("07:00"), t("08:00"), 1, 60.0),
            make_candidate(t("07:10"), t("07:50"), 1, 40.0),
        ];
        let result = remove_dominated(candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].departure(), t("07:10"));
    }

    #[test]
    fn higher_impedance_twin_is_removed() {
        let candidates = vec![
            make_candidate(t("07:00"), t("07:40"), 1, 45.0),
            make_candidate(t("07:00"), t("07:40"), 1, 40.0),
        ];
        let result = remove_dominated(candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].search_impedance, 40.0);
    }

    #[test]
    fn identical_candidates_both_survive() {
        let candidates = vec![
            make_candidate(t("07:00"), t("07:40"), 1, 40.0),
            make_candidate(t("07:00"), t("07:40"), 1, 40.0),
        ];
        assert_eq!(remove_dominated(candidates).len(), 2);
    }

    #[test]
    fn fewer_transfers_dominate_at_equal_times() {
        let candidates = vec![
            make_candidate(t("07:00"), t("07:40"), 2, 40.0),
            make_candidate(t("07:00"), t("07:40"), 1, 40.0),
        ];
        let result = remove_dominated(candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].transfer_count(), 1);
    }

    #[test]
    fn cheaper_but_longer_is_not_dominated() {
        // The shorter journey costs more, so neither dominates
        let candidates = vec![
            make_candidate(t("07:00"), t("08:00"), 1, 50.0),
            make_candidate(t("07:10"), t("07:50"), 1, 55.0),
        ];
        assert_eq!(remove_dominated(candidates).len(), 2);
    }

    #[test]
    fn later_departures_outside_interval_are_ignored() {
        let candidates = vec![
            make_candidate(t("07:00"), t("07:30"), 1, 30.0),
            make_candidate(t("07:40"), t("07:50"), 0, 10.0),
        ];
        assert_eq!(remove_dominated(candidates).len(), 2);
    }

    #[test]
    fn direct_candidate_is_never_removed() {
        let candidates = vec![
            make_candidate(t("07:00"), t("08:00"), 0, 90.0),
            make_candidate(t("07:10"), t("07:20"), 0, 10.0),
        ];
        assert_eq!(remove_dominated(candidates).len(), 2);
    }

    #[test]
    fn preselection_drops_costly_candidates() {
        let config = PreselectionConfig {
            beta_min_impedance: 1.5,
            const_impedance: 10.0,
            max_extra_transfers: 3,
        };
        let candidates = vec![
            make_candidate(t("07:00"), t("07:30"), 0, 30.0),
            make_candidate(t("08:00"), t("08:30"), 0, 55.0),
            make_candidate(t("09:00"), t("09:30"), 0, 56.0),
        ];
        let result = preselect(candidates, &config);
        // 30 * 1.5 + 10 = 55
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.search_impedance <= 55.0));
    }

    #[test]
    fn preselection_drops_slow_candidates_with_many_transfers() {
        let config = PreselectionConfig {
            beta_min_impedance: 100.0,
            const_impedance: 100.0,
            max_extra_transfers: 1,
        };
        let candidates = vec![
            make_candidate(t("07:00"), t("07:40"), 0, 40.0),
            // Too many transfers and slower than the fastest
            make_candidate(t("08:00"), t("08:50"), 2, 50.0),
            // Too many transfers but as fast as the fastest
            make_candidate(t("09:00"), t("09:40"), 2, 40.0),
        ];
        let result = preselect(candidates, &config);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.departure() != t("08:00")));
    }

    #[test]
    fn preselection_of_empty_list() {
        assert!(preselect(Vec::new(), &PreselectionConfig::default()).is_empty());
    }
}
