//! Originality weighting.
//!
//! Candidates that look identical to the traveller (same departure,
//! arrival, impedance and transfers) share one choice between them.

use crate::domain::Candidate;

fn same_choice(a: &Candidate, b: &Candidate) -> bool {
    a.departure() == b.departure()
        && a.arrival() == b.arrival()
        && a.search_impedance == b.search_impedance
        && a.transfer_count() == b.transfer_count()
}

/// Set `originality = 1 / k` for every group of `k` equal candidates.
///
/// `candidates` must be sorted by departure.
pub fn apply_originality(candidates: &mut [Candidate]) {
    let mut counts = vec![1usize; candidates.len()];

    for (i, count) in counts.iter_mut().enumerate() {
        let c = &candidates[i];
        for other in candidates[..i].iter().rev() {
            if other.departure() != c.departure() {
                break;
            }
            if same_choice(other, c) {
                *count += 1;
            }
        }
        for other in &candidates[i + 1..] {
            if other.departure() != c.departure() {
                break;
            }
            if same_choice(other, c) {
                *count += 1;
            }
        }
    }

    for (candidate, count) in candidates.iter_mut().zip(counts) {
        candidate.originality = 1.0 / count as f64;
    }
}
