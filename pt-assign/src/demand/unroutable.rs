//! Demand that could not be assigned to any candidate.

use serde::Serialize;

use crate::domain::ZoneId;

/// One OD slice's worth of demand without a usable candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnroutableDemandPart {
    pub origin: ZoneId,
    pub destination: ZoneId,
    pub slice: String,
    pub amount: f64,
}

/// Accumulator for unroutable demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnroutableDemand {
    parts: Vec<UnroutableDemandPart>,
}

impl UnroutableDemand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, origin: ZoneId, destination: ZoneId, slice: &str, amount: f64) {
        self.parts.push(UnroutableDemandPart {
            origin,
            destination,
            slice: slice.to_string(),
            amount,
        });
    }

    pub fn parts(&self) -> &[UnroutableDemandPart] {
        &self.parts
    }

    pub fn total(&self) -> f64 {
        self.parts.iter().map(|p| p.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
