//! Time-sliced origin-destination demand.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::ZoneId;
use crate::error::AssignmentError;

/// Read-only access to an ordered set of time-sliced OD matrices.
///
/// Implementations are shared by every worker thread.
pub trait DemandMatrices {
    /// Demand from `origin` to `destination` in the named time slice.
    /// Unknown pairs and slices have zero demand.
    fn value(&self, origin: ZoneId, destination: ZoneId, slice: &str) -> f64;

    /// Slice names in chronological order.
    fn time_slice_names(&self) -> &[String];

    /// Returns true if any slice has positive demand for the pair.
    fn has_demand(&self, origin: ZoneId, destination: ZoneId) -> bool {
        self.time_slice_names()
            .iter()
            .any(|slice| self.value(origin, destination, slice) > 0.0)
    }
}

/// One cell of a demand matrix, as found in input files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemandRecord {
    pub origin: ZoneId,
    pub destination: ZoneId,
    pub slice: String,
    pub value: f64,
}

/// In-memory demand matrices keyed by OD pair.
#[derive(Debug, Clone, Default)]
pub struct DemandTable {
    slices: Vec<String>,
    slice_index: HashMap<String, usize>,
    values: HashMap<(ZoneId, ZoneId), Vec<f64>>,
}

impl DemandTable {
    /// Create an empty table with the given slices.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a slice name appears twice.
    pub fn new(slices: impl IntoIterator<Item = String>) -> Result<Self, AssignmentError> {
        let slices: Vec<String> = slices.into_iter().collect();
        let mut slice_index = HashMap::with_capacity(slices.len());
        for (i, name) in slices.iter().enumerate() {
            if slice_index.insert(name.clone(), i).is_some() {
                return Err(AssignmentError::Configuration(format!(
                    "duplicate time slice {name}"
                )));
            }
        }
        Ok(Self {
            slices,
            slice_index,
            values: HashMap::new(),
        })
    }

    /// Build a table from slices and records. Records for the same cell
    /// are summed.
    pub fn from_records(
        slices: impl IntoIterator<Item = String>,
        records: impl IntoIterator<Item = DemandRecord>,
    ) -> Result<Self, AssignmentError> {
        let mut table = Self::new(slices)?;
        for record in records {
            let current = table.value(record.origin, record.destination, &record.slice);
            table.set(
                record.origin,
                record.destination,
                &record.slice,
                current + record.value,
            )?;
        }
        Ok(table)
    }

    /// Set one cell.
    ///
    /// # Errors
    ///
    /// Returns `Err` for unknown slices and for negative or non-finite values.
    pub fn set(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
        slice: &str,
        value: f64,
    ) -> Result<(), AssignmentError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AssignmentError::Configuration(format!(
                "invalid demand {value} for {origin} -> {destination} in slice {slice}"
            )));
        }
        let idx = *self.slice_index.get(slice).ok_or_else(|| {
            AssignmentError::Configuration(format!("unknown time slice {slice}"))
        })?;
        let slots = self.slices.len();
        self.values
            .entry((origin, destination))
            .or_insert_with(|| vec![0.0; slots])[idx] = value;
        Ok(())
    }

    /// Returns a copy with every value multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        for row in scaled.values.values_mut() {
            for v in row.iter_mut() {
                *v *= factor;
            }
        }
        scaled
    }

    /// Sum over all cells.
    pub fn total(&self) -> f64 {
        self.values.values().flatten().sum()
    }
}

impl DemandMatrices for DemandTable {
    fn value(&self, origin: ZoneId, destination: ZoneId, slice: &str) -> f64 {
        let Some(idx) = self.slice_index.get(slice) else {
            return 0.0;
        };
        self.values
            .get(&(origin, destination))
            .map_or(0.0, |row| row[*idx])
    }

    fn time_slice_names(&self) -> &[String] {
        &self.slices
    }
}
