//! Scenario files.
//!
//! A scenario is a single JSON document with everything a run needs:
//! zones, their connected stops, the timetable, the demand matrices, and
//! the assignment variants.

use std::path::Path;

use serde::Deserialize;

use crate::assignment::{AssignmentConfig, AssignmentVariant};
use crate::demand::{DemandRecord, DemandTable};
use crate::domain::{ConnectedStop, Zone, ZoneId, ZoneNetwork};
use crate::error::AssignmentError;
use crate::pipeline::PipelineConfig;
use crate::timetable::{Timetable, TimetableData};

fn default_unroutable_warning_share() -> f64 {
    0.05
}

/// Time-sliced demand as stored in a scenario.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemandData {
    /// Slice names (`HH:MM` start times) in chronological order.
    pub slices: Vec<String>,
    #[serde(default)]
    pub records: Vec<DemandRecord>,
}

/// A named assignment configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantData {
    pub name: String,
    #[serde(default)]
    pub config: AssignmentConfig,
}

/// Contents of a scenario file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    pub zones: Vec<Zone>,
    pub connected_stops: Vec<ConnectedStop>,
    pub timetable: TimetableData,
    pub demand: DemandData,
    /// Defaults to a single variant with the default configuration.
    #[serde(default)]
    pub variants: Vec<VariantData>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Origins to process; all zones if absent.
    #[serde(default)]
    pub origins: Option<Vec<ZoneId>>,
    /// Destinations to assign to; all zones if absent.
    #[serde(default)]
    pub destinations: Option<Vec<ZoneId>>,
    /// Unroutable share above which a run is reported as suspicious.
    #[serde(default = "default_unroutable_warning_share")]
    pub unroutable_warning_share: f64,
}

impl Scenario {
    /// Reads a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssignmentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AssignmentError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, AssignmentError> {
        serde_json::from_str(json)
            .map_err(|e| AssignmentError::Configuration(format!("invalid scenario: {}", e)))
    }

    /// Builds the zone network.
    pub fn network(&self) -> Result<ZoneNetwork, AssignmentError> {
        ZoneNetwork::new(self.zones.iter().cloned(), self.connected_stops.iter().cloned())
            .map_err(|e| AssignmentError::Configuration(format!("invalid zone network: {}", e)))
    }

    pub fn demand_table(&self) -> Result<DemandTable, AssignmentError> {
        DemandTable::from_records(
            self.demand.slices.iter().cloned(),
            self.demand.records.iter().cloned(),
        )
    }

    pub fn build_timetable(&self) -> Result<Timetable, AssignmentError> {
        Timetable::new(self.timetable.clone())
    }

    /// Builds the assignment variants, validating their configurations.
    pub fn build_variants(&self) -> Result<Vec<AssignmentVariant>, AssignmentError> {
        if self.variants.is_empty() {
            return Ok(vec![AssignmentVariant::new(
                "default",
                AssignmentConfig::default(),
            )?]);
        }
        self.variants
            .iter()
            .map(|v| AssignmentVariant::new(v.name.clone(), v.config.clone()))
            .collect()
    }

    /// Slice width shared by all variants.
    pub fn time_slice_mins(&self) -> i64 {
        self.variants
            .first()
            .map_or(AssignmentConfig::default().time_slice_mins, |v| {
                v.config.time_slice_mins
            })
    }

    /// Largest number of transfers any variant searches for.
    pub fn max_transfers(&self) -> usize {
        self.variants
            .iter()
            .map(|v| v.config.max_transfers)
            .max()
            .unwrap_or(AssignmentConfig::default().max_transfers)
    }
}
