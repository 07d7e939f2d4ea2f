//! Assignment configuration.
//!
//! All time terms are weighted per minute. Every field has a default, so
//! a configuration file only needs to name what it changes.

use serde::{Deserialize, Deserializer};

use crate::domain::MAX_INPUT_SECONDS;
use crate::error::AssignmentError;

/// Longest margin or slice width accepted, in minutes.
const MAX_INPUT_MINS: i64 = MAX_INPUT_SECONDS / 60;

/// Weights of a linear combination of journey time components.
///
/// The two weight sets of an [`AssignmentConfig`] have different
/// defaults, so each is read as a set of overrides on its own base.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWeights {
    pub in_vehicle: f64,
    pub access: f64,
    pub egress: f64,
    pub walk: f64,
    pub transfer_wait: f64,
    /// Fixed penalty per transfer (minutes).
    pub transfer_fixed: f64,
    /// Penalty per transfer, as a share of the travel time with access.
    pub transfer_proportional: f64,
    /// Penalty per additional intermediate stop (minutes). Ignored for
    /// the search impedance.
    pub additional_stop: f64,
}

impl TimeWeights {
    /// Default weights for the perceived journey time.
    pub fn perceived_default() -> Self {
        Self {
            in_vehicle: 1.0,
            access: 2.0,
            egress: 2.0,
            walk: 2.0,
            transfer_wait: 1.5,
            transfer_fixed: 10.0,
            transfer_proportional: 0.0,
            additional_stop: 0.5,
        }
    }

    /// Default weights for the search impedance.
    pub fn impedance_default() -> Self {
        Self {
            in_vehicle: 1.0,
            access: 1.0,
            egress: 1.0,
            walk: 1.0,
            transfer_wait: 1.0,
            transfer_fixed: 5.0,
            transfer_proportional: 0.0,
            additional_stop: 0.0,
        }
    }

    fn validate(&self, name: &str) -> Result<(), AssignmentError> {
        let values = [
            self.in_vehicle,
            self.access,
            self.egress,
            self.walk,
            self.transfer_wait,
            self.transfer_fixed,
            self.transfer_proportional,
            self.additional_stop,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AssignmentError::Configuration(format!(
                "{name} weights must be finite and non-negative"
            )));
        }
        Ok(())
    }
}

/// Weights as written in a configuration file; absent ones keep the base.
#[derive(Debug, Default, Deserialize)]
struct WeightOverrides {
    in_vehicle: Option<f64>,
    access: Option<f64>,
    egress: Option<f64>,
    walk: Option<f64>,
    transfer_wait: Option<f64>,
    transfer_fixed: Option<f64>,
    transfer_proportional: Option<f64>,
    additional_stop: Option<f64>,
}

impl WeightOverrides {
    fn apply(self, base: TimeWeights) -> TimeWeights {
        TimeWeights {
            in_vehicle: self.in_vehicle.unwrap_or(base.in_vehicle),
            access: self.access.unwrap_or(base.access),
            egress: self.egress.unwrap_or(base.egress),
            walk: self.walk.unwrap_or(base.walk),
            transfer_wait: self.transfer_wait.unwrap_or(base.transfer_wait),
            transfer_fixed: self.transfer_fixed.unwrap_or(base.transfer_fixed),
            transfer_proportional: self
                .transfer_proportional
                .unwrap_or(base.transfer_proportional),
            additional_stop: self.additional_stop.unwrap_or(base.additional_stop),
        }
    }
}

fn perceived_weights<'de, D: Deserializer<'de>>(d: D) -> Result<TimeWeights, D::Error> {
    WeightOverrides::deserialize(d).map(|o| o.apply(TimeWeights::perceived_default()))
}

fn impedance_weights<'de, D: Deserializer<'de>>(d: D) -> Result<TimeWeights, D::Error> {
    WeightOverrides::deserialize(d).map(|o| o.apply(TimeWeights::impedance_default()))
}

/// Parameters of the preselection following dominance filtering.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreselectionConfig {
    /// Candidates with an impedance above
    /// `min_impedance * beta_min_impedance + const_impedance` are dropped.
    pub beta_min_impedance: f64,
    pub const_impedance: f64,
    /// Candidates with more than `min_transfers + max_extra_transfers`
    /// transfers are dropped unless they are the fastest.
    pub max_extra_transfers: usize,
}

impl Default for PreselectionConfig {
    fn default() -> Self {
        Self {
            beta_min_impedance: 1.5,
            const_impedance: 15.0,
            max_extra_transfers: 3,
        }
    }
}

/// Utility function selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UtilityConfig {
    BoxCox { beta: f64, tau: f64 },
    Lohse { beta: f64 },
}

impl Default for UtilityConfig {
    fn default() -> Self {
        UtilityConfig::BoxCox {
            beta: 1.0,
            tau: 0.5,
        }
    }
}

/// Schedule-deviation model selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaTConfig {
    /// Deviation from the sampled departure interval.
    #[default]
    Interval,
    /// Deviation from the midpoint of the sampled departure interval.
    Midpoint,
}

/// Parameters of the discrete-choice demand split.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChoiceConfig {
    pub beta_pjt: f64,
    pub beta_delta_t_early: f64,
    pub beta_delta_t_late: f64,
    /// Only consider candidates departing near the slice.
    pub limit_to_margins: bool,
    pub margin_before_mins: i64,
    pub margin_after_mins: i64,
    pub utility: UtilityConfig,
    pub delta_t: DeltaTConfig,
}

impl Default for ChoiceConfig {
    fn default() -> Self {
        Self {
            beta_pjt: 1.0,
            beta_delta_t_early: 1.0,
            beta_delta_t_late: 1.0,
            limit_to_margins: true,
            margin_before_mins: 60,
            margin_after_mins: 60,
            utility: UtilityConfig::default(),
            delta_t: DeltaTConfig::default(),
        }
    }
}

/// Complete configuration of one assignment variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    #[serde(deserialize_with = "perceived_weights")]
    pub perceived_time: TimeWeights,
    #[serde(deserialize_with = "impedance_weights")]
    pub search_impedance: TimeWeights,
    pub preselection: PreselectionConfig,
    pub choice: ChoiceConfig,
    /// Width of the demand time slices (minutes).
    pub time_slice_mins: i64,
    /// Maximum number of transfers the path search explores.
    pub max_transfers: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            perceived_time: TimeWeights::perceived_default(),
            search_impedance: TimeWeights::impedance_default(),
            preselection: PreselectionConfig::default(),
            choice: ChoiceConfig::default(),
            time_slice_mins: 10,
            max_transfers: 4,
        }
    }
}

impl AssignmentConfig {
    /// Check the configuration for values that break assignment invariants.
    pub fn validate(&self) -> Result<(), AssignmentError> {
        self.perceived_time.validate("perceived journey time")?;
        self.search_impedance.validate("search impedance")?;

        let pre = &self.preselection;
        if !pre.beta_min_impedance.is_finite() || pre.beta_min_impedance < 1.0 {
            return Err(AssignmentError::Configuration(format!(
                "beta_min_impedance must be at least 1, got {}",
                pre.beta_min_impedance
            )));
        }
        if !pre.const_impedance.is_finite() || pre.const_impedance < 0.0 {
            return Err(AssignmentError::Configuration(format!(
                "const_impedance must not be negative, got {}",
                pre.const_impedance
            )));
        }

        let choice = &self.choice;
        for (name, beta) in [
            ("beta_pjt", choice.beta_pjt),
            ("beta_delta_t_early", choice.beta_delta_t_early),
            ("beta_delta_t_late", choice.beta_delta_t_late),
        ] {
            if !beta.is_finite() || beta < 0.0 {
                return Err(AssignmentError::Configuration(format!(
                    "{name} must be finite and non-negative, got {beta}"
                )));
            }
        }
        let margins = 0..=MAX_INPUT_MINS;
        if !margins.contains(&choice.margin_before_mins)
            || !margins.contains(&choice.margin_after_mins)
        {
            return Err(AssignmentError::Configuration(format!(
                "departure margins must be between 0 and {MAX_INPUT_MINS} minutes"
            )));
        }
        match choice.utility {
            UtilityConfig::BoxCox { beta, tau } => {
                if !beta.is_finite() || beta <= 0.0 || !tau.is_finite() {
                    return Err(AssignmentError::Configuration(format!(
                        "Box-Cox utility needs beta > 0 and finite tau, got beta {beta}, tau {tau}"
                    )));
                }
            }
            UtilityConfig::Lohse { beta } => {
                if !beta.is_finite() || beta <= 0.0 {
                    return Err(AssignmentError::Configuration(format!(
                        "Lohse utility needs beta > 0, got {beta}"
                    )));
                }
            }
        }

        if !(1..=MAX_INPUT_MINS).contains(&self.time_slice_mins) {
            return Err(AssignmentError::Configuration(format!(
                "time_slice_mins must be between 1 and {MAX_INPUT_MINS}, got {}",
                self.time_slice_mins
            )));
        }
        Ok(())
    }
}
