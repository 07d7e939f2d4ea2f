//! Choice utility functions.
//!
//! A utility function turns a candidate's impedance into an unnormalised
//! choice weight, relative to the best impedance of the sample. Every
//! implementation returns exactly 1 for the best candidate and strictly
//! less for worse ones.

use super::config::UtilityConfig;

/// Smallest impedance fed into logarithms and ratios.
const IMPEDANCE_FLOOR: f64 = 1e-6;

/// Pluggable utility function.
pub trait UtilityFunction: Send + Sync {
    fn utility(&self, impedance: f64, min_impedance: f64) -> f64;
}

/// Exponential utility of Box-Cox transformed impedances.
///
/// `u = exp(-beta * (bc(R) - bc(R_min)))` with
/// `bc(x) = (x^tau - 1) / tau`, or `ln x` when `tau` is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCox {
    pub beta: f64,
    pub tau: f64,
}

impl BoxCox {
    fn transform(&self, x: f64) -> f64 {
        let x = x.max(IMPEDANCE_FLOOR);
        if self.tau.abs() < f64::EPSILON {
            x.ln()
        } else {
            (x.powf(self.tau) - 1.0) / self.tau
        }
    }
}

impl UtilityFunction for BoxCox {
    fn utility(&self, impedance: f64, min_impedance: f64) -> f64 {
        let delta = (self.transform(impedance) - self.transform(min_impedance)).max(0.0);
        (-self.beta * delta).exp()
    }
}

/// Lohse's utility: `u = exp(-beta * (R / R_min - 1)^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lohse {
    pub beta: f64,
}

impl UtilityFunction for Lohse {
    fn utility(&self, impedance: f64, min_impedance: f64) -> f64 {
        let base = min_impedance.max(IMPEDANCE_FLOOR);
        let excess = ((impedance - min_impedance) / base).max(0.0);
        (-self.beta * excess * excess).exp()
    }
}

/// Builds the configured utility function.
pub fn build_utility(config: &UtilityConfig) -> Box<dyn UtilityFunction> {
    match *config {
        UtilityConfig::BoxCox { beta, tau } => Box::new(BoxCox { beta, tau }),
        UtilityConfig::Lohse { beta } => Box::new(Lohse { beta }),
    }
}
