//! Mapping between time-slice names and time windows.
//!
//! A slice is named after its start time (`"07:10"`) and covers a fixed
//! width from there.

use chrono::Duration;

use crate::domain::{MAX_INPUT_SECONDS, ServiceTime};
use crate::error::AssignmentError;

/// A resolved time slice `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlice {
    pub name: String,
    pub start: ServiceTime,
    pub end: ServiceTime,
}

impl TimeSlice {
    pub fn width(&self) -> Duration {
        self.end - self.start
    }
}

/// Fixed-width slicing of the service day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlicing {
    width: Duration,
}

impl TimeSlicing {
    /// Slicing with the given width in minutes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the width is not positive or longer than two
    /// service days.
    pub fn new(width_mins: i64) -> Result<Self, AssignmentError> {
        if width_mins <= 0 || width_mins > MAX_INPUT_SECONDS / 60 {
            return Err(AssignmentError::Configuration(format!(
                "time slice width must be between 1 and {} minutes, got {width_mins}",
                MAX_INPUT_SECONDS / 60
            )));
        }
        Ok(Self {
            width: Duration::minutes(width_mins),
        })
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Resolve a slice name into its window.
    pub fn resolve(&self, name: &str) -> Result<TimeSlice, AssignmentError> {
        let start = ServiceTime::parse_hhmm(name).map_err(|e| {
            AssignmentError::Configuration(format!("time slice name {name:?}: {e}"))
        })?;
        Ok(TimeSlice {
            name: name.to_string(),
            start,
            end: start + self.width,
        })
    }

}
