//! Service-day time handling.
//!
//! Timetables express times relative to the midnight that starts the
//! service day. Trips running past midnight keep counting, so "25:10" is a
//! valid time meaning ten past one on the following calendar day.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::Duration;
use serde::Deserialize;

/// Latest hour accepted by the parser (two full service days).
const MAX_HOUR: u32 = 47;

/// Longest duration accepted from input data, in seconds. Keeps all time
/// arithmetic on parsed times far from overflow.
pub const MAX_INPUT_SECONDS: i64 = 48 * 3600;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of the service day, in whole seconds past its starting midnight.
///
/// # Examples
///
/// ```
/// use pt_assign::domain::ServiceTime;
///
/// let t = ServiceTime::parse_hhmm("07:30").unwrap();
/// assert_eq!(t.seconds(), 7 * 3600 + 30 * 60);
/// assert_eq!(t.to_string(), "07:30:00");
///
/// // Past midnight stays on the same service day
/// let late = ServiceTime::parse_hhmm("25:05").unwrap();
/// assert!(late > t);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ServiceTime(i32);

impl ServiceTime {
    /// Service-day midnight.
    pub const MIDNIGHT: ServiceTime = ServiceTime(0);

    /// Create a time from seconds past midnight.
    pub const fn from_seconds(seconds: i32) -> Self {
        Self(seconds)
    }

    /// Create a time from hours and minutes past midnight.
    pub const fn from_hm(hours: i32, minutes: i32) -> Self {
        Self(hours * 3600 + minutes * 60)
    }

    /// Parse `HH:MM` or `HH:MM:SS`.
    ///
    /// ```
    /// use pt_assign::domain::ServiceTime;
    ///
    /// assert!(ServiceTime::parse_hhmm("00:00").is_ok());
    /// assert!(ServiceTime::parse_hhmm("26:15:30").is_ok());
    ///
    /// assert!(ServiceTime::parse_hhmm("0730").is_err());
    /// assert!(ServiceTime::parse_hhmm("07:60").is_err());
    /// assert!(ServiceTime::parse_hhmm("48:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 && bytes.len() != 8 {
            return Err(TimeError::new("expected HH:MM or HH:MM:SS format"));
        }
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > MAX_HOUR {
            return Err(TimeError::new("hour must be 0-47"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = if bytes.len() == 8 {
            if bytes[5] != b':' {
                return Err(TimeError::new("expected colon at position 5"));
            }
            let second = parse_two_digits(&bytes[6..8])
                .ok_or_else(|| TimeError::new("invalid second digits"))?;
            if second > 59 {
                return Err(TimeError::new("second must be 0-59"));
            }
            second
        } else {
            0
        };

        Ok(Self((hour * 3600 + minute * 60 + second) as i32))
    }

    /// Seconds past service-day midnight.
    pub fn seconds(&self) -> i32 {
        self.0
    }

    /// Minutes past service-day midnight, fractional.
    pub fn minutes(&self) -> f64 {
        f64::from(self.0) / 60.0
    }

    /// Returns the duration between two times.
    ///
    /// Returns a negative duration if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        Duration::seconds(i64::from(self.0) - i64::from(other.0))
    }

    /// Add a duration, returning `None` on overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let seconds = i32::try_from(duration.num_seconds()).ok()?;
        self.0.checked_add(seconds).map(Self)
    }

    /// Subtract a duration, returning `None` on overflow.
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        let seconds = i32::try_from(duration.num_seconds()).ok()?;
        self.0.checked_sub(seconds).map(Self)
    }
}

impl Add<Duration> for ServiceTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.checked_add(rhs).expect("service time overflow")
    }
}

impl Sub<Duration> for ServiceTime {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        self.checked_sub(rhs).expect("service time overflow")
    }
}

impl Sub for ServiceTime {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.signed_duration_since(rhs)
    }
}

impl TryFrom<String> for ServiceTime {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hhmm(&value)
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceTime({self})")
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let total = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{:02}:{:02}:{:02}",
            total / 3600,
            (total / 60) % 60,
            total % 60
        )
    }
}

/// Duration in fractional minutes.
pub fn minutes_of(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 60.0
}

fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return None;
    }
    Some(u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0'))
}
