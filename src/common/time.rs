//! Time units used when reporting evaluation durations.
//!
//! Evaluation times are recorded in nanoseconds.

use std::fmt;
use std::str::FromStr;

use super::error::EvalError;

/// Unit a nanosecond duration can be reported in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimeUnit {
    Nanos,
    Millis,
    Seconds,
}

impl TimeUnit {
    /// Convert a nanosecond value into this unit.
    pub fn from_nanos(self, nanos: f64) -> f64 {
        match self {
            TimeUnit::Nanos => nanos,
            TimeUnit::Millis => nanos / 1_000_000.0,
            TimeUnit::Seconds => nanos / 1_000_000_000.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" => Ok(TimeUnit::Nanos),
            "ms" => Ok(TimeUnit::Millis),
            "s" => Ok(TimeUnit::Seconds),
            other => Err(EvalError::invalid(format!(
                "invalid unit {other}, must be 'ns', 'ms' or 's'"
            ))),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Nanos => "ns",
            TimeUnit::Millis => "ms",
            TimeUnit::Seconds => "s",
        })
    }
}
