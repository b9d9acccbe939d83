//! # Interval Tracker Errors

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised while configuring or feeding an
/// [`IntervalTracker`](crate::IntervalTracker).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntervalError {
    /// The granularity string matched none of the known aliases.
    #[error("unknown interval {0:?}; expected year, month, day, hour or minute")]
    UnknownInterval(String),

    /// A tracker was configured without any series.
    #[error("at least one series name is required")]
    NoSeries,

    /// A row did not supply exactly one value per series.
    #[error("lengths must agree: {given} != {expected}")]
    LengthMismatch {
        /// Number of values supplied.
        given: usize,
        /// Number of configured series.
        expected: usize,
    },

    /// A value was added to a series the tracker does not know.
    #[error("{0} is not a tracked series")]
    UnknownSeries(String),

    /// A bucket received both numeric and non-numeric values.
    #[error("series {series}: bucket {mark} mixes numeric and non-numeric values")]
    MixedKinds {
        /// Series name.
        series: String,
        /// Bucket mark.
        mark: NaiveDateTime,
    },

    /// The calendar mark for a timestamp falls outside the representable range.
    #[error("no {interval} mark exists for {at}")]
    OutOfRange {
        /// Granularity name.
        interval: &'static str,
        /// Offending timestamp.
        at: NaiveDateTime,
    },
}
