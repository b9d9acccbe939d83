//! # statevar-interval: Calendar-Aligned Bucketing
//!
//! Groups time-stamped observations by year, month, day, hour or minute.
//! Numeric observations in the same bucket are summed; anything else keeps
//! the value with the latest timestamp.
//!
//! ```
//! use chrono::NaiveDate;
//! use statevar_interval::{Aggregate, Interval, IntervalTracker, DEFAULT_SERIES};
//!
//! let interval: Interval = "monthly".parse().unwrap();
//! let mut tracker = IntervalTracker::single(interval);
//! let jan = |d| NaiveDate::from_ymd_opt(2023, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! tracker.add(DEFAULT_SERIES, jan(15), 10).unwrap();
//! tracker.add(DEFAULT_SERIES, jan(20), 5).unwrap();
//!
//! let series = tracker.make();
//! assert_eq!(series[0].points[0].mark, jan(31));
//! assert_eq!(series[0].points[0].value, Aggregate::Sum(15.0));
//! ```

pub mod error;
pub mod interval;
pub mod tracker;

pub use error::IntervalError;
pub use interval::Interval;
pub use tracker::{Aggregate, IntervalTracker, Point, Series, DEFAULT_SERIES};
