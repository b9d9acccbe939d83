//! # Interval Granularity
//!
//! Each granularity maps a timestamp to a calendar-aligned mark:
//!
//! | interval | aliases | mark |
//! |---|---|---|
//! | `year` | `yearly`, `yr`, `annual` | December 31 of the year |
//! | `month` | `monthly`, `mon`, `mn` | last day of the month |
//! | `day` | `daily`, `dy` | start of the day |
//! | `hour` | `hourly`, `hr` | start of the hour |
//! | `minute` | `min` | start of the minute |
//!
//! Year and month marks sit at midnight of their closing day.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::IntervalError;

/// Bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    /// Calendar year.
    Year,
    /// Calendar month.
    Month,
    /// Calendar day.
    Day,
    /// Clock hour.
    Hour,
    /// Clock minute.
    Minute,
}

impl Interval {
    /// Every granularity, coarsest first.
    pub fn all() -> &'static [Interval] {
        &[Self::Year, Self::Month, Self::Day, Self::Hour, Self::Minute]
    }

    /// The canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }

    /// Accepted spellings, canonical name first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Year => &["year", "yearly", "yr", "annual"],
            Self::Month => &["month", "monthly", "mon", "mn"],
            Self::Day => &["day", "daily", "dy"],
            Self::Hour => &["hour", "hourly", "hr"],
            Self::Minute => &["minute", "min"],
        }
    }

    /// Scale applied to day offsets by [`Series::number_marks`](crate::Series::number_marks).
    /// `None` for year and month, which have absolute numeric forms.
    pub fn day_multiplier(&self) -> Option<f64> {
        match self {
            Self::Year | Self::Month => None,
            Self::Day => Some(1.0),
            Self::Hour => Some(24.0),
            Self::Minute => Some(24.0 * 60.0),
        }
    }

    /// The bucket mark for `at`.
    pub fn mark(&self, at: NaiveDateTime) -> Result<NaiveDateTime, IntervalError> {
        let date = at.date();
        let mark = match self {
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 12, 31)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            Self::Month => end_of_month(date).and_then(|d| d.and_hms_opt(0, 0, 0)),
            Self::Day => date.and_hms_opt(0, 0, 0),
            Self::Hour => date.and_hms_opt(at.hour(), 0, 0),
            Self::Minute => date.and_hms_opt(at.hour(), at.minute(), 0),
        };
        mark.ok_or(IntervalError::OutOfRange {
            interval: self.as_str(),
            at,
        })
    }
}

fn end_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    /// Case-insensitive match against every alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|i| i.aliases().contains(&lower.as_str()))
            .ok_or_else(|| IntervalError::UnknownInterval(s.to_string()))
    }
}
