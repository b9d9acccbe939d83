//! # Interval Tracker
//!
//! Accumulates `(timestamp, value)` observations per named series into
//! buckets keyed by an [`Interval`] mark.
//!
//! A bucket is either a running sum or a latest-wins slot, decided by the
//! first value it receives:
//!
//! - Numeric values (ints, floats, bools, numeric strings) are summed as
//!   `f64`.
//! - Anything else keeps the value with the latest timestamp. Equal
//!   timestamps keep the earlier arrival.
//!
//! [`IntervalTracker::make`] finalizes the buckets into time-ascending
//! [`Series`].

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use statevar_core::Value;

use crate::error::IntervalError;
use crate::interval::Interval;

/// Series name used by [`IntervalTracker::single`].
pub const DEFAULT_SERIES: &str = "value";

const SECONDS_PER_DAY: f64 = 86_400.0;

// ─── Aggregates ──────────────────────────────────────────────────────

/// The finalized value of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Aggregate {
    /// Sum of numeric observations.
    Sum(f64),
    /// Latest non-numeric observation.
    Latest(Value),
}

impl Aggregate {
    /// The sum, for numeric buckets.
    pub fn as_sum(&self) -> Option<f64> {
        match self {
            Self::Sum(total) => Some(*total),
            Self::Latest(_) => None,
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum(total) => write!(f, "{total}"),
            Self::Latest(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    aggregate: Aggregate,
    latest: NaiveDateTime,
    count: usize,
}

// ─── Series ──────────────────────────────────────────────────────────

/// One finalized bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// Bucket mark.
    pub mark: NaiveDateTime,
    /// Aggregated value.
    pub value: Aggregate,
    /// Number of observations folded into the bucket.
    pub count: usize,
}

/// A finalized, time-ascending series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Series name.
    pub name: String,
    /// Granularity the marks were built with.
    pub interval: Interval,
    /// Buckets, earliest mark first.
    pub points: Vec<Point>,
}

impl Series {
    /// Bucket marks, earliest first.
    pub fn marks(&self) -> Vec<NaiveDateTime> {
        self.points.iter().map(|p| p.mark).collect()
    }

    /// Bucket values, in mark order.
    pub fn values(&self) -> Vec<&Aggregate> {
        self.points.iter().map(|p| &p.value).collect()
    }

    /// Numeric form of each mark.
    ///
    /// - `year`: the calendar year.
    /// - `month`: `year + month / 12`.
    /// - `day`, `hour`, `minute`: offset from the first mark in days,
    ///   scaled by 1, 24 or 1440.
    ///
    /// The day offset is fractional, not a whole-day count. Hourly marks
    /// at 00:00, 03:00 and the next midnight number as `0`, `3` and `24`;
    /// truncating to whole days would put the first two on `0`.
    pub fn number_marks(&self) -> Vec<f64> {
        let Some(first) = self.points.first().map(|p| p.mark) else {
            return Vec::new();
        };
        self.points
            .iter()
            .map(|p| match self.interval.day_multiplier() {
                None if self.interval == Interval::Year => f64::from(p.mark.year()),
                None => f64::from(p.mark.year()) + f64::from(p.mark.month()) / 12.0,
                Some(mult) => (p.mark - first).num_seconds() as f64 * mult / SECONDS_PER_DAY,
            })
            .collect()
    }
}

// ─── Tracker ─────────────────────────────────────────────────────────

/// Per-series bucket accumulator.
#[derive(Debug, Clone)]
pub struct IntervalTracker {
    interval: Interval,
    order: Vec<String>,
    buckets: BTreeMap<String, BTreeMap<NaiveDateTime, Bucket>>,
}

impl IntervalTracker {
    /// A tracker for the named series, in the order rows will supply them.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::NoSeries`] when `series` is empty.
    pub fn new<I, S>(interval: Interval, series: I) -> Result<Self, IntervalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = series.into_iter().map(Into::into).collect();
        if order.is_empty() {
            return Err(IntervalError::NoSeries);
        }
        let buckets = order
            .iter()
            .map(|name| (name.clone(), BTreeMap::new()))
            .collect();
        Ok(Self {
            interval,
            order,
            buckets,
        })
    }

    /// A tracker with the single series [`DEFAULT_SERIES`].
    pub fn single(interval: Interval) -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert(DEFAULT_SERIES.to_string(), BTreeMap::new());
        Self {
            interval,
            order: vec![DEFAULT_SERIES.to_string()],
            buckets,
        }
    }

    /// Configured granularity.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Series names, in row order.
    pub fn series_names(&self) -> &[String] {
        &self.order
    }

    /// The bucket mark `at` falls into.
    pub fn mark_for(&self, at: NaiveDateTime) -> Result<NaiveDateTime, IntervalError> {
        self.interval.mark(at)
    }

    /// Fold one observation into a series.
    ///
    /// # Errors
    ///
    /// - [`IntervalError::UnknownSeries`] for a series not configured.
    /// - [`IntervalError::MixedKinds`] when the bucket already holds the
    ///   other kind of value.
    pub fn add(
        &mut self,
        series: &str,
        at: NaiveDateTime,
        value: impl Into<Value>,
    ) -> Result<(), IntervalError> {
        let mark = self.interval.mark(at)?;
        let buckets = self
            .buckets
            .get_mut(series)
            .ok_or_else(|| IntervalError::UnknownSeries(series.to_string()))?;
        let value = value.into();
        let numeric = value.as_number();

        let bucket = match buckets.entry(mark) {
            Entry::Vacant(slot) => {
                let aggregate = match numeric {
                    Some(n) => Aggregate::Sum(n),
                    None => Aggregate::Latest(value),
                };
                slot.insert(Bucket {
                    aggregate,
                    latest: at,
                    count: 1,
                });
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        match (&mut bucket.aggregate, numeric) {
            (Aggregate::Sum(total), Some(n)) => *total += n,
            (Aggregate::Latest(current), None) => {
                if at > bucket.latest {
                    *current = value;
                }
            }
            _ => {
                return Err(IntervalError::MixedKinds {
                    series: series.to_string(),
                    mark,
                })
            }
        }
        bucket.latest = bucket.latest.max(at);
        bucket.count += 1;
        Ok(())
    }

    /// Fold one value per series, aligned with the configured order.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::LengthMismatch`] unless exactly one value
    /// per series is given; otherwise as [`IntervalTracker::add`].
    pub fn add_row<V: Into<Value>>(
        &mut self,
        at: NaiveDateTime,
        values: Vec<V>,
    ) -> Result<(), IntervalError> {
        if values.len() != self.order.len() {
            return Err(IntervalError::LengthMismatch {
                given: values.len(),
                expected: self.order.len(),
            });
        }
        let order = self.order.clone();
        for (series, value) in order.iter().zip(values) {
            self.add(series, at, value)?;
        }
        Ok(())
    }

    /// Fold the same value into every series.
    pub fn add_all(
        &mut self,
        at: NaiveDateTime,
        value: impl Into<Value>,
    ) -> Result<(), IntervalError> {
        let value = value.into();
        let order = self.order.clone();
        for series in &order {
            self.add(series, at, value.clone())?;
        }
        Ok(())
    }

    /// Finalize every series, in configured order, with marks ascending.
    pub fn make(&self) -> Vec<Series> {
        let series: Vec<Series> = self
            .order
            .iter()
            .map(|name| Series {
                name: name.clone(),
                interval: self.interval,
                points: self
                    .buckets
                    .get(name)
                    .into_iter()
                    .flatten()
                    .map(|(mark, bucket)| Point {
                        mark: *mark,
                        value: bucket.aggregate.clone(),
                        count: bucket.count,
                    })
                    .collect(),
            })
            .collect();
        tracing::debug!(
            interval = %self.interval,
            series = series.len(),
            buckets = series.iter().map(|s| s.points.len()).sum::<usize>(),
            "interval series finalized"
        );
        series
    }
}
