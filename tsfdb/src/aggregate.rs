//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! The minute/hour/day aggregation cascade triggered by every accepted raw
//! write. See DESIGN.md for how the mode-2 ("chained") carry state is
//! modeled here and why its quirk is preserved rather than fixed.
use chrono::{DateTime, Duration, Utc};

use crate::valuecodec::AggregateTuple;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Minute,
    Hour,
    Day,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Minute, Resolution::Hour, Resolution::Day];

    pub fn tree_name(&self) -> &'static str {
        match self {
            Resolution::Minute => "metric_per_minute",
            Resolution::Hour => "metric_per_hour",
            Resolution::Day => "metric_per_day",
        }
    }

    pub fn decrement(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Resolution::Minute => dt - Duration::minutes(1),
            Resolution::Hour => dt - Duration::hours(1),
            Resolution::Day => dt - Duration::days(1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Disabled = 0,
    Direct = 1,
    Chained = 2,
}

impl Mode {
    /// Unrecognized or absent values fall back to `Direct`, the default of
    /// 1 for `AGGREGATE_MINUTE`/`HOUR`/`DAY`.
    pub fn from_env_value(raw: &str) -> Mode {
        match raw.trim() {
            "0" => Mode::Disabled,
            "2" => Mode::Chained,
            _ => Mode::Direct,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AggregationModes {
    pub minute: Mode,
    pub hour: Mode,
    pub day: Mode,
}

impl AggregationModes {
    pub fn get(&self, resolution: Resolution) -> Mode {
        match resolution {
            Resolution::Minute => self.minute,
            Resolution::Hour => self.hour,
            Resolution::Day => self.day,
        }
    }
}

/// Backing store for one bucket read/write during the cascade. Implemented
/// against `sled`'s `TransactionalTree` for real writes (see `writer.rs`)
/// and against a plain map in tests below, so the cascade logic can be
/// exercised without a store.
pub trait BucketIo {
    type Error;
    fn read(
        &mut self,
        resolution: Resolution,
        resource: &str,
        metric: &str,
        dt: DateTime<Utc>,
    ) -> Result<Option<AggregateTuple>, Self::Error>;
    fn write(
        &mut self,
        resolution: Resolution,
        resource: &str,
        metric: &str,
        dt: DateTime<Utc>,
        value: AggregateTuple,
    ) -> Result<(), Self::Error>;
}

/// Cascades a single raw sample `(dt, value)` through the enabled
/// resolutions in order, minute then hour then day, carrying
/// `last_tuple`/`last_dt` between iterations (see the mode-2 note on
/// `Mode::Chained` above).
pub fn cascade<IO: BucketIo>(
    io: &mut IO,
    modes: &AggregationModes,
    resource: &str,
    metric: &str,
    dt: DateTime<Utc>,
    value: f64,
) -> Result<(), IO::Error> {
    let mut new_aggregation = false;
    let mut last_tuple: Option<AggregateTuple> = None;
    let mut last_dt: Option<DateTime<Utc>> = None;

    for resolution in Resolution::ALL {
        let mode = modes.get(resolution);
        if mode == Mode::Disabled || (mode == Mode::Chained && !new_aggregation) {
            continue;
        }

        let sum_dt = if mode == Mode::Chained {
            last_dt.expect("chained mode only runs once a carry from a finer resolution is set")
        } else {
            dt
        };

        let current = io.read(resolution, resource, metric, sum_dt)?;
        let updated = if let Some(existing) = current {
            new_aggregation = false;
            if mode == Mode::Chained {
                let carried = last_tuple
                    .expect("chained mode only runs once a carry from a finer resolution is set");
                AggregateTuple {
                    sum: existing.sum + carried.sum,
                    count: existing.count + carried.count,
                    min: existing.min.min(carried.min),
                    max: existing.max.max(carried.max),
                }
            } else {
                AggregateTuple {
                    sum: existing.sum + value,
                    count: existing.count + 1,
                    min: existing.min.min(value),
                    max: existing.max.max(value),
                }
            }
        } else {
            let base = if mode == Mode::Chained {
                last_tuple.expect(
                    "chained mode only runs once a carry from a finer resolution is set",
                )
            } else {
                AggregateTuple { sum: value, count: 1, min: value, max: value }
            };
            // Carry this resolution's previous bucket forward for the next,
            // coarser resolution to consume if it runs in chained mode —
            // this overwrites last_tuple/last_dt from the prior iteration,
            // which is the behavior flagged as a hazard in DESIGN.md.
            let decremented = resolution.decrement(dt);
            last_dt = Some(decremented);
            let carried = io.read(resolution, resource, metric, decremented)?;
            new_aggregation = carried.is_some();
            last_tuple = carried;
            base
        };

        io.write(resolution, resource, metric, sum_dt, updated)?;
    }

    Ok(())
}
