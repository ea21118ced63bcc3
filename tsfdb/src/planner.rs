//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Chooses the resolution whose bucket width matches a requested time
//! window, and synthesizes the half-open-but-really-closed byte-key range
//! to scan for it.
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, InputError, NotReadyError, Result};
use crate::keycodec::{key_tuple_day, key_tuple_hour, key_tuple_minute, key_tuple_second};
use crate::store::KvStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannerResolution {
    Raw,
    Minute,
    Hour,
    Day,
}

impl PlannerResolution {
    pub fn n_ints(&self) -> usize {
        match self {
            PlannerResolution::Raw => 6,
            PlannerResolution::Minute => 5,
            PlannerResolution::Hour => 4,
            PlannerResolution::Day => 3,
        }
    }
}

pub struct RangePlan {
    pub resolution: PlannerResolution,
    pub lo: Vec<u8>,
    pub hi: Vec<u8>,
}

static RELATIVE_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<sign>[+-]?)(?P<amount>\d+)(?P<unit>s|min|h|d|w|mo|y)$").unwrap());

/// Parses `-10m`-style relative expressions and a handful of absolute
/// formats. `-Xy` means X years, `-Xmo` means X months.
fn parse_time_expr(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Some(caps) = RELATIVE_EXPR.captures(raw) {
        let amount: i64 = caps["amount"].parse().map_err(|_| {
            Error::from(InputError::BadTimeExpression(raw.to_string()))
        })?;
        let signed = if &caps["sign"] == "-" { -amount } else { amount };
        let now = Utc::now();
        let shifted = match &caps["unit"] {
            "s" => now + Duration::seconds(signed),
            "min" => now + Duration::minutes(signed),
            "h" => now + Duration::hours(signed),
            "d" => now + Duration::days(signed),
            "w" => now + Duration::weeks(signed),
            "mo" => shift_months(now, signed),
            "y" => shift_months(now, signed * 12),
            _ => unreachable!("regex only matches known units"),
        };
        return Ok(shifted);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(Error::from(InputError::BadTimeExpression(raw.to_string())))
}

fn shift_months(dt: DateTime<Utc>, months: i64) -> DateTime<Utc> {
    if months >= 0 {
        dt.checked_add_months(Months::new(months as u32)).unwrap_or(dt)
    } else {
        dt.checked_sub_months(Months::new((-months) as u32)).unwrap_or(dt)
    }
}

fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0).unwrap().with_nanosecond(0).unwrap()
}

/// Resolves `start`/`stop` query params (empty, relative, or absolute) into
/// a minute-truncated `[start, stop]` pair. Empty defaults: `start = now -
/// 10 min`, `stop = now`.
pub fn parse_start_stop_params(start: &str, stop: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = if start.is_empty() {
        Utc::now() - Duration::minutes(10)
    } else {
        parse_time_expr(start)?
    };
    let stop = if stop.is_empty() { Utc::now() } else { parse_time_expr(stop)? };
    Ok((truncate_to_minute(start), truncate_to_minute(stop)))
}

/// Picks the resolution whose bucket width matches `[start, stop]` and
/// returns the packed `[lo, hi)` key bounds for it, with `hi` nudged past
/// `stop` by the resolution's delta to emulate an inclusive upper bound.
pub fn plan(store: &KvStore, resource: &str, metric: &str, start: &str, stop: &str) -> Result<RangePlan> {
    let (start, stop) = parse_start_stop_params(start, stop)?;
    let hours = ((stop - start).num_seconds() as f64 / 3600.0 * 100.0).round() / 100.0;

    if hours <= 1.0 {
        let hi_dt = stop + Duration::seconds(1);
        return Ok(RangePlan {
            resolution: PlannerResolution::Raw,
            lo: key_tuple_second(resource, metric, start).pack(),
            hi: key_tuple_second(resource, metric, hi_dt).pack(),
        });
    }
    if hours <= 48.0 {
        require_tree(store, crate::aggregate::Resolution::Minute)?;
        let hi_dt = stop + Duration::minutes(1);
        return Ok(RangePlan {
            resolution: PlannerResolution::Minute,
            lo: key_tuple_minute(resource, metric, start).pack(),
            hi: key_tuple_minute(resource, metric, hi_dt).pack(),
        });
    }
    if hours <= 1440.0 {
        require_tree(store, crate::aggregate::Resolution::Hour)?;
        let hi_dt = stop + Duration::hours(1);
        return Ok(RangePlan {
            resolution: PlannerResolution::Hour,
            lo: key_tuple_hour(resource, metric, start).pack(),
            hi: key_tuple_hour(resource, metric, hi_dt).pack(),
        });
    }

    require_tree(store, crate::aggregate::Resolution::Day)?;
    let hi_dt = stop + Duration::hours(24);
    Ok(RangePlan {
        resolution: PlannerResolution::Day,
        lo: key_tuple_day(resource, metric, start).pack(),
        hi: key_tuple_day(resource, metric, hi_dt).pack(),
    })
}

fn require_tree(store: &KvStore, resolution: crate::aggregate::Resolution) -> Result<()> {
    if store.resolution_tree_if_exists(resolution) {
        Ok(())
    } else {
        Err(Error::from(NotReadyError::MissingDirectory(resolution.tree_name().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case(0.5, PlannerResolution::Raw)]
    #[case(24.0, PlannerResolution::Minute)]
    #[case(200.0, PlannerResolution::Hour)]
    #[case(2000.0, PlannerResolution::Day)]
    fn picks_resolution_by_window_size(#[case] hours: f64, #[case] expected: PlannerResolution) {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let stop = Utc::now();
        let start = stop - Duration::seconds((hours * 3600.0) as i64);
        let start_s = start.to_rfc3339();
        let stop_s = stop.to_rfc3339();
        let plan = plan(&store, "r", "m", &start_s, &stop_s).unwrap();
        assert_eq!(plan.resolution, expected);
    }

    #[test]
    fn lo_is_at_or_before_start_and_hi_is_past_stop() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let stop = truncate_to_minute(Utc::now());
        let start = stop - Duration::minutes(10);
        let plan = plan(&store, "r", "m", &start.to_rfc3339(), &stop.to_rfc3339()).unwrap();
        assert_eq!(plan.lo, key_tuple_minute("r", "m", start).pack());
        assert!(plan.hi > key_tuple_minute("r", "m", stop).pack());
    }

    #[test]
    fn missing_minute_tree_is_a_not_ready_error() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let stop = Utc::now();
        let start = stop - Duration::hours(2);
        let err = plan(&store, "r", "m", &start.to_rfc3339(), &stop.to_rfc3339()).unwrap_err();
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn relative_year_expression_parses() {
        let (start, stop) = parse_start_stop_params("-2y", "").unwrap();
        assert!(start < stop);
        assert_eq!(start.second(), 0);
        assert_eq!(stop.second(), 0);
    }

    #[test]
    fn empty_params_default_to_last_ten_minutes() {
        let (start, stop) = parse_start_stop_params("", "").unwrap();
        let delta = stop - start;
        assert!(delta >= Duration::minutes(9) && delta <= Duration::minutes(11));
    }
}
