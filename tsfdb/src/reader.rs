//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Scans a planned `[lo, hi)` key range and reconstructs `[value, unix
//! timestamp]` datapoints from it.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::keycodec::{shape_for_ints, timestamp_from_trailing, Tuple};
use crate::lineproto::Scalar;
use crate::planner::{PlannerResolution, RangePlan};
use crate::store::KvStore;
use crate::valuecodec::{unpack_scalar, AggregateTuple};

/// One sample on the wire: `[value, unix_seconds]`, serialized as a JSON
/// 2-tuple to match the render APIs this facade's HTTP surface mirrors.
#[derive(Clone, Debug, PartialEq)]
pub struct Datapoint {
    pub value: f64,
    pub unix_seconds: i64,
}

impl Serialize for Datapoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.value)?;
        tup.serialize_element(&self.unix_seconds)?;
        tup.end()
    }
}

/// Runs `plan` against `store` and returns every datapoint in range, in
/// ascending time order (the natural order of a sled tree scan over
/// lexicographically-packed keys).
pub fn scan_range(store: &KvStore, plan: &RangePlan) -> Result<Vec<Datapoint>> {
    let tree = match plan.resolution {
        PlannerResolution::Raw => &store.monitoring,
        PlannerResolution::Minute => &store.metric_per_minute,
        PlannerResolution::Hour => &store.metric_per_hour,
        PlannerResolution::Day => &store.metric_per_day,
    };

    let shape = shape_for_ints(plan.resolution.n_ints());
    let mut out = Vec::new();
    for kv in tree.range(plan.lo.clone()..plan.hi.clone()) {
        let (key, value) = kv?;
        let Some(tuple) = Tuple::unpack(&key, &shape) else { continue };
        let Some(dt) = timestamp_from_trailing(&tuple, plan.resolution.n_ints()) else { continue };

        let sample = match plan.resolution {
            PlannerResolution::Raw => unpack_scalar(&value).and_then(|s| scalar_as_value(&s)),
            _ => AggregateTuple::unpack(&value).map(|agg| agg.mean()),
        };
        if let Some(value) = sample {
            out.push(Datapoint { value, unix_seconds: dt.timestamp() });
        }
    }
    Ok(out)
}

fn scalar_as_value(scalar: &Scalar) -> Option<f64> {
    scalar.as_f64()
}

/// `tuple_to_timestamp`'s counterpart: extracts just the time, for callers
/// that only need to bucket datapoints by wall-clock time.
pub fn key_timestamp(key: &[u8], resolution: PlannerResolution) -> Option<DateTime<Utc>> {
    let shape = shape_for_ints(resolution.n_ints());
    let tuple = Tuple::unpack(key, &shape)?;
    timestamp_from_trailing(&tuple, resolution.n_ints())
}
