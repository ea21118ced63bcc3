//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Enumerates registered resources and per-resource metrics, and dispatches
//! the top-level `fetch(path, start, stop, step)` query across them.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, InputError, Result};
use crate::keycodec::{shape_strs, Tuple};
use crate::planner::plan;
use crate::reader::{scan_range, Datapoint};
use crate::store::KvStore;

/// The metric metadata shape rendered for each discovered metric; every
/// string field collapses to the metric path itself, and the numeric/
/// priority fields carry no information the core derives.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricInfo {
    pub id: String,
    pub name: String,
    pub column: String,
    pub measurement: String,
    pub max_value: Option<f64>,
    pub min_value: Option<f64>,
    pub priority: u32,
    pub unit: String,
}

fn metric_info(metric_path: &str) -> MetricInfo {
    MetricInfo {
        id: metric_path.to_string(),
        name: metric_path.to_string(),
        column: metric_path.to_string(),
        measurement: metric_path.to_string(),
        max_value: None,
        min_value: None,
        priority: 0,
        unit: String::new(),
    }
}

/// `find_metrics`: scans `available_metrics` under the `(resource,)` prefix
/// and projects the metric-path component of each registration key.
pub fn find_metrics(store: &KvStore, resource: &str) -> Result<BTreeMap<String, MetricInfo>> {
    let prefix = Tuple::new().str(resource).pack();
    let shape = shape_strs(3);
    let mut out = BTreeMap::new();
    for kv in store.available_metrics.scan_prefix(&prefix) {
        let (key, _) = kv?;
        let Some(tuple) = Tuple::unpack(&key, &shape) else { continue };
        let Some(mut strings) = tuple.strings() else { continue };
        let metric_path = strings.pop().expect("shape_strs(3) unpacks exactly 3 elements");
        out.insert(metric_path.clone(), metric_info(&metric_path));
    }
    Ok(out)
}

/// All registered resources, sorted. DESIGN.md records the decision to
/// implement this as "every registered resource" rather than leave it
/// inert.
pub fn list_resources(store: &KvStore) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for kv in store.available_resources.iter() {
        let (key, _) = kv?;
        if let Ok(name) = std::str::from_utf8(&key) {
            out.push(name.to_string());
        }
    }
    out.sort();
    Ok(out)
}

/// `find_resources(pattern)`: keeps only registered resources whose name
/// fully matches `^pattern$`.
pub fn find_resources(store: &KvStore, pattern: &str) -> Result<Vec<String>> {
    let re = Regex::new(&format!("^{pattern}$"))
        .map_err(|e| Error::from(InputError::InvalidPattern(e.to_string())))?;
    Ok(list_resources(store)?.into_iter().filter(|r| re.is_match(r)).collect())
}

/// The alphabet `generate_metric`-derived paths are built from; a resource
/// or metric expression containing anything outside it is treated as a
/// regex rather than a literal name. See DESIGN.md.
static IS_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9.]+$").unwrap());

fn is_literal(expr: &str) -> bool {
    IS_LITERAL.is_match(expr)
}

/// Splits `path` on its first `.` into `(resource, metric_expr)`; a path
/// with no `.` is the bare resource with an implicit `"*"` metric
/// expression.
fn split_path(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((resource, metric_expr)) => (resource, metric_expr),
        None => (path, "*"),
    }
}

/// Top-level query entry point: `path = resource[.metric_expr]`. `step` is
/// accepted for interface parity with the render API this mirrors and is
/// currently unused by the core.
pub fn fetch(
    store: &KvStore,
    path: &str,
    start: &str,
    stop: &str,
    _step: &str,
) -> Result<BTreeMap<String, Vec<Datapoint>>> {
    let (resource, metric_expr) = split_path(path);

    // A regex resource is a placeholder today: this returns an empty map
    // rather than fanning the query out across matching resources. See
    // DESIGN.md for why this isn't "fixed" here.
    if !is_literal(resource) {
        return Ok(BTreeMap::new());
    }

    let available = find_metrics(store, resource)?;
    let matched: Vec<&String> = if metric_expr == "*" {
        available.keys().collect()
    } else {
        let re = Regex::new(&format!("^{metric_expr}$"))
            .map_err(|e| Error::from(InputError::InvalidPattern(e.to_string())))?;
        available.keys().filter(|m| re.is_match(m)).collect()
    };

    if matched.is_empty() {
        return Err(Error::from(InputError::EmptyRegexResult(metric_expr.to_string())));
    }

    let mut out = BTreeMap::new();
    for metric in matched {
        let range = plan(store, resource, metric, start, stop)?;
        let points = scan_range(store, &range)?;
        out.insert(format!("{resource}.{metric}"), points);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregationModes, Mode};
    use crate::writer::Writer;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn all_direct() -> AggregationModes {
        AggregationModes { minute: Mode::Direct, hour: Mode::Direct, day: Mode::Direct }
    }

    #[test]
    fn find_metrics_projects_metric_path() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let now_ns = Utc::now().timestamp_nanos_opt().unwrap();
        Writer::write(
            &store,
            &all_direct(),
            &format!("cpu,machine_id=host-a,host=h,cpu=cpu0 usage=1 {now_ns}"),
        )
        .unwrap();

        let metrics = find_metrics(&store, "host-a").unwrap();
        assert!(metrics.contains_key("cpu.0.usage"));
        assert_eq!(metrics["cpu.0.usage"].id, "cpu.0.usage");
    }

    #[test]
    fn list_resources_returns_every_registered_resource() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let now_ns = Utc::now().timestamp_nanos_opt().unwrap();
        Writer::write(&store, &all_direct(), &format!("cpu,machine_id=a,host=h usage=1 {now_ns}")).unwrap();
        Writer::write(&store, &all_direct(), &format!("cpu,machine_id=b,host=h usage=1 {now_ns}")).unwrap();

        assert_eq!(list_resources(&store).unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn find_resources_filters_by_anchored_pattern() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let now_ns = Utc::now().timestamp_nanos_opt().unwrap();
        Writer::write(&store, &all_direct(), &format!("cpu,machine_id=host-a,host=h usage=1 {now_ns}")).unwrap();
        Writer::write(&store, &all_direct(), &format!("cpu,machine_id=host-b,host=h usage=1 {now_ns}")).unwrap();

        assert_eq!(find_resources(&store, "host-a").unwrap(), vec!["host-a".to_string()]);
        assert_eq!(find_resources(&store, "host-.*").unwrap().len(), 2);
    }

    #[test]
    fn fetch_wildcard_returns_every_metric_for_resource() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let stop = Utc::now();
        let start = stop - Duration::minutes(1);
        let t = start.timestamp() * 1_000_000_000;
        Writer::write(&store, &all_direct(), &format!("cpu,machine_id=host-a,host=h,cpu=cpu0 usage=42 {t}")).unwrap();

        let out = fetch(&store, "host-a.*", &start.to_rfc3339(), &stop.to_rfc3339(), "").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["host-a.cpu.0.usage"][0].value, 42.0);
    }

    #[test]
    fn fetch_with_regex_resource_returns_empty_map() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let out = fetch(&store, "host-.*.cpu", "-10m", "", "").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn fetch_with_no_matching_metric_is_input_error() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let now_ns = Utc::now().timestamp_nanos_opt().unwrap();
        Writer::write(&store, &all_direct(), &format!("cpu,machine_id=host-a,host=h usage=1 {now_ns}")).unwrap();

        let err = fetch(&store, "host-a.does_not_exist", "-10m", "", "").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
