//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Derives a canonical, dotted metric path from a measurement and its tags.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static DOT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.+").unwrap());

/// `machine_id` and `host` are routed separately (as the resource) and must
/// already be removed from `tags` by the caller before this runs.
pub fn generate_metric(measurement: &str, tags: &BTreeMap<String, String>) -> String {
    let mut entries: Vec<(&str, &str)> = tags
        .iter()
        .filter(|(k, _)| k.as_str() != "machine_id" && k.as_str() != "host")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    // BTreeMap iteration is already ascending lexicographic by key; stably
    // promote entries whose key equals the measurement.
    entries.sort_by_key(|(k, _)| *k != measurement);

    let mut metric = measurement.to_string();
    for (tag, value) in entries {
        let processed_tag = tag.replace(measurement, "");
        let processed_value = value.replace(measurement, "");
        if !processed_tag.is_empty() {
            metric.push('.');
            metric.push_str(&processed_tag);
        }
        if !processed_value.is_empty() && !processed_tag.is_empty() {
            metric.push('-');
            metric.push_str(&processed_value);
        } else if !processed_value.is_empty() {
            metric.push('.');
            metric.push_str(&processed_value);
        }
    }

    let metric = metric.replace('/', "-");
    let metric = metric.replace(".-", ".");
    DOT_RUN.replace_all(&metric, ".").into_owned()
}

/// The metric path stored in keys is the derived metric plus the field name.
pub fn metric_path(metric: &str, field: &str) -> String {
    format!("{metric}.{field}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    // "cpu0" shortens to "0" and a tag value containing its own "-" produces
    // a double dash ("device--dev-sda"); see DESIGN.md for why these are
    // the correct outputs of the derivation.
    #[rstest]
    #[case("cpu", &[("machine_id", "m"), ("host", "h"), ("cpu", "cpu0")], "cpu.0")]
    #[case(
        "disk",
        &[("machine_id", "m"), ("host", "h"), ("device", "/dev/sda"), ("fstype", "ext4")],
        "disk.device--dev-sda.fstype-ext4"
    )]
    fn matches_original_algorithm(
        #[case] measurement: &str,
        #[case] pairs: &[(&str, &str)],
        #[case] expected: &str,
    ) {
        assert_eq!(generate_metric(measurement, &tags(pairs)), expected);
    }

    #[test]
    fn is_pure() {
        let t = tags(&[("machine_id", "m"), ("host", "h"), ("region", "us")]);
        assert_eq!(generate_metric("latency", &t), generate_metric("latency", &t));
    }

    #[test]
    fn tag_fully_absorbed_joins_surviving_value_with_dot() {
        let t = tags(&[("machine_id", "m"), ("host", "h"), ("memory", "memory_used")]);
        let out = generate_metric("memory", &t);
        assert!(out.starts_with("memory."));
        assert!(!out.contains("memory-"));
    }

    #[test]
    fn slashes_become_dashes_and_dot_runs_collapse() {
        let t = tags(&[("machine_id", "m"), ("host", "h"), ("path", "/var//log")]);
        let out = generate_metric("fs", &t);
        assert!(!out.contains('/'));
        assert!(!out.contains(".."));
    }

    #[test]
    fn metric_path_appends_field_name() {
        assert_eq!(metric_path("cpu.0", "usage"), "cpu.0.usage");
    }
}
