//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Parses one line-protocol record: `measurement,tag=v,... field=v,... time`.
use std::collections::BTreeMap;

use log::warn;

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Str(_) => None,
        }
    }

    /// The language-independent textual tag recorded in `available_metrics`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
            Scalar::Str(_) => "str",
        }
    }

    fn parse(raw: &str) -> Scalar {
        if let Some(stripped) = raw.strip_suffix('i') {
            if let Ok(i) = stripped.parse::<i64>() {
                return Scalar::Int(i);
            }
        }
        match raw {
            "t" | "T" | "true" | "True" | "TRUE" => return Scalar::Bool(true),
            "f" | "F" | "false" | "False" | "FALSE" => return Scalar::Bool(false),
            _ => {}
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Scalar::Float(f);
        }
        Scalar::Str(raw.trim_matches('"').to_string())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedLine {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Scalar>,
    /// Nanoseconds since epoch, as given on the line.
    pub time_ns: i64,
}

/// A malformed line returns `None`; callers log and skip it, matching the
/// writer's "parse errors on a single line do not fail the batch" contract.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut from_end = line.rsplitn(2, char::is_whitespace);
    let time_str = from_end.next()?;
    let rest = from_end.next()?;
    let time_ns: i64 = time_str.parse().ok()?;

    let mut head = rest.splitn(2, char::is_whitespace);
    let ident = head.next()?;
    let fields_str = head.next()?;

    let mut ident_parts = ident.split(',');
    let measurement = ident_parts.next()?.to_string();
    if measurement.is_empty() {
        return None;
    }

    let mut tags = BTreeMap::new();
    for kv in ident_parts {
        let (k, v) = kv.split_once('=')?;
        tags.insert(k.to_string(), v.to_string());
    }

    let mut fields = BTreeMap::new();
    for kv in fields_str.split(',') {
        let (k, v) = kv.split_once('=')?;
        fields.insert(k.to_string(), Scalar::parse(v));
    }
    if fields.is_empty() {
        return None;
    }

    Some(ParsedLine { measurement, tags, fields, time_ns })
}

/// Splits a batch on newlines, drops empty lines, and skips (with a
/// warning) any line that fails to parse rather than failing the batch.
pub fn parse_batch(text: &str) -> Vec<ParsedLine> {
    let mut out = Vec::new();
    for line in text.split('\n') {
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(parsed) => out.push(parsed),
            None => warn!("skipping malformed line-protocol record: {line:?}"),
        }
    }
    out
}
