//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Order-preserving tuple packing for the hierarchical time key schema:
//! `(resource, metric, Y, M, D, [h, [m, [s]]])`.
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElemKind {
    Str,
    Int,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Elem {
    Str(String),
    Int(u32),
}

/// A packed key tuple. Strings are length-prefixed and integers are
/// fixed-width big-endian, so a pack of a shorter tuple is always a strict
/// byte-prefix of any pack of a longer tuple extending it, and — within a
/// fixed prefix — integer fields sort numerically.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tuple(Vec<Elem>);

impl Tuple {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn str(mut self, s: impl Into<String>) -> Self {
        self.0.push(Elem::Str(s.into()));
        self
    }

    pub fn int(mut self, i: u32) -> Self {
        self.0.push(Elem::Int(i));
        self
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for elem in &self.0 {
            match elem {
                Elem::Str(s) => {
                    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
                    buf.extend_from_slice(s.as_bytes());
                }
                Elem::Int(i) => buf.extend_from_slice(&i.to_be_bytes()),
            }
        }
        buf
    }

    pub fn unpack(bytes: &[u8], shape: &[ElemKind]) -> Option<Tuple> {
        let mut out = Vec::with_capacity(shape.len());
        let mut pos = 0usize;
        for kind in shape {
            match kind {
                ElemKind::Str => {
                    let len_bytes = bytes.get(pos..pos + 4)?;
                    let len = u32::from_be_bytes(len_bytes.try_into().ok()?) as usize;
                    pos += 4;
                    let s = std::str::from_utf8(bytes.get(pos..pos + len)?)
                        .ok()?
                        .to_string();
                    pos += len;
                    out.push(Elem::Str(s));
                }
                ElemKind::Int => {
                    let int_bytes = bytes.get(pos..pos + 4)?;
                    out.push(Elem::Int(u32::from_be_bytes(int_bytes.try_into().ok()?)));
                    pos += 4;
                }
            }
        }
        if pos != bytes.len() {
            return None;
        }
        Some(Tuple(out))
    }

    /// The trailing `n` integer elements, in order — used to reconstruct a
    /// calendar timestamp from a day/hour/minute/second key tuple.
    pub fn trailing_ints(&self, n: usize) -> Option<Vec<u32>> {
        let start = self.0.len().checked_sub(n)?;
        self.0[start..]
            .iter()
            .map(|e| match e {
                Elem::Int(i) => Some(*i),
                Elem::Str(_) => None,
            })
            .collect()
    }

    /// All elements as strings, in order — used to unpack the all-string
    /// registration key shapes (`available_metrics`, `available_resources`).
    pub fn strings(&self) -> Option<Vec<String>> {
        self.0
            .iter()
            .map(|e| match e {
                Elem::Str(s) => Some(s.clone()),
                Elem::Int(_) => None,
            })
            .collect()
    }
}

/// A shape of `n` consecutive string elements, e.g. the `(resource,
/// type_name, metric_path)` registration key.
pub fn shape_strs(n: usize) -> Vec<ElemKind> {
    vec![ElemKind::Str; n]
}

pub fn shape_for_ints(n_ints: usize) -> Vec<ElemKind> {
    let mut v = vec![ElemKind::Str, ElemKind::Str];
    v.extend(std::iter::repeat(ElemKind::Int).take(n_ints));
    v
}

pub fn key_tuple_day(resource: &str, metric: &str, dt: DateTime<Utc>) -> Tuple {
    Tuple::new()
        .str(resource)
        .str(metric)
        .int(dt.year() as u32)
        .int(dt.month())
        .int(dt.day())
}

pub fn key_tuple_hour(resource: &str, metric: &str, dt: DateTime<Utc>) -> Tuple {
    key_tuple_day(resource, metric, dt).int(dt.hour())
}

pub fn key_tuple_minute(resource: &str, metric: &str, dt: DateTime<Utc>) -> Tuple {
    key_tuple_hour(resource, metric, dt).int(dt.minute())
}

pub fn key_tuple_second(resource: &str, metric: &str, dt: DateTime<Utc>) -> Tuple {
    key_tuple_minute(resource, metric, dt).int(dt.second())
}

/// Reconstructs a UTC timestamp from the last `n_ints` integer fields of an
/// unpacked key tuple: 3 -> day, 4 -> hour, 5 -> minute, 6 -> second.
pub fn timestamp_from_trailing(tuple: &Tuple, n_ints: usize) -> Option<DateTime<Utc>> {
    let parts = tuple.trailing_ints(n_ints)?;
    let (year, month, day) = (parts[0] as i32, parts[1], parts[2]);
    let hour = parts.get(3).copied().unwrap_or(0);
    let minute = parts.get(4).copied().unwrap_or(0);
    let second = parts.get(5).copied().unwrap_or(0);
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn shorter_tuple_is_strict_prefix_of_longer() {
        let day = key_tuple_day("r", "m", dt()).pack();
        let hour = key_tuple_hour("r", "m", dt()).pack();
        let minute = key_tuple_minute("r", "m", dt()).pack();
        let second = key_tuple_second("r", "m", dt()).pack();
        assert!(hour.starts_with(&day));
        assert!(minute.starts_with(&hour));
        assert!(second.starts_with(&minute));
        assert!(day.len() < hour.len());
    }

    #[test]
    fn integer_fields_sort_numerically() {
        let earlier = key_tuple_day("r", "m", dt()).pack();
        let later = key_tuple_day("r", "m", Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()).pack();
        assert!(earlier < later);
    }

    #[test]
    fn round_trips_through_pack_unpack() {
        let packed = key_tuple_second("host-1", "cpu.0", dt()).pack();
        let unpacked = Tuple::unpack(&packed, &shape_for_ints(6)).unwrap();
        assert_eq!(
            timestamp_from_trailing(&unpacked, 6).unwrap(),
            dt()
        );
    }

    #[test]
    fn strings_unpacks_an_all_string_tuple() {
        let packed = Tuple::new().str("host-1").str("int").str("cpu.0.usage").pack();
        let unpacked = Tuple::unpack(&packed, &shape_strs(3)).unwrap();
        assert_eq!(
            unpacked.strings().unwrap(),
            vec!["host-1".to_string(), "int".to_string(), "cpu.0.usage".to_string()]
        );
    }

    #[test]
    fn day_tuple_reconstructs_midnight() {
        let packed = key_tuple_day("r", "m", dt()).pack();
        let unpacked = Tuple::unpack(&packed, &shape_for_ints(3)).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(timestamp_from_trailing(&unpacked, 3).unwrap(), expected);
    }
}
