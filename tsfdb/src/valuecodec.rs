//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Byte encoding for stored *values* (as opposed to keys — see `keycodec`).
//! Values are never range-scanned, so there is no order-preservation
//! requirement here; this is a plain tagged encoding.
use crate::lineproto::Scalar;

const TAG_INT: u8 = 0;
const TAG_FLOAT: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_STR: u8 = 3;

/// The sentinel value written for `available_metrics`/`available_resources`
/// registration keys: a packed 1-tuple containing an empty string. These
/// trees only need to record that a key exists, not carry a payload.
pub fn pack_sentinel() -> Vec<u8> {
    pack_scalar(&Scalar::Str(String::new()))
}

pub fn pack_scalar(value: &Scalar) -> Vec<u8> {
    match value {
        Scalar::Int(i) => {
            let mut buf = vec![TAG_INT];
            buf.extend_from_slice(&i.to_be_bytes());
            buf
        }
        Scalar::Float(f) => {
            let mut buf = vec![TAG_FLOAT];
            buf.extend_from_slice(&f.to_be_bytes());
            buf
        }
        Scalar::Bool(b) => vec![TAG_BOOL, u8::from(*b)],
        Scalar::Str(s) => {
            let mut buf = vec![TAG_STR];
            buf.extend_from_slice(s.as_bytes());
            buf
        }
    }
}

pub fn unpack_scalar(bytes: &[u8]) -> Option<Scalar> {
    let (tag, rest) = bytes.split_first()?;
    match *tag {
        TAG_INT => Some(Scalar::Int(i64::from_be_bytes(rest.try_into().ok()?))),
        TAG_FLOAT => Some(Scalar::Float(f64::from_be_bytes(rest.try_into().ok()?))),
        TAG_BOOL => Some(Scalar::Bool(*rest.first()? == 1)),
        TAG_STR => Some(Scalar::Str(std::str::from_utf8(rest).ok()?.to_string())),
        _ => None,
    }
}

/// The `(sum, count, min, max)` aggregate tuple stored at each resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateTuple {
    pub sum: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
}

impl AggregateTuple {
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&self.sum.to_be_bytes());
        buf.extend_from_slice(&self.count.to_be_bytes());
        buf.extend_from_slice(&self.min.to_be_bytes());
        buf.extend_from_slice(&self.max.to_be_bytes());
        buf
    }

    pub fn unpack(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        Some(Self {
            sum: f64::from_be_bytes(bytes[0..8].try_into().ok()?),
            count: u64::from_be_bytes(bytes[8..16].try_into().ok()?),
            min: f64::from_be_bytes(bytes[16..24].try_into().ok()?),
            max: f64::from_be_bytes(bytes[24..32].try_into().ok()?),
        })
    }

    /// Real (not integer) division, per §8 invariant 2 / §9's explicit
    /// "integer vs real division" note.
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_tuple_round_trips() {
        let t = AggregateTuple { sum: 49.0, count: 2, min: 7.0, max: 42.0 };
        assert_eq!(AggregateTuple::unpack(&t.pack()).unwrap(), t);
    }

    #[test]
    fn scalar_round_trips() {
        for scalar in [
            Scalar::Int(-7),
            Scalar::Float(3.5),
            Scalar::Bool(true),
            Scalar::Str("hello".into()),
        ] {
            assert_eq!(unpack_scalar(&pack_scalar(&scalar)).unwrap(), scalar);
        }
    }

    #[test]
    fn mean_uses_real_division() {
        let t = AggregateTuple { sum: 5.0, count: 2, min: 1.0, max: 4.0 };
        assert_eq!(t.mean(), 2.5);
    }
}
