//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Transactional batch ingest: parse -> key -> raw write -> metric
//! registration -> aggregate cascade, all inside one KV transaction.
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use log::{error, warn};
use sled::transaction::{ConflictableTransactionError, TransactionalTree, UnabortableTransactionError};
use sled::Transactional;

use crate::aggregate::{self, AggregationModes, BucketIo, Resolution};
use crate::error::Error;
use crate::keycodec::{key_tuple_day, key_tuple_hour, key_tuple_minute, key_tuple_second};
use crate::lineproto::parse_batch;
use crate::naming::{generate_metric, metric_path};
use crate::store::KvStore;
use crate::valuecodec::{pack_scalar, pack_sentinel, unpack_scalar, AggregateTuple};

const RETRY_LIMIT: u32 = 3;
const TIMEOUT: Duration = Duration::from_millis(1000);

pub struct Writer;

impl Writer {
    /// Splits `batch_text` into lines, discards empties, and commits every
    /// surviving record in one transaction, retried up to `RETRY_LIMIT`
    /// times within `TIMEOUT`.
    pub fn write(store: &KvStore, modes: &AggregationModes, batch_text: &str) -> crate::error::Result<()> {
        let lines = parse_batch(batch_text);
        if lines.is_empty() {
            return Ok(());
        }

        let deadline = Instant::now() + TIMEOUT;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::write_once(store, modes, &lines) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < RETRY_LIMIT && Instant::now() < deadline => {
                    warn!("write transaction failed (attempt {attempt}), retrying: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn write_once(
        store: &KvStore,
        modes: &AggregationModes,
        lines: &[crate::lineproto::ParsedLine],
    ) -> crate::error::Result<()> {
        let trees: [&sled::Tree; 6] = [
            &store.monitoring,
            &store.available_metrics,
            &store.available_resources,
            &store.metric_per_minute,
            &store.metric_per_hour,
            &store.metric_per_day,
        ];

        trees
            .transaction(|tt: &[TransactionalTree]| {
                let monitoring = &tt[0];
                let available_metrics = &tt[1];
                let available_resources = &tt[2];
                let mut buckets = TxBuckets { minute: &tt[3], hour: &tt[4], day: &tt[5] };

                for line in lines {
                    let Some(resource) = line.tags.get("machine_id").cloned() else {
                        warn!("dropping line with no machine_id tag: {:?}", line.measurement);
                        continue;
                    };

                    if available_resources.get(resource.as_bytes())?.is_none() {
                        available_resources.insert(resource.as_bytes(), pack_sentinel())?;
                    }

                    let mut tags = line.tags.clone();
                    tags.remove("machine_id");
                    tags.remove("host");
                    let metric = generate_metric(&line.measurement, &tags);

                    let dt = seconds_from_nanos(line.time_ns);

                    for (field, value) in &line.fields {
                        let field_path = metric_path(&metric, field);
                        let key = key_tuple_second(&resource, &field_path, dt).pack();

                        let newly_written = match monitoring.get(&key)? {
                            None => {
                                monitoring.insert(key, pack_scalar(value))?;
                                true
                            }
                            Some(existing_bytes) => {
                                let existing = unpack_scalar(&existing_bytes);
                                if existing.as_ref() == Some(value) {
                                    warn!("key {resource}/{field_path}@{dt} already exists with the same value");
                                } else {
                                    error!("key {resource}/{field_path}@{dt} already exists with a different value");
                                }
                                false
                            }
                        };

                        if !newly_written {
                            continue;
                        }

                        let registration_key = registration_key(&resource, value.type_name(), &field_path);
                        if available_metrics.get(&registration_key)?.is_none() {
                            available_metrics.insert(registration_key, pack_sentinel())?;
                        }

                        if let Some(numeric) = value.as_f64() {
                            aggregate::cascade(&mut buckets, modes, &resource, &field_path, dt, numeric)
                                .map_err(ConflictableTransactionError::from)?;
                        }
                    }
                }

                Ok(())
            })
            .map_err(Error::from)
    }
}

fn seconds_from_nanos(time_ns: i64) -> DateTime<Utc> {
    let seconds = time_ns / 1_000_000_000;
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now)
}

fn registration_key(resource: &str, type_name: &str, field_path: &str) -> Vec<u8> {
    crate::keycodec::Tuple::new()
        .str(resource)
        .str(type_name)
        .str(field_path)
        .pack()
}

struct TxBuckets<'a> {
    minute: &'a TransactionalTree,
    hour: &'a TransactionalTree,
    day: &'a TransactionalTree,
}

impl<'a> TxBuckets<'a> {
    fn tree(&self, resolution: Resolution) -> &TransactionalTree {
        match resolution {
            Resolution::Minute => self.minute,
            Resolution::Hour => self.hour,
            Resolution::Day => self.day,
        }
    }

    fn key(resolution: Resolution, resource: &str, metric: &str, dt: DateTime<Utc>) -> Vec<u8> {
        match resolution {
            Resolution::Minute => key_tuple_minute(resource, metric, dt).pack(),
            Resolution::Hour => key_tuple_hour(resource, metric, dt).pack(),
            Resolution::Day => key_tuple_day(resource, metric, dt).pack(),
        }
    }
}

impl<'a> BucketIo for TxBuckets<'a> {
    type Error = UnabortableTransactionError;

    fn read(
        &mut self,
        resolution: Resolution,
        resource: &str,
        metric: &str,
        dt: DateTime<Utc>,
    ) -> Result<Option<AggregateTuple>, Self::Error> {
        let key = Self::key(resolution, resource, metric, dt);
        Ok(self.tree(resolution).get(key)?.and_then(|bytes| AggregateTuple::unpack(&bytes)))
    }

    fn write(
        &mut self,
        resolution: Resolution,
        resource: &str,
        metric: &str,
        dt: DateTime<Utc>,
        value: AggregateTuple,
    ) -> Result<(), Self::Error> {
        let key = Self::key(resolution, resource, metric, dt);
        self.tree(resolution).insert(key, value.pack())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, KvStore) {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn all_direct() -> AggregationModes {
        AggregationModes {
            minute: aggregate::Mode::Direct,
            hour: aggregate::Mode::Direct,
            day: aggregate::Mode::Direct,
        }
    }

    #[test]
    fn writes_raw_sample_and_cascades_aggregates() {
        let (_dir, store) = open_store();
        let line = "cpu,machine_id=host-a,host=h,cpu=cpu0 usage=42i 1704164645000000000";
        Writer::write(&store, &all_direct(), line).unwrap();

        let dt = seconds_from_nanos(1704164645000000000);
        let raw_key = key_tuple_second("host-a", "cpu.0.usage", dt).pack();
        let raw = store.monitoring.get(raw_key).unwrap().unwrap();
        assert_eq!(unpack_scalar(&raw).unwrap(), crate::lineproto::Scalar::Int(42));

        let minute_key = key_tuple_minute("host-a", "cpu.0.usage", dt).pack();
        let minute = store.metric_per_minute.get(minute_key).unwrap().unwrap();
        assert_eq!(
            AggregateTuple::unpack(&minute).unwrap(),
            AggregateTuple { sum: 42.0, count: 1, min: 42.0, max: 42.0 }
        );
    }

    #[test]
    fn rewriting_same_second_with_equal_value_is_a_noop() {
        let (_dir, store) = open_store();
        let line = "cpu,machine_id=host-a,host=h,cpu=cpu0 usage=42i 1704164645000000000";
        Writer::write(&store, &all_direct(), line).unwrap();
        Writer::write(&store, &all_direct(), line).unwrap();

        let dt = seconds_from_nanos(1704164645000000000);
        let minute_key = key_tuple_minute("host-a", "cpu.0.usage", dt).pack();
        let minute = store.metric_per_minute.get(minute_key).unwrap().unwrap();
        // Still count 1: the duplicate write must not double-count.
        assert_eq!(AggregateTuple::unpack(&minute).unwrap().count, 1);
    }

    #[test]
    fn rewriting_same_second_with_different_value_leaves_storage_unchanged() {
        let (_dir, store) = open_store();
        let first = "cpu,machine_id=host-a,host=h,cpu=cpu0 usage=42i 1704164645000000000";
        let second = "cpu,machine_id=host-a,host=h,cpu=cpu0 usage=99i 1704164645000000000";
        Writer::write(&store, &all_direct(), first).unwrap();
        Writer::write(&store, &all_direct(), second).unwrap();

        let dt = seconds_from_nanos(1704164645000000000);
        let raw_key = key_tuple_second("host-a", "cpu.0.usage", dt).pack();
        let raw = store.monitoring.get(raw_key).unwrap().unwrap();
        assert_eq!(unpack_scalar(&raw).unwrap(), crate::lineproto::Scalar::Int(42));

        let minute_key = key_tuple_minute("host-a", "cpu.0.usage", dt).pack();
        let minute = store.metric_per_minute.get(minute_key).unwrap().unwrap();
        assert_eq!(AggregateTuple::unpack(&minute).unwrap().count, 1);
    }

    #[test]
    fn registers_resource_and_metric() {
        let (_dir, store) = open_store();
        let line = "cpu,machine_id=host-a,host=h,cpu=cpu0 usage=42i 1704164645000000000";
        Writer::write(&store, &all_direct(), line).unwrap();

        assert!(store.available_resources.get("host-a").unwrap().is_some());
        let reg_key = registration_key("host-a", "int", "cpu.0.usage");
        assert!(store.available_metrics.get(reg_key).unwrap().is_some());
    }
}
