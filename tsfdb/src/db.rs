//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! The process-wide façade: owns the `sled`-backed store and the
//! aggregation modes, and exposes the two operations the core's external
//! collaborators (the HTTP surface, `tsfdbctl`) actually call: ingest a
//! line-protocol batch, and run a `fetch` range query.
use std::collections::BTreeMap;

use crate::aggregate::AggregationModes;
use crate::config::Config;
use crate::discovery;
use crate::error::Result;
use crate::reader::Datapoint;
use crate::store::KvStore;
use crate::writer::Writer;

#[derive(Clone)]
pub struct Db {
    store: KvStore,
    modes: AggregationModes,
}

impl Db {
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self {
            store: KvStore::open(&config.data_dir)?,
            modes: config.aggregation_modes,
        })
    }

    pub fn ingest(&self, batch_text: &str) -> Result<()> {
        Writer::write(&self.store, &self.modes, batch_text)
    }

    pub fn fetch(
        &self,
        path: &str,
        start: &str,
        stop: &str,
        step: &str,
    ) -> Result<BTreeMap<String, Vec<Datapoint>>> {
        discovery::fetch(&self.store, path, start, stop, step)
    }

    pub fn list_resources(&self) -> Result<Vec<String>> {
        discovery::list_resources(&self.store)
    }

    pub fn find_metrics(&self, resource: &str) -> Result<BTreeMap<String, discovery::MetricInfo>> {
        discovery::find_metrics(&self.store, resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> Config {
        std::env::remove_var("AGGREGATE_MINUTE");
        std::env::remove_var("AGGREGATE_HOUR");
        std::env::remove_var("AGGREGATE_DAY");
        std::env::set_var("TSFDB_DATA_DIR", dir);
        let config = Config::load(None).unwrap();
        std::env::remove_var("TSFDB_DATA_DIR");
        config
    }

    #[test]
    fn ingest_then_fetch_round_trips_a_sample() {
        let dir = tempdir().unwrap();
        let db = Db::open(&config_in(dir.path())).unwrap();
        let now_ns = Utc::now().timestamp_nanos_opt().unwrap();
        db.ingest(&format!("cpu,machine_id=host-a,host=h,cpu=cpu0 usage=42 {now_ns}")).unwrap();

        let out = db.fetch("host-a.cpu.0.usage", "-10m", "", "").unwrap();
        assert_eq!(out["host-a.cpu.0.usage"][0].value, 42.0);
        assert_eq!(db.list_resources().unwrap(), vec!["host-a".to_string()]);
    }
}
