//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! The `monitoring` root namespace. Raw per-second samples live in the
//! default tree; four sibling namespaces hang off it as separate sled
//! `Tree`s — the closest idiomatic match to FoundationDB's directory layer
//! for an embedded, single-process store.
use std::path::Path;

use log::debug;
use sled::{Db, Tree};

use crate::aggregate::Resolution;
use crate::error::Result;

pub const TREE_AVAILABLE_METRICS: &str = "available_metrics";
pub const TREE_AVAILABLE_RESOURCES: &str = "available_resources";

#[derive(Clone)]
pub struct KvStore {
    db: Db,
    pub monitoring: Tree,
    pub available_metrics: Tree,
    pub available_resources: Tree,
    pub metric_per_minute: Tree,
    pub metric_per_hour: Tree,
    pub metric_per_day: Tree,
}

impl KvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        debug!("opened sled store, recovered={}", db.was_recovered());
        Ok(Self {
            monitoring: db.open_tree("monitoring")?,
            available_metrics: db.open_tree(TREE_AVAILABLE_METRICS)?,
            available_resources: db.open_tree(TREE_AVAILABLE_RESOURCES)?,
            metric_per_minute: db.open_tree(Resolution::Minute.tree_name())?,
            metric_per_hour: db.open_tree(Resolution::Hour.tree_name())?,
            metric_per_day: db.open_tree(Resolution::Day.tree_name())?,
            db,
        })
    }

    pub fn resolution_tree(&self, resolution: Resolution) -> &Tree {
        match resolution {
            Resolution::Minute => &self.metric_per_minute,
            Resolution::Hour => &self.metric_per_hour,
            Resolution::Day => &self.metric_per_day,
        }
    }

    /// Mirrors a directory-manager read-path `exists(name)` check: a
    /// resolution tree that was never opened for a write is reported as
    /// absent instead of being created implicitly, so the range planner can
    /// surface a `"<name> directory doesn't exist."` 503.
    pub fn resolution_tree_if_exists(&self, resolution: Resolution) -> bool {
        self.db
            .tree_names()
            .iter()
            .any(|name| name.as_ref() == resolution.tree_name().as_bytes())
    }
}
