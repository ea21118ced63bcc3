//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Process configuration: environment variables first, with an optional
//! JSON file overlay, read once at startup and carried around in an `Arc`.
use std::{env, fs, net::SocketAddr, path::PathBuf};

use eyre::{Context, Result};
use log::warn;
use serde::Deserialize;

use crate::aggregate::{AggregationModes, Mode};

const DEFAULT_DATA_DIR: &str = "./data/tsfdb.sled";
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8928";

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    http_addr: Option<String>,
    aggregate_minute: Option<String>,
    aggregate_hour: Option<String>,
    aggregate_day: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub http_addr: SocketAddr,
    pub aggregation_modes: AggregationModes,
}

impl Config {
    /// Reads `TSFDB_DATA_DIR`, `TSFDB_HTTP_ADDR`, and `AGGREGATE_MINUTE` /
    /// `AGGREGATE_HOUR` / `AGGREGATE_DAY` from the environment; if
    /// `config_path` points at a readable JSON file, its values fill in
    /// anything the environment left unset.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self> {
        let file = config_path
            .map(Self::read_config_file)
            .transpose()?
            .unwrap_or_default();

        let data_dir = env::var("TSFDB_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let http_addr_str = env::var("TSFDB_HTTP_ADDR")
            .ok()
            .or(file.http_addr)
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = http_addr_str
            .parse()
            .wrap_err_with(|| format!("invalid TSFDB_HTTP_ADDR: {http_addr_str}"))?;

        let aggregation_modes = AggregationModes {
            minute: Self::mode_from("AGGREGATE_MINUTE", file.aggregate_minute),
            hour: Self::mode_from("AGGREGATE_HOUR", file.aggregate_hour),
            day: Self::mode_from("AGGREGATE_DAY", file.aggregate_day),
        };

        Ok(Self { data_dir, http_addr, aggregation_modes })
    }

    fn mode_from(env_var: &str, file_value: Option<String>) -> Mode {
        let raw = env::var(env_var).ok().or(file_value);
        match raw {
            Some(raw) => Mode::from_env_value(&raw),
            None => Mode::Direct,
        }
    }

    fn read_config_file(path: &std::path::Path) -> Result<ConfigFile> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .wrap_err_with(|| format!("parsing config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("config file {} not found, using defaults", path.display());
                Ok(ConfigFile::default())
            }
            Err(e) => Err(e).wrap_err_with(|| format!("reading config file {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_set() {
        // SAFETY: tests run single-threaded within this process's env scope
        // by convention in this crate; no other test touches these vars.
        for var in ["TSFDB_DATA_DIR", "TSFDB_HTTP_ADDR", "AGGREGATE_MINUTE", "AGGREGATE_HOUR", "AGGREGATE_DAY"] {
            env::remove_var(var);
        }
        let config = Config::load(None).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.http_addr.to_string(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.aggregation_modes.minute, Mode::Direct);
    }

    #[test]
    fn reads_aggregate_modes_from_env() {
        env::set_var("AGGREGATE_MINUTE", "0");
        env::set_var("AGGREGATE_HOUR", "2");
        let config = Config::load(None).unwrap();
        assert_eq!(config.aggregation_modes.minute, Mode::Disabled);
        assert_eq!(config.aggregation_modes.hour, Mode::Chained);
        env::remove_var("AGGREGATE_MINUTE");
        env::remove_var("AGGREGATE_HOUR");
    }
}
