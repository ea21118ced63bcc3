//
// Copyright (c) tsfdb contributors
// See License.txt for details
//! Command-line entry points for the two binaries this crate ships:
//! `tsfdbd` (the daemon) and `tsfdbctl` (a thin client for it).
use eyre::eyre;
use log::LevelFilter;
use std::path::Path;
use stderrlog::{LogLevelNum, StdErrLog};

mod client;
mod ctl;
mod daemon;

fn build_logger(level: LevelFilter) -> StdErrLog {
    let mut log = stderrlog::new();
    log.module("tsfdb");
    log.verbosity(LogLevelNum::from(level));
    log
}

fn init_logger(level: LevelFilter) {
    build_logger(level).init().unwrap();
}

/// Dispatches on the invoked binary's own name: one `cli::main` fans out
/// to whichever of `tsfdbd`/`tsfdbctl` is actually running.
pub fn main() {
    let arg0 = std::env::args().next().unwrap();
    let cmd_name = Path::new(&arg0).file_name().expect("<command name>").to_str().unwrap();

    let result = match cmd_name {
        "tsfdbd" => daemon::main(),
        "tsfdbctl" => ctl::main(),
        _ => Err(eyre!("Unknown command: {}. Should be tsfdbd or tsfdbctl.", cmd_name)),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(-1);
    }
}
