//
// Copyright (c) tsfdb contributors
// See License.txt for details
use std::path::Path;

use argh::FromArgs;
use eyre::{Context, Result};
use log::{info, LevelFilter};

use crate::cli::init_logger;
use crate::config::Config;
use crate::db::Db;
use crate::http_server::{FetchHandler, HealthHandler, HttpServer, IngestHandler};

#[derive(FromArgs)]
/// tsfdb daemon: ingests line-protocol batches and serves range queries over HTTP.
struct TsfdbdArgs {
    /// use configuration file
    #[argh(option, short = 'c')]
    config_file: Option<String>,

    /// verbose output
    #[argh(switch, short = 'V')]
    verbose: bool,

    /// quiet - no output
    #[argh(switch, short = 'q')]
    quiet: bool,
}

pub fn main() -> Result<()> {
    let args: TsfdbdArgs = argh::from_env();
    let config_path = args.config_file.as_ref().map(Path::new);

    init_logger(match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Off,
        (false, true) => LevelFilter::Trace,
        _ => LevelFilter::Info,
    });

    let config = Config::load(config_path).wrap_err("unable to load configuration")?;
    let db = Db::open(&config).wrap_err("unable to open store")?;

    let server = HttpServer::new(vec![
        Box::new(IngestHandler::new(db.clone())),
        Box::new(FetchHandler::new(db)),
        Box::new(HealthHandler),
    ]);
    server.start(config.http_addr).wrap_err("unable to start HTTP server")?;
    info!("tsfdbd listening on {}", config.http_addr);

    loop {
        std::thread::park();
    }
}
