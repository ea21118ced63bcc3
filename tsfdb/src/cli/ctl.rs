//
// Copyright (c) tsfdb contributors
// See License.txt for details
use std::{fs, io::Read, path::Path};

use argh::FromArgs;
use eyre::{eyre, Context, Result};
use log::LevelFilter;

use crate::cli::client::TsfdbClient;
use crate::cli::init_logger;
use crate::config::Config;

#[derive(FromArgs)]
/// Command-line client for tsfdbd: submit line-protocol batches and run range queries.
struct TsfdbctlArgs {
    #[argh(subcommand)]
    command: TsfdbctlCommand,

    /// use configuration file
    #[argh(option, short = 'c')]
    config_file: Option<String>,

    /// verbose output
    #[argh(switch, short = 'V')]
    verbose: bool,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum TsfdbctlCommand {
    Write(WriteArgs),
    Fetch(FetchArgs),
}

#[derive(FromArgs)]
/// submit a line-protocol batch
#[argh(subcommand, name = "write")]
struct WriteArgs {
    /// read the batch from this file instead of stdin
    #[argh(option)]
    file: Option<String>,
}

#[derive(FromArgs)]
/// run a range query
#[argh(subcommand, name = "fetch")]
struct FetchArgs {
    /// resource[.metric_expr], e.g. "host-a.cpu.*"
    #[argh(positional)]
    path: String,

    /// start of the range: empty, absolute, or relative ("-10m")
    #[argh(option, default = "String::new()")]
    start: String,

    /// end of the range: empty, absolute, or relative
    #[argh(option, default = "String::new()")]
    stop: String,

    /// accepted for interface parity with the render API; unused
    #[argh(option, default = "String::new()")]
    step: String,
}

pub fn main() -> Result<()> {
    let args: TsfdbctlArgs = argh::from_env();
    let config_path = args.config_file.as_ref().map(Path::new);
    init_logger(if args.verbose { LevelFilter::Trace } else { LevelFilter::Warn });

    let config = Config::load(config_path).wrap_err("unable to load configuration")?;
    let client = TsfdbClient::from_config(&config)?;

    match args.command {
        TsfdbctlCommand::Write(write_args) => write(&client, write_args),
        TsfdbctlCommand::Fetch(fetch_args) => fetch(&client, fetch_args),
    }
}

fn write(client: &TsfdbClient, args: WriteArgs) -> Result<()> {
    let batch = match args.file {
        Some(path) => fs::read_to_string(&path).wrap_err_with(|| format!("reading {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).wrap_err("reading stdin")?;
            buf
        }
    };
    client.write(&batch).map_err(|e| eyre!("write failed: {e:#}"))
}

fn fetch(client: &TsfdbClient, args: FetchArgs) -> Result<()> {
    let result = client.fetch(&args.path, &args.start, &args.stop, &args.step)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
