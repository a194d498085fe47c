#![warn(clippy::all, clippy::pedantic)]

mod dump;
mod inspect;
mod roundtrip;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dump::{dump, Dump};
use inspect::{inspect, Inspect};
use roundtrip::{roundtrip, Roundtrip};

#[derive(Parser)]
#[clap(version = "0.1.0")]
struct Opts {
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Inspect(Inspect),
    Dump(Dump),
    Roundtrip(Roundtrip),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    let result = match opts.subcommand {
        SubCommand::Inspect(opts) => inspect(&opts),
        SubCommand::Dump(opts) => dump(&opts),
        SubCommand::Roundtrip(opts) => roundtrip(&opts),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
