use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod cli;
mod console;
mod error;
mod link;
mod monitor;
mod port;
mod proto;
mod send;
mod session;
mod stats;
mod status;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.debug);
    match args.cmd {
        cli::Cmd::Ports => list_ports(),
        cli::Cmd::Monitor(opts) => monitor::run(opts),
        cli::Cmd::Send(opts) => send::run(opts),
        cli::Cmd::Console(opts) => console::run(opts),
    }
}

/// Logs go to stderr; stdout carries board output only. `RUST_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn list_ports() -> Result<()> {
    let ports = port::list_ports();
    if ports.is_empty() {
        warn!("no serial ports detected; pass --dev to name one explicitly");
    }
    for p in ports {
        println!("{p}");
    }
    Ok(())
}
