mod commands;
mod loader;
mod runner;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use tracing::debug;

enum Error {
    Clap(clap::Error),
    Eyre(color_eyre::Report),
}

impl From<clap::Error> for Error {
    fn from(err: clap::Error) -> Self {
        Self::Clap(err)
    }
}

impl From<color_eyre::Report> for Error {
    fn from(err: color_eyre::Report) -> Self {
        Self::Eyre(err)
    }
}

#[derive(Debug, Parser)]
#[clap(version = "0.1.0", about = "Batch runner for AADL macro scripts", long_about = None)]
struct Opts {
    /// Log progress to stderr
    #[clap(short, long, action)]
    verbose: bool,
    #[clap(subcommand)]
    command: commands::Command,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            match err {
                Error::Clap(err) => err.print().expect("Error writing error"),
                Error::Eyre(err) => eprintln!("Error: {err:?}"),
            }
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32, Error> {
    install_eyre()?;
    let opts = Opts::try_parse()?;
    install_tracing(opts.verbose)?;
    debug!(?opts);

    opts.command.run(opts.verbose).map_err(From::from)
}

fn install_tracing(verbose: bool) -> color_eyre::Result<()> {
    let level = if verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::WARN
    };

    // Set global subscriber
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init()
        .map_err(|err| eyre!(err))
        .wrap_err("Failed to initialize tracing subscriber")
}

fn install_eyre() -> color_eyre::Result<()> {
    // Install color_eyre panic and error handlers
    color_eyre::config::HookBuilder::new()
        .display_env_section(false)
        .display_location_section(false)
        .install()
        .wrap_err("Failed to initialize eyre")
}
