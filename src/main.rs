#![allow(clippy::enum_variant_names)]

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser as _;
use tracing::debug;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod config;
mod digest;
mod ext;
mod monitor;
mod reporter;
mod scanner;
mod snapshot;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args);
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await?;

    Ok(())
}

fn setup_tracing(cli_args: &Cli) {
    let Some(level) = cli_args.log_level.to_tracing_level() else {
        return;
    };

    let builder = tracing_subscriber::fmt().with_max_level(level).compact();
    match &cli_args.log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
            Err(error) => {
                builder.init();
                tracing::warn!(
                    "Cannot open log file {}: {}, logging to standard output",
                    path.display(),
                    error
                );
            }
        },
        None => builder.init(),
    }
}
