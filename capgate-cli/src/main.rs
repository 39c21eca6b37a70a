//! `capgate`: drive permission-gated device actions from the terminal
//!
//! # Usage
//!
//! ```bash
//! # Save a remote image into the library directory
//! capgate --status media_library=granted save-url https://example.com/cat.jpg
//!
//! # Camera pick on a device where the camera was denied
//! capgate --device device.json --status camera=denied pick --camera
//!
//! # Follow the recent photos while files are added
//! capgate --library ~/Pictures/capgate watch
//! ```

mod cli;
mod commands;
mod device;
mod tracing_support;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::tracing_support::TracingConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_support::init_subscriber(&TracingConfig::from_verbosity(
        cli.verbose,
        cli.log_format,
    ));

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
