mod backend;
mod cli;
mod clock;
mod model;
mod orchestrator;
mod panel;
mod stream;
mod telemetry;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    // Read the local offset while the process is still single-threaded.
    clock::init_local_offset();

    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    let log_file = if is_headless {
        args.log_file.clone()
    } else {
        args.log_file.clone().or_else(telemetry::default_log_path)
    };
    // Never log to the terminal the TUI is drawing on.
    if is_headless || log_file.is_some() {
        telemetry::init_logging(log_file.as_deref())?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    match runtime.block_on(cli::run(args)) {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for headless modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_headless {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
