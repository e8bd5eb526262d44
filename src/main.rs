//! Keyboard backlight daemon. Lights the keyboard while typing and turns it
//! off after a timeout
//!
//! There is no public code API for you to use! However, the command line
//! interface should be stable.

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use log::error;
use log::LevelFilter;
use signal_hook::consts::signal::SIGHUP;
use signal_hook::consts::signal::SIGINT;
use signal_hook::consts::signal::SIGTERM;

use crate::config::Config;
use crate::controller::ExitOutcome;

mod config;
mod controller;
mod discovery;
mod errors;
mod flags;
mod input;
mod led;
mod monitor;
mod state;
mod watcher;

fn main() -> ExitCode {
    let cli = match flags::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version end up here too. If stderr is gone there
            // is nowhere left to report to; clap's own exit() ignores it too.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let config = Config::try_from(cli);
    init_logging(config.as_ref().is_ok_and(|config| config.debug));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = register_signals(&shutdown) {
        error!("Failed to install signal handlers: {e}");
        return ExitCode::FAILURE;
    }

    match controller::run(&config, shutdown) {
        ExitOutcome::Clean => ExitCode::SUCCESS,
        ExitOutcome::Faulted(reason) => {
            error!("{reason:#}");
            ExitCode::FAILURE
        }
    }
}

/// Info by default, debug with `--debug`. `RUST_LOG` takes precedence.
fn init_logging(debug: bool) {
    env_logger::Builder::new()
        .filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();
}

/// Set `shutdown` on termination signals. A second SIGINT/SIGTERM exits right
/// away. Only signals count towards that, so a shutdown started by a fault
/// still joins the watcher.
fn register_signals(shutdown: &Arc<AtomicBool>) -> std::io::Result<Arc<AtomicBool>> {
    let signaled = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(sig, 1, Arc::clone(&signaled))?;
        signal_hook::flag::register(sig, Arc::clone(&signaled))?;
        signal_hook::flag::register(sig, Arc::clone(shutdown))?;
    }
    signal_hook::flag::register(SIGHUP, Arc::clone(shutdown))?;
    Ok(signaled)
}
