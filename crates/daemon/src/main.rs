// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printernizer daemon (printernizerd)
//!
//! Long-running fleet supervisor: loads the fleet inventory, brings up the
//! drivers/monitors/background tasks, and runs until SIGTERM/SIGINT.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::time::Duration;

use printernizer_daemon::{fleet::FleetConfig, health, lifecycle};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

const DEFAULT_FLEET_FILE: &str = "printernizer.toml";
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Fleet file resolution: first CLI argument, else `$PRINTERNIZER_FLEET`,
/// else `./printernizer.toml`.
fn fleet_path(arg: Option<String>, env_value: Option<String>) -> PathBuf {
    arg.or(env_value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FLEET_FILE))
}

fn print_help() {
    println!("printernizerd {}", env!("CARGO_PKG_VERSION"));
    println!("Printer fleet supervisor daemon");
    println!();
    println!("USAGE:");
    println!("    printernizerd [FLEET_FILE]");
    println!();
    println!("FLEET_FILE defaults to $PRINTERNIZER_FLEET, then ./{DEFAULT_FLEET_FILE}.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    PRINTERNIZER_FLEET      Fleet inventory file");
    println!("    PRINTERNIZER_LOG_DIR    Write daily-rotated logs here instead of stdout");
    println!("    RUST_LOG                Log filter (default: info)");
}

fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match std::env::var_os("PRINTERNIZER_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(Path::new(&dir), "printernizer.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arg = std::env::args().nth(1);
    match arg.as_deref() {
        Some("--version" | "-V" | "-v") => {
            println!("printernizerd {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("--help" | "-h" | "help") => {
            print_help();
            return Ok(());
        }
        Some(flag) if flag.starts_with('-') => {
            eprintln!("error: unexpected argument '{flag}'");
            eprintln!("Usage: printernizerd [FLEET_FILE]");
            std::process::exit(1);
        }
        _ => {}
    }

    let _log_guard = setup_logging();

    let path = fleet_path(arg, std::env::var("PRINTERNIZER_FLEET").ok());
    let fleet = match FleetConfig::load(&path) {
        Ok(fleet) => fleet,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load fleet inventory");
            return Err(e.into());
        }
    };
    info!(
        path = %path.display(),
        printers = fleet.printers.len(),
        watch_folders = fleet.watch_folders.len(),
        "starting fleet supervisor daemon"
    );

    let daemon = lifecycle::startup(fleet).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut health_tick = tokio::time::interval(HEALTH_LOG_INTERVAL);
    health_tick.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = health_tick.tick() => {
                let report = health::collect(&daemon);
                match serde_json::to_string(&report) {
                    Ok(json) => info!(health = %json, "health"),
                    Err(e) => error!(error = %e, "health report serialization failed"),
                }
            }
        }
    }

    lifecycle::shutdown(&daemon).await;
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
