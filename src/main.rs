use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use crate::config::load_config;
use crate::worker::alert;

mod absence;
mod backup;
mod cache;
mod config;
mod coordinator;
mod envelope;
mod errors;
mod initialization;
mod manager_goodwe;
mod manager_influx;
mod manager_mail;
mod manager_sems;
mod manager_solcast;
mod manager_sun;
mod manager_tibber;
mod minima;
mod models;
mod quantity;
mod snapshot;
mod worker;

/// True when the process must not touch the inverter.
pub static DEBUG_MODE: RwLock<bool> = RwLock::new(false);

/// True while this process has boost charge set on the inverter.
pub static BOOST_ACTIVE: RwLock<bool> = RwLock::new(false);

/// Runs a fallible call up to three times with a short pause in between,
/// yielding the last result.
#[macro_export]
macro_rules! retry {
    ($f:expr) => {{
        let mut result = $f();
        for _ in 1..3 {
            if result.is_ok() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_secs(10));
            result = $f();
        }
        result
    }};
}

fn main() -> ExitCode {
    let config_path = env::args().nth(1).unwrap_or("gridmin.toml".to_string());

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mgr = match initialization::init(&config) {
        Ok(mgr) => mgr,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let terminate = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&terminate)) {
            eprintln!("could not register the signal handler: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let snapshot_handle = snapshot::spawn(&config, &terminate);

    let code = match worker::run(&config, &mgr, &terminate) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            alert(&mgr, "gridmin stopped", &e.to_string());
            ExitCode::FAILURE
        }
    };

    terminate.store(true, Ordering::Relaxed);
    let _ = snapshot_handle.join();

    code
}
