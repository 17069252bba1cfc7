use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use chrono::{DateTime, Local, NaiveTime, TimeDelta};
use anyhow::Result;
use crate::{retry, BOOST_ACTIVE};
use crate::backup::{load_controller_state, save_controller_state, save_cycle_report, ControllerState};
use crate::cache::IterationCache;
use crate::config::Config;
use crate::coordinator::{ChargeCoordinator, ChargeExit, CycleAction};
use crate::errors::GridMinWorkerError;
use crate::initialization::Mgr;
use crate::minima::EnergyRate;
use crate::models::goodwe_gateway::OperationMode;

const REMOTE_BACKOFF_SECONDS: i64 = 150;
const RECHECK_HOUR: u32 = 14;
const TICK_SECONDS: i64 = 10;

/// The run loop: wait for each chosen price minimum, evaluate and charge
/// there, then move on to the next one.
///
/// # Arguments
///
/// * 'config' - the validated configuration
/// * 'mgr' - the managers
/// * 'terminate' - process wide terminate flag
pub fn run(config: &Config, mgr: &Mgr, terminate: &Arc<AtomicBool>) -> Result<(), GridMinWorkerError> {
    let coordinator = ChargeCoordinator::new(config, mgr, terminate);
    let mut cache = IterationCache::default();

    let mut upcoming = match load_controller_state(&config.files.backup_dir)? {
        Some(state) if state.upcoming.timestamp > Local::now() => {
            log::info!(
                "resuming wait for the minimum at {}",
                state.upcoming.timestamp.format("%Y-%m-%d %H:%M"),
            );
            state.upcoming
        }
        _ => {
            match with_backoff(mgr, terminate, || coordinator.find_upcoming_minimum(true, &mut cache))? {
                Some(minimum) => minimum,
                None => return shutdown(mgr),
            }
        }
    };

    loop {
        if terminate.load(Ordering::Relaxed) {
            break;
        }

        if upcoming.must_recheck {
            let recheck_at = recheck_time(Local::now());
            log::info!(
                "prices beyond the chosen minimum not yet published, rechecking at {}",
                recheck_at.format("%Y-%m-%d %H:%M"),
            );
            if !wait_until(recheck_at, terminate) {
                break;
            }

            cache = IterationCache::default();
            let refreshed = match with_backoff(mgr, terminate, || coordinator.find_upcoming_minimum(true, &mut cache))? {
                Some(minimum) => minimum,
                None => break,
            };

            // One recheck per cycle, whatever the refreshed minimum says
            upcoming = EnergyRate { must_recheck: false, ..refreshed };
        }

        if !wait_until(upcoming.timestamp, terminate) {
            break;
        }

        cache = IterationCache::default();
        let (next, report) = match with_backoff(mgr, terminate, || coordinator.run_cycle(upcoming, &mut cache))? {
            Some(outcome) => outcome,
            None => break,
        };

        if let CycleAction::Charged { exit: ChargeExit::DeviceUnresponsive, .. } = report.action {
            alert(
                mgr,
                "gridmin inverter unresponsive",
                "the inverter stopped answering during a charge, its operation mode may still be boost charge",
            );
        }

        if let Err(e) = save_cycle_report(&config.files.backup_dir, &report) {
            log::error!("could not save the cycle report: {}", e);
        }
        save_controller_state(&config.files.backup_dir, &ControllerState { upcoming: next })?;

        upcoming = next;
    }

    shutdown(mgr)
}

/// Sleeps in short ticks until the given instant or until the terminate
/// flag is raised, whichever comes first.
///
/// Returns false when terminated before the instant was reached.
///
/// # Arguments
///
/// * 'until' - the instant to wait for
/// * 'terminate' - process wide terminate flag
pub fn wait_until(until: DateTime<Local>, terminate: &Arc<AtomicBool>) -> bool {
    loop {
        if terminate.load(Ordering::Relaxed) {
            return false;
        }

        let left = until - Local::now();
        if left <= TimeDelta::zero() {
            return true;
        }

        let nap = left.min(TimeDelta::seconds(TICK_SECONDS));
        thread::sleep(nap.to_std().unwrap_or(std::time::Duration::ZERO));
    }
}

/// Logs an error and mails the operator, best effort.
///
/// # Arguments
///
/// * 'mgr' - managers holding the mail transport
/// * 'subject' - the mail subject
/// * 'body' - the mail body
pub fn alert(mgr: &Mgr, subject: &str, body: &str) {
    log::error!("{}: {}", subject, body);

    if let Err(e) = mgr.mail.send_mail(subject.to_string(), body.to_string()) {
        log::error!("could not send alert mail: {}", e);
    }
}

/// Runs one step, waiting out remote and device trouble.
///
/// Remote errors are logged and the step re-run after a backoff, device
/// errors additionally alert the operator. Anything else propagates.
/// Returns None when terminated while backing off.
///
/// # Arguments
///
/// * 'mgr' - managers, for the alert mail
/// * 'terminate' - process wide terminate flag
/// * 'step' - the step to run
fn with_backoff<T>(
    mgr: &Mgr,
    terminate: &Arc<AtomicBool>,
    mut step: impl FnMut() -> Result<T, GridMinWorkerError>,
) -> Result<Option<T>, GridMinWorkerError> {
    loop {
        if terminate.load(Ordering::Relaxed) {
            return Ok(None);
        }

        match step() {
            Ok(value) => return Ok(Some(value)),
            Err(GridMinWorkerError::Remote(msg)) => {
                log::warn!("remote service trouble, backing off: {}", msg);
            }
            Err(GridMinWorkerError::Device(msg)) => {
                alert(mgr, "gridmin inverter trouble", &msg);
            }
            Err(e) => return Err(e),
        }

        if !wait_until(Local::now() + TimeDelta::seconds(REMOTE_BACKOFF_SECONDS), terminate) {
            return Ok(None);
        }
    }
}

/// The next 14:00 local, today if still ahead, otherwise tomorrow.
///
/// # Arguments
///
/// * 'now' - the current date and time
fn recheck_time(now: DateTime<Local>) -> DateTime<Local> {
    let at_fourteen = NaiveTime::from_hms_opt(RECHECK_HOUR, 0, 0)
        .and_then(|t| now.with_time(t).single());

    match at_fourteen {
        Some(at) if at > now => at,
        Some(at) => at + TimeDelta::days(1),
        None => now + TimeDelta::hours(1),
    }
}

/// Restores the inverter if this process still has boost mode set, then
/// reports a clean stop.
fn shutdown(mgr: &Mgr) -> Result<(), GridMinWorkerError> {
    if *BOOST_ACTIVE.read()? {
        log::info!("terminating with boost charge active, restoring normal mode");
        if let Err(e) = retry!(||mgr.goodwe.set_operation_mode(OperationMode::Normal)) {
            alert(
                mgr,
                "gridmin stopped with boost charge set",
                &format!("could not restore normal inverter mode while stopping: {}", e),
            );
        }
    }

    log::info!("worker stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use super::*;

    #[test]
    fn test_recheck_later_same_day() {
        let now = Local.with_ymd_and_hms(2026, 8, 24, 9, 30, 0).unwrap();
        let at = recheck_time(now);

        assert_eq!(at, Local.with_ymd_and_hms(2026, 8, 24, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_recheck_rolls_to_next_day() {
        let now = Local.with_ymd_and_hms(2026, 8, 24, 15, 30, 0).unwrap();
        let at = recheck_time(now);

        assert_eq!(at, Local.with_ymd_and_hms(2026, 8, 25, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_wait_reaches_near_instant() {
        let terminate = Arc::new(AtomicBool::new(false));

        assert!(wait_until(Local::now() + TimeDelta::milliseconds(20), &terminate));
    }

    #[test]
    fn test_wait_cut_short_by_terminate() {
        let terminate = Arc::new(AtomicBool::new(true));

        assert!(!wait_until(Local::now() + TimeDelta::hours(1), &terminate));
    }
}
