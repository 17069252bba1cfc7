use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use chrono::{DateTime, DurationRound, Local, TimeDelta};
use serde::Serialize;
use crate::{retry, BOOST_ACTIVE, DEBUG_MODE};
use crate::absence::AbsenceWindow;
use crate::cache::IterationCache;
use crate::config::Config;
use crate::envelope::{project, SolarTimeslot};
use crate::errors::GridMinWorkerError;
use crate::initialization::Mgr;
use crate::manager_influx::Influx;
use crate::manager_sems::Sems;
use crate::manager_sun;
use crate::minima::{aggregate_to_hourly, next_minimum, rates_before_and_after_spike, EnergyRate, MinimaError};
use crate::models::goodwe_gateway::OperationMode;
use crate::quantity::{EnergyAmount, Power, StateOfCharge};
use crate::worker::wait_until;

const POLL_MINUTES: i64 = 5;
const QUARTER_MINUTES: i64 = 15;
const SETTLE_MINUTES: i64 = 20;
const MAX_READ_FAILURES: u32 = 3;
const FORECAST_HORIZON_HOURS: i64 = 48;

/// Projections reaching past the published price horizon get a safety
/// margin on consumption, tomorrow may turn out worse than the average.
const RECHECK_CONSUMPTION_FACTOR: f64 = 1.2;

/// How a charge attempt against the inverter ended.
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub enum ChargeExit {
    TargetReached,
    DeadlineReached,
    ExternalOverride,
    DeviceUnresponsive,
    Terminated,
}

impl ChargeExit {
    /// True when the attempt ran to its natural end rather than being
    /// cut short from outside.
    pub fn completed(&self) -> bool {
        matches!(self, ChargeExit::TargetReached | ChargeExit::DeadlineReached)
    }
}

/// What an evaluation cycle decided and how it played out.
#[derive(Serialize, Debug)]
pub enum CycleAction {
    NoCharge { reason: String },
    Charged { target: u8, exit: ChargeExit, energy_bought_wh: Option<f64> },
}

/// Record of one completed evaluation cycle, saved to the backup
/// directory for after the fact inspection.
#[derive(Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Local>,
    pub minimum: EnergyRate,
    pub next_minimum: EnergyRate,
    pub soc_before: u8,
    pub action: CycleAction,
}

/// Tracks grid energy bought across one charge attempt.
///
/// Begin before the inverter goes to boost mode, commit on every exit
/// path. The portal day totals trail the meter, so commit waits for a
/// settle delay before reading them again.
#[must_use]
pub struct EnergyBoughtRecorder {
    started: DateTime<Local>,
    bought_before: EnergyAmount,
}

impl EnergyBoughtRecorder {
    /// Snapshots the grid bought day total before charging starts.
    ///
    /// # Arguments
    ///
    /// * 'sems' - portal manager to read the total from
    pub fn begin(sems: &Sems) -> Result<EnergyBoughtRecorder, GridMinWorkerError> {
        let bought_before = retry!(||sems.get_energy_bought(0))?;

        Ok(EnergyBoughtRecorder {
            started: Local::now(),
            bought_before,
        })
    }

    /// Reads the grid bought totals again and records the delta.
    ///
    /// Failures are logged and swallowed, bookkeeping never interferes
    /// with charging.
    ///
    /// # Arguments
    ///
    /// * 'sems' - portal manager to read the totals from
    /// * 'influx' - metrics sink for the result
    /// * 'terminate' - process wide terminate flag, cuts the settle delay short
    pub fn commit(self, sems: &Sems, influx: &Influx, terminate: &Arc<AtomicBool>) -> Option<EnergyAmount> {
        if !is_debug().unwrap_or(false) {
            if !wait_until(Local::now() + TimeDelta::minutes(SETTLE_MINUTES), terminate) {
                log::info!("terminate requested, reading energy bought without the settle delay");
            }
        }

        let today = match retry!(||sems.get_energy_bought(0)) {
            Ok(amount) => amount,
            Err(e) => {
                log::error!("could not read energy bought after charging: {}", e);
                return None;
            }
        };

        let yesterday = if self.started.date_naive() != Local::now().date_naive() {
            match retry!(||sems.get_energy_bought(1)) {
                Ok(amount) => Some(amount),
                Err(e) => {
                    log::error!("could not read energy bought for yesterday: {}", e);
                    return None;
                }
            }
        } else {
            None
        };

        let delta = split_over_midnight(self.bought_before, today, yesterday);

        influx.record("energy_bought", &[("watt_hours", delta.watt_hours())]);
        log::info!("bought {:.0} Wh from the grid during the charge", delta.watt_hours());

        Some(delta)
    }
}

/// Decides at each reached price minimum whether and how much to charge,
/// and drives the inverter through the attempt.
pub struct ChargeCoordinator<'a> {
    config: &'a Config,
    mgr: &'a Mgr,
    terminate: &'a Arc<AtomicBool>,
}

impl<'a> ChargeCoordinator<'a> {
    pub fn new(config: &'a Config, mgr: &'a Mgr, terminate: &'a Arc<AtomicBool>) -> ChargeCoordinator<'a> {
        ChargeCoordinator { config, mgr, terminate }
    }

    /// Fetches upcoming rates and picks the next price minimum to wait for.
    ///
    /// # Arguments
    ///
    /// * 'first_iteration' - true on startup and at a recheck, allows an early dip to be skipped
    /// * 'cache' - memo of what this cycle already fetched
    pub fn find_upcoming_minimum(&self, first_iteration: bool, cache: &mut IterationCache) -> Result<EnergyRate, GridMinWorkerError> {
        let rates = self.upcoming_rates(cache)?;
        let minimum = next_minimum(&rates, first_iteration)?;

        log::info!(
            "upcoming price minimum {} at {:.4}, charge window {} h{}",
            minimum.timestamp.format("%Y-%m-%d %H:%M"),
            minimum.rate,
            minimum.max_charge_duration.num_hours(),
            if minimum.must_recheck { ", recheck pending" } else { "" },
        );

        Ok(minimum)
    }

    /// Runs one full evaluation cycle at a reached price minimum.
    ///
    /// Returns the next minimum to wait for together with a report of
    /// what this cycle did.
    ///
    /// # Arguments
    ///
    /// * 'current' - the price minimum that was just reached
    /// * 'cache' - memo of what this cycle already fetched
    pub fn run_cycle(&self, current: EnergyRate, cache: &mut IterationCache) -> Result<(EnergyRate, CycleReport), GridMinWorkerError> {
        let started_at = Local::now();

        let rates = self.upcoming_rates(cache)?;
        let next = next_minimum(&rates, false)?;

        let soc = retry!(||self.mgr.goodwe.get_current_soc())?;
        log::info!(
            "evaluating at rate {:.4}, soc {}%, next minimum {} at {:.4}",
            current.rate, soc, next.timestamp.format("%Y-%m-%d %H:%M"), next.rate,
        );

        let action = self.evaluate(current, next, soc, cache)?;

        let report = CycleReport {
            started_at,
            minimum: current,
            next_minimum: next,
            soc_before: soc,
            action,
        };

        Ok((next, report))
    }

    /// The decision ladder for one reached minimum:
    /// * soc already at the maximum target: nothing to do
    /// * projected floor holds to the next minimum: only charge when the
    ///   current hour is cheaper than the next minimum, and then as much
    ///   as fits without throwing away solar before sunset
    /// * floor breached but a charge now bridges it: minimal sufficient charge
    /// * not even a full battery bridges it: full charge plus spike riding
    fn evaluate(&self, current: EnergyRate, next: EnergyRate, soc: u8, cache: &mut IterationCache) -> Result<CycleAction, GridMinWorkerError> {
        let capacity = self.config.battery.capacity();
        let target_min = self.config.battery.target_min_soc;
        let target_max = self.config.battery.target_max_soc;

        if soc >= target_max {
            log::info!("soc {}% already at or above the maximum target {}%", soc, target_max);
            return Ok(CycleAction::NoCharge { reason: "soc already at the maximum target".to_string() });
        }

        let consumption = self.average_consumption(cache, next.must_recheck)?;
        let solar = self.solar_data(cache)?;

        let now = Local::now();
        let start_soc = StateOfCharge::from_percentage(soc as f64, capacity);
        let envelope = project(now, next.timestamp, consumption, start_soc, &solar, capacity)?;
        let lower = envelope.lower.percentage(capacity);

        if lower >= target_min as f64 {
            if current.rate >= next.rate {
                log::info!("floor holds to the next minimum and that one is cheaper, deferring");
                return Ok(CycleAction::NoCharge { reason: "next minimum is cheaper or equal".to_string() });
            }
            return self.maximize_charge(current, soc, consumption, &solar);
        }

        let from_full = project(
            now,
            next.timestamp,
            consumption,
            StateOfCharge::from_percentage(target_max as f64, capacity),
            &solar,
            capacity,
        )?;

        if from_full.lower.percentage(capacity) >= target_min as f64 {
            let target = minimal_target(soc, lower, target_min, target_max);
            log::info!("floor breached before the next minimum, charging to {}%", target);

            let (exit, bought) = self.charge_attempt(target, &current)?;
            return Ok(charged(target, exit, bought));
        }

        self.ride_out_spike(current, next, consumption, &solar, cache)
    }

    /// Charges as much as fits on a cheap hour without pushing the upper
    /// projection past a full battery before the coming sunset.
    fn maximize_charge(&self, current: EnergyRate, soc: u8, consumption: Power, solar: &[SolarTimeslot]) -> Result<CycleAction, GridMinWorkerError> {
        let capacity = self.config.battery.capacity();
        let target_max = self.config.battery.target_max_soc;
        let now = Local::now();

        let sunset = manager_sun::next_sunset(now, self.config.geo_ref.lat, self.config.geo_ref.long);
        let to_sunset = project(
            now,
            sunset,
            consumption,
            StateOfCharge::from_percentage(soc as f64, capacity),
            solar,
            capacity,
        )?;

        let headroom = 100.0 - to_sunset.upper.percentage(capacity);
        let target = ((soc as f64 + headroom).floor() as u8).min(target_max);

        if target <= soc {
            log::info!("solar alone fills the battery before sunset, not charging");
            return Ok(CycleAction::NoCharge { reason: "solar fills the battery before sunset".to_string() });
        }

        log::info!("cheap hour, charging to {}% while leaving room for solar", target);

        let (exit, bought) = self.charge_attempt(target, &current)?;
        Ok(charged(target, exit, bought))
    }

    /// Full charge now, then bridge the price spike between here and the
    /// next minimum with minimal top ups on its cheaper flanks.
    fn ride_out_spike(&self, current: EnergyRate, next: EnergyRate, consumption: Power, solar: &[SolarTimeslot], cache: &mut IterationCache) -> Result<CycleAction, GridMinWorkerError> {
        let capacity = self.config.battery.capacity();
        let target_min = self.config.battery.target_min_soc;
        let target_max = self.config.battery.target_max_soc;

        log::info!("a full charge does not bridge to the next minimum, riding out the spike in between");

        let (full_exit, bought) = self.charge_attempt(target_max, &current)?;
        let mut bought_total = bought;
        if !full_exit.completed() {
            return Ok(charged(target_max, full_exit, bought_total));
        }

        let window: Vec<EnergyRate> = self.upcoming_rates(cache)?
            .into_iter()
            .filter(|r| r.timestamp < next.timestamp)
            .collect();

        let (before, after) = match rates_before_and_after_spike(&window) {
            Ok(flanks) => flanks,
            Err(MinimaError::NoSpikeFound) => {
                log::warn!("no price spike found on the way to the next minimum, keeping the full charge");
                return Ok(charged(target_max, full_exit, bought_total));
            }
            Err(e) => return Err(e.into()),
        };

        if !wait_until(before.timestamp, self.terminate) {
            return Ok(charged(target_max, ChargeExit::Terminated, bought_total));
        }

        // A cheaper hour right after the spike means a small bridge now and
        // the rest there, instead of one large charge at the current rate
        if after.rate < before.rate {
            let soc = retry!(||self.mgr.goodwe.get_current_soc())?;
            let to_after = project(
                Local::now(),
                after.timestamp,
                consumption,
                StateOfCharge::from_percentage(soc as f64, capacity),
                solar,
                capacity,
            )?;
            let lower = to_after.lower.percentage(capacity);

            if lower < target_min as f64 {
                let target = minimal_target(soc, lower, target_min, target_max);
                log::info!("bridging the spike with a top up to {}%", target);

                let (exit, topped) = self.charge_attempt(target, &before)?;
                bought_total = merge_bought(bought_total, topped);
                if !exit.completed() {
                    return Ok(charged(target, exit, bought_total));
                }
            }
        }

        if !wait_until(after.timestamp, self.terminate) {
            return Ok(charged(target_max, ChargeExit::Terminated, bought_total));
        }

        let soc = retry!(||self.mgr.goodwe.get_current_soc())?;
        let to_next = project(
            Local::now(),
            next.timestamp,
            consumption,
            StateOfCharge::from_percentage(soc as f64, capacity),
            solar,
            capacity,
        )?;
        let lower = to_next.lower.percentage(capacity);

        if lower < target_min as f64 {
            let target = minimal_target(soc, lower, target_min, target_max);
            log::info!("charging to {}% after the spike to reach the next minimum", target);

            let (exit, topped) = self.charge_attempt(target, &after)?;
            bought_total = merge_bought(bought_total, topped);
            return Ok(charged(target, exit, bought_total));
        }

        Ok(charged(target_max, full_exit, bought_total))
    }

    /// One charge attempt bracketed by energy bought bookkeeping.
    ///
    /// # Arguments
    ///
    /// * 'target' - the soc percentage to charge to
    /// * 'anchor' - the rate hour the attempt belongs to, start and window come from it
    fn charge_attempt(&self, target: u8, anchor: &EnergyRate) -> Result<(ChargeExit, Option<EnergyAmount>), GridMinWorkerError> {
        let recorder = EnergyBoughtRecorder::begin(&self.mgr.sems)?;
        let exit = self.execute_charge(target, anchor.timestamp, anchor.max_charge_duration)?;
        let bought = recorder.commit(&self.mgr.sems, &self.mgr.influx, self.terminate);

        Ok((exit, bought))
    }

    /// Runs one boost charge against the inverter until the target soc,
    /// the deadline or an outside event ends it.
    ///
    /// The deadline is the quarter hour floor of anchor + max_duration,
    /// with the anchor never placed in the past. Polls run on a five
    /// minute wall clock grid, mode first, then soc.
    ///
    /// # Arguments
    ///
    /// * 'target' - the soc percentage to charge to
    /// * 'anchor' - when the charge window opens
    /// * 'max_duration' - how long the cheap window lasts
    fn execute_charge(&self, target: u8, anchor: DateTime<Local>, max_duration: TimeDelta) -> Result<ChargeExit, GridMinWorkerError> {
        let soc = retry!(||self.mgr.goodwe.get_current_soc())?;
        if soc >= target {
            return Ok(ChargeExit::TargetReached);
        }

        let start = anchor.max(Local::now());
        let deadline = (start + max_duration).duration_trunc(TimeDelta::minutes(QUARTER_MINUTES))?;

        if is_debug()? {
            log::info!("debug mode, pretending to charge to {}% until {}", target, deadline.format("%H:%M"));
            return Ok(ChargeExit::TargetReached);
        }

        log::info!("boost charging from {}% to {}% with deadline {}", soc, target, deadline.format("%H:%M"));

        *BOOST_ACTIVE.write()? = true;
        let _ = retry!(||self.mgr.goodwe.set_operation_mode(OperationMode::BoostCharge))?;

        let mut failures: u32 = 0;

        loop {
            let now = Local::now();
            if now >= deadline {
                self.restore_normal_mode();
                return Ok(ChargeExit::DeadlineReached);
            }

            let next_poll = now.duration_trunc(TimeDelta::minutes(POLL_MINUTES))? + TimeDelta::minutes(POLL_MINUTES);
            if !wait_until(next_poll.min(deadline), self.terminate) {
                self.restore_normal_mode();
                return Ok(ChargeExit::Terminated);
            }

            // Mode first, an outside change means someone else took over
            match self.mgr.goodwe.get_operation_mode() {
                Ok(mode) if mode != OperationMode::BoostCharge => {
                    log::warn!("inverter mode changed to {} from outside, standing down", mode);
                    *BOOST_ACTIVE.write()? = false;
                    return Ok(ChargeExit::ExternalOverride);
                }
                Ok(_) => {}
                Err(e) => {
                    failures += 1;
                    log::warn!("inverter read failed ({} in a row): {}", failures, e);
                    if failures >= MAX_READ_FAILURES {
                        return Ok(ChargeExit::DeviceUnresponsive);
                    }
                    continue;
                }
            }

            match self.mgr.goodwe.get_current_soc() {
                Ok(soc) => {
                    failures = 0;
                    log::info!("boost charge at {}%, target {}%", soc, target);
                    if soc >= target {
                        self.restore_normal_mode();
                        return Ok(ChargeExit::TargetReached);
                    }
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("inverter read failed ({} in a row): {}", failures, e);
                    if failures >= MAX_READ_FAILURES {
                        return Ok(ChargeExit::DeviceUnresponsive);
                    }
                }
            }
        }
    }

    /// Puts the inverter back in normal mode, best effort.
    ///
    /// The boost flag stays set on failure so the shutdown path gets
    /// another go at restoring the mode.
    fn restore_normal_mode(&self) {
        match retry!(||self.mgr.goodwe.set_operation_mode(OperationMode::Normal)) {
            Ok(()) => {
                if let Ok(mut active) = BOOST_ACTIVE.write() {
                    *active = false;
                }
            }
            Err(e) => log::error!("could not restore normal inverter mode: {}", e),
        }
    }

    fn upcoming_rates(&self, cache: &mut IterationCache) -> Result<Vec<EnergyRate>, GridMinWorkerError> {
        if let Some(rates) = &cache.upcoming_rates {
            return Ok(rates.clone());
        }

        let rates = aggregate_to_hourly(&self.mgr.tibber.get_upcoming_rates()?)?;
        cache.upcoming_rates = Some(rates.clone());

        Ok(rates)
    }

    /// Household draw for the projections, memoizing the portal average
    /// for the cycle.
    fn average_consumption(&self, cache: &mut IterationCache, must_recheck: bool) -> Result<Power, GridMinWorkerError> {
        projected_consumption(
            self.config.absence_window.as_ref(),
            self.config.absence.power_watts,
            Local::now(),
            must_recheck,
            || match cache.average_consumption {
                Some(power) => Ok(power),
                None => {
                    let power = self.mgr.sems.get_average_consumption()?;
                    cache.average_consumption = Some(power);
                    Ok(power)
                }
            },
        )
    }

    fn solar_data(&self, cache: &mut IterationCache) -> Result<Vec<SolarTimeslot>, GridMinWorkerError> {
        if let Some(slots) = &cache.solar_data {
            return Ok(slots.clone());
        }

        let now = Local::now();
        let slots = self.mgr.solcast.get_forecast(now, now + TimeDelta::hours(FORECAST_HORIZON_HOURS))?;
        cache.solar_data = Some(slots.clone());

        Ok(slots)
    }
}

fn is_debug() -> Result<bool, GridMinWorkerError> {
    Ok(*DEBUG_MODE.read()?)
}

fn charged(target: u8, exit: ChargeExit, bought: Option<EnergyAmount>) -> CycleAction {
    CycleAction::Charged {
        target,
        exit,
        energy_bought_wh: bought.map(|b| b.watt_hours()),
    }
}

/// Household draw to project with for one evaluation.
///
/// An active absence window replaces the portal average with the
/// configured flat power. A pending recheck then raises whichever base
/// was chosen by the safety factor, absences included.
///
/// # Arguments
///
/// * 'window' - the configured absence window, if any
/// * 'absence_watts' - flat draw to assume while nobody is home
/// * 'now' - decides whether the window is active
/// * 'must_recheck' - whether the projection may run past the price horizon
/// * 'portal_average' - fetches the measured average when no absence is active
fn projected_consumption<F>(
    window: Option<&AbsenceWindow>,
    absence_watts: f64,
    now: DateTime<Local>,
    must_recheck: bool,
    portal_average: F,
) -> Result<Power, GridMinWorkerError>
where
    F: FnOnce() -> Result<Power, GridMinWorkerError>,
{
    let base = match window {
        Some(window) if window.is_active(now) => {
            log::info!("absence window active, using flat {} W consumption", absence_watts);
            Power::from_watts(absence_watts)
        }
        _ => portal_average()?,
    };

    if must_recheck {
        Ok(base * RECHECK_CONSUMPTION_FACTOR)
    } else {
        Ok(base)
    }
}

/// Smallest whole percent target that lifts the projected lower bound
/// back to the configured minimum.
///
/// # Arguments
///
/// * 'soc' - current state of charge in percent
/// * 'projected_lower' - the projected lower bound in percent
/// * 'target_min' - the configured floor in percent
/// * 'target_max' - the configured ceiling in percent
fn minimal_target(soc: u8, projected_lower: f64, target_min: u8, target_max: u8) -> u8 {
    let deficit = target_min as f64 - projected_lower;
    let target = (soc as f64 + deficit).ceil() as u8;

    target.min(target_max)
}

/// Grid bought delta across a charge, handling the day counter reset
/// at midnight.
///
/// # Arguments
///
/// * 'before' - the day total when the charge began
/// * 'today' - the day total at reading time
/// * 'yesterday' - the previous day total when midnight passed during the charge
fn split_over_midnight(before: EnergyAmount, today: EnergyAmount, yesterday: Option<EnergyAmount>) -> EnergyAmount {
    match yesterday {
        Some(full_day) => today + (full_day - before),
        None => today - before,
    }
}

fn merge_bought(a: Option<EnergyAmount>, b: Option<EnergyAmount>) -> Option<EnergyAmount> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_minimal_target_covers_deficit() {
        assert_eq!(minimal_target(40, 25.0, 30, 95), 45);
    }

    #[test]
    fn test_minimal_target_rounds_up() {
        assert_eq!(minimal_target(40, 25.4, 30, 95), 45);
    }

    #[test]
    fn test_minimal_target_caps_at_maximum() {
        assert_eq!(minimal_target(90, 10.0, 30, 95), 95);
    }

    #[test]
    fn test_split_within_one_day() {
        let delta = split_over_midnight(
            EnergyAmount::from_kilo_watt_hours(4.0),
            EnergyAmount::from_kilo_watt_hours(5.2),
            None,
        );

        assert_abs_diff_eq!(delta.kilo_watt_hours(), 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_split_across_midnight() {
        // Day total stood at 7.5 when the charge began, yesterday closed
        // at 8.0 and the new day has counted 0.6 so far
        let delta = split_over_midnight(
            EnergyAmount::from_kilo_watt_hours(7.5),
            EnergyAmount::from_kilo_watt_hours(0.6),
            Some(EnergyAmount::from_kilo_watt_hours(8.0)),
        );

        assert_abs_diff_eq!(delta.kilo_watt_hours(), 1.1, epsilon = 1e-9);
    }

    #[test]
    fn test_merge_bought_sums_partial_reads() {
        let one = EnergyAmount::from_watt_hours(500.0);
        let two = EnergyAmount::from_watt_hours(250.0);

        assert!(merge_bought(None, None).is_none());
        assert_abs_diff_eq!(merge_bought(Some(one), None).unwrap().watt_hours(), 500.0);
        assert_abs_diff_eq!(merge_bought(Some(one), Some(two)).unwrap().watt_hours(), 750.0);
    }

    #[test]
    fn test_exit_completion() {
        assert!(ChargeExit::TargetReached.completed());
        assert!(ChargeExit::DeadlineReached.completed());
        assert!(!ChargeExit::ExternalOverride.completed());
        assert!(!ChargeExit::DeviceUnresponsive.completed());
        assert!(!ChargeExit::Terminated.completed());
    }

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 24, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_recheck_raises_portal_consumption() {
        let portal = || Ok(Power::from_watts(400.0));

        let raised = projected_consumption(None, 150.0, at(12), true, portal).unwrap();
        assert_abs_diff_eq!(raised.watts(), 480.0, epsilon = 1e-9);

        let plain = projected_consumption(None, 150.0, at(12), false, portal).unwrap();
        assert_abs_diff_eq!(plain.watts(), 400.0);
    }

    #[test]
    fn test_recheck_raises_absence_consumption() {
        let window = AbsenceWindow { start: at(10), end: at(20) };
        let portal = || Ok(Power::from_watts(400.0));

        let raised = projected_consumption(Some(&window), 150.0, at(12), true, portal).unwrap();
        assert_abs_diff_eq!(raised.watts(), 180.0, epsilon = 1e-9);

        let plain = projected_consumption(Some(&window), 150.0, at(12), false, portal).unwrap();
        assert_abs_diff_eq!(plain.watts(), 150.0);
    }

    #[test]
    fn test_inactive_absence_window_uses_portal_average() {
        let window = AbsenceWindow { start: at(10), end: at(20) };

        let consumption = projected_consumption(Some(&window), 150.0, at(21), false, || Ok(Power::from_watts(400.0))).unwrap();
        assert_abs_diff_eq!(consumption.watts(), 400.0);
    }
}
