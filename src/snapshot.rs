use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::{self, JoinHandle};
use chrono::{Local, TimeDelta};
use crate::config::Config;
use crate::manager_influx::Influx;
use crate::manager_solcast::Solcast;
use crate::worker::wait_until;

const FORECAST_HORIZON_HOURS: i64 = 48;

/// Spawns the background thread that periodically snapshots the solar
/// forecast into influxdb, independent of the charge cycles.
///
/// # Arguments
///
/// * 'config' - the validated configuration
/// * 'terminate' - process wide terminate flag
pub fn spawn(config: &Config, terminate: &Arc<AtomicBool>) -> JoinHandle<()> {
    let solcast = Solcast::new(&config.solcast);
    let influx = Influx::new(&config.influx);
    let interval = TimeDelta::minutes(config.general.snapshot_interval_minutes);
    let terminate = Arc::clone(terminate);

    thread::spawn(move || {
        loop {
            let now = Local::now();
            match solcast.get_forecast(now, now + TimeDelta::hours(FORECAST_HORIZON_HOURS)) {
                Ok(slots) => {
                    for slot in &slots {
                        influx.record_at("solar_forecast", &[("power_watts", slot.power.watts())], slot.start);
                    }
                    log::info!("snapshotted {} solar forecast slots", slots.len());
                }
                Err(e) => log::error!("could not snapshot the solar forecast: {}", e),
            }

            if !wait_until(Local::now() + interval, &terminate) {
                break;
            }
        }
    })
}
