pub mod errors;

use std::time::Duration;
use chrono::{DateTime, Local, TimeDelta};
use ureq::Agent;
use crate::config::SolcastParameters;
use crate::envelope::SolarTimeslot;
use crate::manager_solcast::errors::SolcastError;
use crate::models::solcast_forecast::ForecastResponse;
use crate::quantity::Power;

const REQUEST_DOMAIN: &str = "https://api.solcast.com.au";

pub struct Solcast {
    agent: Agent,
    api_key: String,
    rooftop_ids: Vec<String>,
}

impl Solcast {
    /// Returns a new instance of the Solcast struct
    ///
    /// # Arguments
    ///
    /// * 'config' - Solcast related configuration
    pub fn new(config: &SolcastParameters) -> Solcast {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = agent_config.into();

        let mut rooftop_ids = vec![config.rooftop_id.to_string()];
        if let Some(id) = &config.rooftop_id_2 {
            rooftop_ids.push(id.to_string());
        }

        Solcast { agent, api_key: config.api_key.to_string(), rooftop_ids }
    }

    /// Retrieves the production forecast for all configured rooftops as
    /// timeslots overlapping the given interval. Slots present on more than
    /// one rooftop are merged by adding their powers.
    ///
    /// # Arguments
    ///
    /// * 'from' - start of the interval of interest
    /// * 'to' - end of the interval of interest
    pub fn get_forecast(&self, from: DateTime<Local>, to: DateTime<Local>) -> Result<Vec<SolarTimeslot>, SolcastError> {
        let mut slots: Vec<SolarTimeslot> = Vec::new();

        for rooftop_id in &self.rooftop_ids {
            let url = format!("{}/rooftop_sites/{}/forecasts?format=json", REQUEST_DOMAIN, rooftop_id);

            let mut res = self.agent
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .call()?;

            let json = res.body_mut().read_to_string()?;
            let forecast: ForecastResponse = serde_json::from_str(&json)?;

            for entry in forecast.forecasts {
                let period = parse_period(&entry.period)?;
                let start = entry.period_end - period;
                if start < to && entry.period_end > from {
                    slots.push(SolarTimeslot {
                        start,
                        end: entry.period_end,
                        power: Power::from_kilo_watts(entry.pv_estimate),
                    });
                }
            }
        }

        Ok(merge_rooftops(slots))
    }
}

/// Parses an ISO 8601 duration of the form solcast uses, e.g. PT30M.
///
/// # Arguments
///
/// * 'period' - the duration string to parse
fn parse_period(period: &str) -> Result<TimeDelta, SolcastError> {
    let err = || SolcastError(format!("unexpected period format: {}", period));
    let amount = |digits: &str| digits.parse::<i64>().map_err(|_| err());

    let value = period.strip_prefix("PT").ok_or_else(err)?;

    if let Some(digits) = value.strip_suffix('H') {
        Ok(TimeDelta::hours(amount(digits)?))
    } else if let Some(digits) = value.strip_suffix('M') {
        Ok(TimeDelta::minutes(amount(digits)?))
    } else if let Some(digits) = value.strip_suffix('S') {
        Ok(TimeDelta::seconds(amount(digits)?))
    } else {
        Err(err())
    }
}

/// Adds up the power of timeslots covering the same period, so two rooftops
/// forecast for the same half hour come back as one slot.
///
/// # Arguments
///
/// * 'slots' - the collected timeslots of all rooftops
fn merge_rooftops(mut slots: Vec<SolarTimeslot>) -> Vec<SolarTimeslot> {
    slots.sort_by_key(|s| s.start);

    let mut merged: Vec<SolarTimeslot> = Vec::new();
    for slot in slots {
        match merged.last_mut() {
            Some(last) if last.start == slot.start && last.end == slot.end => {
                last.power = last.power + slot.power;
            }
            _ => merged.push(slot),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("PT30M").unwrap(), TimeDelta::minutes(30));
        assert_eq!(parse_period("PT1H").unwrap(), TimeDelta::hours(1));
        assert_eq!(parse_period("PT900S").unwrap(), TimeDelta::seconds(900));
    }

    #[test]
    fn test_parse_period_rejects_garbage() {
        assert!(parse_period("30M").is_err());
        assert!(parse_period("PT").is_err());
        assert!(parse_period("PTxM").is_err());
        assert!(parse_period("PT30Y").is_err());
        assert!(parse_period("PT30µ").is_err());
        assert!(parse_period("PTH").is_err());
    }

    #[test]
    fn test_merge_rooftops_adds_matching_slots() {
        let start = Local.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        let end = start + TimeDelta::minutes(30);
        let slots = vec![
            SolarTimeslot { start, end, power: Power::from_watts(1000.0) },
            SolarTimeslot { start: end, end: end + TimeDelta::minutes(30), power: Power::from_watts(800.0) },
            SolarTimeslot { start, end, power: Power::from_watts(500.0) },
        ];

        let merged = merge_rooftops(slots);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].power, Power::from_watts(1500.0));
        assert_eq!(merged[1].power, Power::from_watts(800.0));
    }
}
