use chrono::{DateTime, DurationRound, Local, RoundingError, TimeDelta};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use thiserror::Error;

/// Rates within this absolute distance of each other count as the same price level.
const SAME_LEVEL_TOLERANCE: f64 = 0.001;

#[derive(Error, Debug)]
pub enum MinimaError {
    #[error("error while processing energy rates: {0}")]
    Rates(String),
    #[error("no price spike found above the series average")]
    NoSpikeFound,
}

impl From<RoundingError> for MinimaError {
    fn from(e: RoundingError) -> Self {
        MinimaError::Rates(e.to_string())
    }
}

/// One hour of electricity price together with what the charge planning
/// derived for it.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct EnergyRate {
    pub rate: f64,
    pub timestamp: DateTime<Local>,
    #[serde_as(as = "DurationSeconds<i64>")]
    pub max_charge_duration: TimeDelta,
    pub must_recheck: bool,
}

impl EnergyRate {
    pub fn new(rate: f64, timestamp: DateTime<Local>) -> EnergyRate {
        EnergyRate {
            rate,
            timestamp,
            max_charge_duration: TimeDelta::hours(1),
            must_recheck: false,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum Comp {
    End,
    Larger,
    Smaller,
    Equal,
    NA,
}

/// Buckets rates per clock hour and averages each bucket.
/// Hourly input passes through unchanged, finer grained markets get
/// the mean of their sub hourly entries per hour.
///
/// # Arguments
///
/// * 'rates' - the energy rates to aggregate, at hourly or finer granularity
pub fn aggregate_to_hourly(rates: &[EnergyRate]) -> Result<Vec<EnergyRate>, MinimaError> {
    if rates.is_empty() {
        return Err(MinimaError::Rates("no energy rates to aggregate".to_string()));
    }

    let mut sorted = rates.to_vec();
    sorted.sort_by_key(|r| r.timestamp);

    let mut hourly: Vec<EnergyRate> = Vec::new();
    let mut bucket: Option<(DateTime<Local>, f64, u32)> = None;

    for rate in &sorted {
        let hour = rate.timestamp.duration_trunc(TimeDelta::hours(1))?;
        match bucket.as_mut() {
            Some((start, sum, count)) if *start == hour => {
                *sum += rate.rate;
                *count += 1;
            }
            _ => {
                if let Some((start, sum, count)) = bucket.take() {
                    hourly.push(EnergyRate::new(sum / count as f64, start));
                }
                bucket = Some((hour, rate.rate, 1));
            }
        }
    }
    if let Some((start, sum, count)) = bucket {
        hourly.push(EnergyRate::new(sum / count as f64, start));
    }

    Ok(hourly)
}

/// Finds the indices where a local price minimum starts, scanning left to right.
/// A plateau of equal rates counts as one minimum located at its first index.
///
/// # Arguments
///
/// * 'rates' - the hourly energy rates to scan
fn find_valleys(rates: &[EnergyRate]) -> Vec<usize> {
    let mut valleys: Vec<usize> = Vec::new();

    let mut left: Comp;
    let mut right: Comp;
    let mut left_memory: Comp = Comp::NA;
    let mut plateau_start: usize = 0;

    for s in 0..rates.len() {
        // Compare with value to the left
        if s == 0 {
            left = Comp::End;
        } else if rates[s].rate > rates[s - 1].rate {
            left = Comp::Larger;
        } else if rates[s].rate < rates[s - 1].rate {
            left = Comp::Smaller;
        } else {
            left = Comp::Equal;
        }

        // Compare with value to the right
        if s == rates.len() - 1 {
            right = Comp::End;
        } else if rates[s].rate > rates[s + 1].rate {
            right = Comp::Larger;
        } else if rates[s].rate < rates[s + 1].rate {
            right = Comp::Smaller;
        } else {
            right = Comp::Equal;
        }

        // Match for saving left to memory (we are on a plateau of some sort), or for valleys
        match (left, right, left_memory) {
            (Comp::End, Comp::Equal, _) => {
                left_memory = Comp::End;
                plateau_start = s;
            }
            (Comp::Larger, Comp::Equal, _) => {
                left_memory = Comp::Larger;
                plateau_start = s;
            }
            (Comp::Smaller, Comp::Equal, _) => {
                left_memory = Comp::Smaller;
                plateau_start = s;
            }
            (Comp::Equal, Comp::Larger, Comp::Smaller) => left_memory = Comp::NA,
            (Comp::Equal, Comp::Smaller, Comp::Larger) => left_memory = Comp::NA,

            (Comp::End, Comp::Smaller, _) => valleys.push(s),
            (Comp::End, Comp::End, _) => valleys.push(s),
            (Comp::Smaller, r, _) if r == Comp::Smaller || r == Comp::End => valleys.push(s),
            (Comp::Equal, Comp::End, m) if m == Comp::Smaller || m == Comp::End => {
                valleys.push(plateau_start)
            }
            (Comp::Equal, Comp::Smaller, m) if m == Comp::Smaller || m == Comp::End => {
                valleys.push(plateau_start);
                left_memory = Comp::NA;
            }

            _ => (),
        }
    }

    valleys
}

/// Finds the next price minimum in the given hourly rates.
///
/// The first local minimum wins. On the first search of a fresh series the
/// scan additionally skips a minimum sitting at the very start of the series
/// when a lower one exists later within the same pricing day, settling on the
/// lowest rate of that day. The returned rate carries how long charging at
/// the same price level can go on and whether the choice should be rechecked
/// once the following day of rates gets published.
///
/// # Arguments
///
/// * 'rates' - the hourly energy rates to search
/// * 'first_iteration' - true when this is the first search over a fresh series
pub fn next_minimum(rates: &[EnergyRate], first_iteration: bool) -> Result<EnergyRate, MinimaError> {
    if rates.is_empty() {
        return Err(MinimaError::Rates("no energy rates to search for a minimum".to_string()));
    }

    let valleys = find_valleys(rates);
    let mut choice = match valleys.first() {
        Some(v) => *v,
        None => return Err(MinimaError::Rates("no price minimum found".to_string())),
    };

    if first_iteration && choice == 0 {
        let day = rates[0].timestamp.date_naive();
        for &v in &valleys {
            if rates[v].timestamp.date_naive() == day && rates[v].rate < rates[choice].rate {
                choice = v;
            }
        }
    }

    let chosen = rates[choice];
    let chosen_day = chosen.timestamp.date_naive();
    let must_recheck = !rates.iter().any(|r| r.timestamp.date_naive() > chosen_day);

    let mut max_charge_duration = TimeDelta::hours(1);
    let mut i = choice + 1;
    while i < rates.len() && (rates[i].rate - chosen.rate).abs() <= SAME_LEVEL_TOLERANCE {
        max_charge_duration = max_charge_duration + TimeDelta::hours(1);
        i += 1;
    }

    Ok(EnergyRate {
        rate: chosen.rate,
        timestamp: chosen.timestamp,
        max_charge_duration,
        must_recheck,
    })
}

/// Finds the rates flanking the first price spike in the series.
///
/// A spike is a contiguous run of rates strictly above the series average.
/// Returned are the last at or below average rate before the run and the
/// first at or below average rate after it. A run starting at the first
/// entry or running through the last entry cannot be flanked and is not
/// a usable spike.
///
/// # Arguments
///
/// * 'rates' - the hourly energy rates to scan
pub fn rates_before_and_after_spike(rates: &[EnergyRate]) -> Result<(EnergyRate, EnergyRate), MinimaError> {
    if rates.is_empty() {
        return Err(MinimaError::Rates("no energy rates to scan for a spike".to_string()));
    }

    let average = rates.iter().map(|r| r.rate).sum::<f64>() / rates.len() as f64;

    let mut i = 0;
    while i < rates.len() {
        if rates[i].rate > average {
            let run_start = i;
            while i < rates.len() && rates[i].rate > average {
                i += 1;
            }
            if run_start == 0 {
                continue;
            }
            if i == rates.len() {
                break;
            }
            return Ok((rates[run_start - 1], rates[i]));
        }
        i += 1;
    }

    Err(MinimaError::NoSpikeFound)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn series(rates: &[f64]) -> Vec<EnergyRate> {
        let base = Local.with_ymd_and_hms(2026, 8, 24, 10, 0, 0).unwrap();
        rates
            .iter()
            .enumerate()
            .map(|(i, r)| EnergyRate::new(*r, base + TimeDelta::hours(i as i64)))
            .collect()
    }

    #[test]
    fn test_aggregate_passes_hourly_through() {
        let rates = series(&[1.0, 2.0, 3.0]);
        let hourly = aggregate_to_hourly(&rates).unwrap();

        assert_eq!(hourly.len(), 3);
        assert_eq!(hourly[0].rate, 1.0);
        assert_eq!(hourly[0].timestamp, rates[0].timestamp);
    }

    #[test]
    fn test_aggregate_means_quarter_hours() {
        let base = Local.with_ymd_and_hms(2026, 8, 24, 10, 0, 0).unwrap();
        let mut rates = Vec::new();
        for (i, r) in [1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 20.0, 20.0].iter().enumerate() {
            rates.push(EnergyRate::new(*r, base + TimeDelta::minutes(15 * i as i64)));
        }

        let hourly = aggregate_to_hourly(&rates).unwrap();

        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].rate, 2.5);
        assert_eq!(hourly[0].timestamp, base);
        assert_eq!(hourly[1].rate, 15.0);
        assert_eq!(hourly[1].timestamp, base + TimeDelta::hours(1));
    }

    #[test]
    fn test_aggregate_keeps_flat_quarter_hours_flat() {
        let base = Local.with_ymd_and_hms(2026, 8, 24, 10, 0, 0).unwrap();
        let rates: Vec<EnergyRate> = (0..8)
            .map(|i| EnergyRate::new(0.5, base + TimeDelta::minutes(15 * i)))
            .collect();

        let hourly = aggregate_to_hourly(&rates).unwrap();

        assert_eq!(hourly.len(), 2);
        assert!(hourly.iter().all(|r| r.rate == 0.5));
    }

    #[test]
    fn test_aggregate_rejects_empty_input() {
        assert!(aggregate_to_hourly(&[]).is_err());
    }

    #[test]
    fn test_minimum_in_the_middle() {
        let rates = series(&[5.0, 4.0, 3.0, 4.0, 5.0]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.timestamp, rates[2].timestamp);
        assert_eq!(minimum.rate, 3.0);
    }

    #[test]
    fn test_plateau_reports_first_index() {
        let rates = series(&[5.0, 3.0, 3.0, 3.0, 5.0]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.timestamp, rates[1].timestamp);
    }

    #[test]
    fn test_documented_first_search() {
        let rates = series(&[29.62, 29.19, 28.96, 29.00, 29.43, 30.10, 31.00]);
        let minimum = next_minimum(&rates, true).unwrap();

        assert_eq!(minimum.rate, 28.96);
        assert_eq!(minimum.timestamp, rates[2].timestamp);
    }

    #[test]
    fn test_first_search_skips_early_dip_for_lower_one() {
        let rates = series(&[28.0, 28.5, 27.5, 29.0]);
        let minimum = next_minimum(&rates, true).unwrap();

        assert_eq!(minimum.rate, 27.5);
        assert_eq!(minimum.timestamp, rates[2].timestamp);
    }

    #[test]
    fn test_first_search_keeps_early_dip_when_nothing_lower() {
        let rates = series(&[28.0, 28.5, 28.0, 29.0]);
        let minimum = next_minimum(&rates, true).unwrap();

        assert_eq!(minimum.timestamp, rates[0].timestamp);
    }

    #[test]
    fn test_later_search_keeps_early_dip() {
        let rates = series(&[28.0, 28.5, 27.5, 29.0]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.timestamp, rates[0].timestamp);
    }

    #[test]
    fn test_recheck_when_no_later_day_published() {
        let rates = series(&[5.0, 4.0, 4.5]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert!(minimum.must_recheck);
    }

    #[test]
    fn test_no_recheck_when_later_day_published() {
        let base = Local.with_ymd_and_hms(2026, 8, 24, 22, 0, 0).unwrap();
        let rates: Vec<EnergyRate> = [5.0, 4.0, 4.5, 5.0]
            .iter()
            .enumerate()
            .map(|(i, r)| EnergyRate::new(*r, base + TimeDelta::hours(i as i64)))
            .collect();

        // The minimum at 23:00 has rates for the following day behind it
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.timestamp, rates[1].timestamp);
        assert!(!minimum.must_recheck);
    }

    #[test]
    fn test_charge_duration_extends_over_same_level() {
        let rates = series(&[5.0, 3.0, 3.0005, 3.2, 5.0]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.max_charge_duration, TimeDelta::hours(2));
    }

    #[test]
    fn test_charge_duration_defaults_to_one_hour() {
        let rates = series(&[5.0, 3.0, 4.0, 5.0]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.max_charge_duration, TimeDelta::hours(1));
    }

    #[test]
    fn test_minimum_at_end_of_series() {
        let rates = series(&[5.0, 4.0, 3.0]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.timestamp, rates[2].timestamp);
    }

    #[test]
    fn test_single_rate_is_its_own_minimum() {
        let rates = series(&[4.2]);
        let minimum = next_minimum(&rates, false).unwrap();

        assert_eq!(minimum.timestamp, rates[0].timestamp);
    }

    #[test]
    fn test_minimum_rejects_empty_input() {
        assert!(next_minimum(&[], false).is_err());
    }

    #[test]
    fn test_spike_is_flanked() {
        let rates = series(&[1.0, 1.0, 5.0, 5.0, 1.0, 1.0]);
        let (before, after) = rates_before_and_after_spike(&rates).unwrap();

        assert_eq!(before.timestamp, rates[1].timestamp);
        assert_eq!(after.timestamp, rates[4].timestamp);
    }

    #[test]
    fn test_flat_series_has_no_spike() {
        let rates = series(&[2.0, 2.0, 2.0]);

        assert!(matches!(
            rates_before_and_after_spike(&rates),
            Err(MinimaError::NoSpikeFound)
        ));
    }

    #[test]
    fn test_spike_at_start_is_not_usable() {
        let rates = series(&[5.0, 5.0, 1.0]);

        assert!(matches!(
            rates_before_and_after_spike(&rates),
            Err(MinimaError::NoSpikeFound)
        ));
    }

    #[test]
    fn test_spike_running_to_the_end_is_not_usable() {
        let rates = series(&[1.0, 1.0, 5.0, 5.0]);

        assert!(matches!(
            rates_before_and_after_spike(&rates),
            Err(MinimaError::NoSpikeFound)
        ));
    }
}
