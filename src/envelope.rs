use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quantity::{EnergyAmount, Power, StateOfCharge};

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("invalid projection interval, {until} lies before {now}")]
    InvalidInterval {
        now: DateTime<Local>,
        until: DateTime<Local>,
    },
}

/// One timeslot of forecast solar production with its average power.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct SolarTimeslot {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub power: Power,
}

/// The possible range the state of charge can be in at the end of a
/// projected interval.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SocEnvelope {
    pub lower: StateOfCharge,
    pub upper: StateOfCharge,
}

/// Projects the state of charge forward over an interval.
///
/// The battery drains at the average consumption over the whole interval.
/// For the lower bound each solar timeslot credits back at most the
/// consumption it can offset, solar is never trusted to actually charge.
/// For the upper bound all overlapping production is credited, solar never
/// discharges the battery. Without overlapping solar data both bounds
/// collapse into a pure drain.
///
/// # Arguments
///
/// * 'now' - the start of the interval
/// * 'until' - the end of the interval
/// * 'consumption' - the average household consumption
/// * 'start_soc' - the state of charge at the start of the interval
/// * 'solar' - forecast solar production timeslots
/// * 'capacity' - the total capacity of the battery
pub fn project(
    now: DateTime<Local>,
    until: DateTime<Local>,
    consumption: Power,
    start_soc: StateOfCharge,
    solar: &[SolarTimeslot],
    capacity: EnergyAmount,
) -> Result<SocEnvelope, EnvelopeError> {
    if until < now {
        return Err(EnvelopeError::InvalidInterval { now, until });
    }

    let drain = consumption * (until - now);

    let mut offset = EnergyAmount::default();
    let mut production = EnergyAmount::default();

    for slot in solar {
        let overlap_start = slot.start.max(now);
        let overlap_end = slot.end.min(until);
        if overlap_end <= overlap_start {
            continue;
        }
        let overlap = overlap_end - overlap_start;

        let usable = if slot.power.watts() < consumption.watts() {
            slot.power
        } else {
            consumption
        };
        offset = offset + usable * overlap;
        production = production + slot.power * overlap;
    }

    let start = start_soc.absolute();
    let lower = StateOfCharge::new(start - drain + offset, capacity);
    let upper = StateOfCharge::new(start - drain + production, capacity);

    Ok(SocEnvelope { lower, upper })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    const CAPACITY_WH: f64 = 10000.0;

    fn capacity() -> EnergyAmount {
        EnergyAmount::from_watt_hours(CAPACITY_WH)
    }

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 24, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_pure_drain_without_solar() {
        let start = StateOfCharge::from_percentage(50.0, capacity());
        let envelope = project(at(10), at(15), Power::from_watts(200.0), start, &[], capacity()).unwrap();

        assert_abs_diff_eq!(envelope.lower.absolute().watt_hours(), 4000.0);
        assert_abs_diff_eq!(envelope.upper.absolute().watt_hours(), 4000.0);
    }

    #[test]
    fn test_zero_length_interval() {
        let start = StateOfCharge::from_percentage(37.0, capacity());
        let envelope = project(at(10), at(10), Power::from_watts(200.0), start, &[], capacity()).unwrap();

        assert_eq!(envelope.lower, start);
        assert_eq!(envelope.upper, start);
    }

    #[test]
    fn test_reversed_interval_fails() {
        let start = StateOfCharge::from_percentage(50.0, capacity());

        assert!(project(at(15), at(10), Power::from_watts(200.0), start, &[], capacity()).is_err());
    }

    #[test]
    fn test_solar_slot_credits_both_bounds() {
        let start = StateOfCharge::from_percentage(50.0, capacity());
        let solar = [SolarTimeslot {
            start: at(11),
            end: at(12),
            power: Power::from_watts(1000.0),
        }];

        let envelope = project(at(10), at(15), Power::from_watts(200.0), start, &solar, capacity()).unwrap();

        // Drain 1000 Wh over five hours, the slot offsets 200 Wh of it for
        // the lower bound and credits its full 1000 Wh for the upper one
        assert_abs_diff_eq!(envelope.lower.absolute().watt_hours(), 4200.0);
        assert_abs_diff_eq!(envelope.upper.absolute().watt_hours(), 5000.0);
    }

    #[test]
    fn test_weak_solar_only_offsets_its_own_power() {
        let start = StateOfCharge::from_percentage(50.0, capacity());
        let solar = [SolarTimeslot {
            start: at(11),
            end: at(13),
            power: Power::from_watts(150.0),
        }];

        let envelope = project(at(10), at(15), Power::from_watts(200.0), start, &solar, capacity()).unwrap();

        assert_abs_diff_eq!(envelope.lower.absolute().watt_hours(), 4300.0);
        assert_abs_diff_eq!(envelope.upper.absolute().watt_hours(), 4300.0);
    }

    #[test]
    fn test_slot_outside_interval_is_ignored() {
        let start = StateOfCharge::from_percentage(50.0, capacity());
        let solar = [SolarTimeslot {
            start: at(16),
            end: at(17),
            power: Power::from_watts(1000.0),
        }];

        let envelope = project(at(10), at(15), Power::from_watts(200.0), start, &solar, capacity()).unwrap();

        assert_abs_diff_eq!(envelope.lower.absolute().watt_hours(), 4000.0);
        assert_abs_diff_eq!(envelope.upper.absolute().watt_hours(), 4000.0);
    }

    #[test]
    fn test_partial_overlap_counts_only_the_overlap() {
        let start = StateOfCharge::from_percentage(50.0, capacity());
        let solar = [SolarTimeslot {
            start: at(10) - TimeDelta::minutes(30),
            end: at(10) + TimeDelta::minutes(30),
            power: Power::from_watts(1000.0),
        }];

        let envelope = project(at(10), at(15), Power::from_watts(200.0), start, &solar, capacity()).unwrap();

        // Only the half hour inside the interval counts
        assert_abs_diff_eq!(envelope.upper.absolute().watt_hours(), 4500.0);
        assert_abs_diff_eq!(envelope.lower.absolute().watt_hours(), 4100.0);
    }

    #[test]
    fn test_lower_bound_clamps_at_empty() {
        let start = StateOfCharge::from_percentage(5.0, capacity());
        let envelope = project(at(0), at(10), Power::from_watts(500.0), start, &[], capacity()).unwrap();

        assert_abs_diff_eq!(envelope.lower.absolute().watt_hours(), 0.0);
    }

    #[test]
    fn test_upper_bound_clamps_at_capacity() {
        let start = StateOfCharge::from_percentage(95.0, capacity());
        let solar = [SolarTimeslot {
            start: at(10),
            end: at(14),
            power: Power::from_watts(3000.0),
        }];

        let envelope = project(at(10), at(14), Power::from_watts(100.0), start, &solar, capacity()).unwrap();

        assert_abs_diff_eq!(envelope.upper.absolute().watt_hours(), CAPACITY_WH);
        assert!(envelope.lower <= envelope.upper);
    }
}
