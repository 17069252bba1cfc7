use std::ops::{Add, Mul, Neg, Sub};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// An amount of energy stored or transferred, backed by watt hours.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd, Debug, Default)]
pub struct EnergyAmount {
    watt_hours: f64,
}

impl EnergyAmount {
    pub fn from_watt_hours(watt_hours: f64) -> EnergyAmount {
        EnergyAmount { watt_hours }
    }

    pub fn from_watt_seconds(watt_seconds: f64) -> EnergyAmount {
        EnergyAmount { watt_hours: watt_seconds / 3600.0 }
    }

    pub fn from_kilo_watt_hours(kilo_watt_hours: f64) -> EnergyAmount {
        EnergyAmount { watt_hours: kilo_watt_hours * 1000.0 }
    }

    pub fn watt_hours(&self) -> f64 {
        self.watt_hours
    }

    pub fn watt_seconds(&self) -> f64 {
        self.watt_hours * 3600.0
    }

    pub fn kilo_watt_hours(&self) -> f64 {
        self.watt_hours / 1000.0
    }
}

impl Add for EnergyAmount {
    type Output = EnergyAmount;

    fn add(self, rhs: EnergyAmount) -> EnergyAmount {
        EnergyAmount { watt_hours: self.watt_hours + rhs.watt_hours }
    }
}

impl Sub for EnergyAmount {
    type Output = EnergyAmount;

    fn sub(self, rhs: EnergyAmount) -> EnergyAmount {
        EnergyAmount { watt_hours: self.watt_hours - rhs.watt_hours }
    }
}

impl Neg for EnergyAmount {
    type Output = EnergyAmount;

    fn neg(self) -> EnergyAmount {
        EnergyAmount { watt_hours: -self.watt_hours }
    }
}

/// An average power, backed by watts.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd, Debug, Default)]
pub struct Power {
    watts: f64,
}

impl Power {
    pub fn from_watts(watts: f64) -> Power {
        Power { watts }
    }

    pub fn from_kilo_watts(kilo_watts: f64) -> Power {
        Power { watts: kilo_watts * 1000.0 }
    }

    pub fn watts(&self) -> f64 {
        self.watts
    }
}

impl Add for Power {
    type Output = Power;

    fn add(self, rhs: Power) -> Power {
        Power { watts: self.watts + rhs.watts }
    }
}

impl Mul<f64> for Power {
    type Output = Power;

    fn mul(self, rhs: f64) -> Power {
        Power { watts: self.watts * rhs }
    }
}

impl Mul<TimeDelta> for Power {
    type Output = EnergyAmount;

    fn mul(self, rhs: TimeDelta) -> EnergyAmount {
        EnergyAmount::from_watt_seconds(self.watts * rhs.num_seconds() as f64)
    }
}

/// Battery state of charge as an absolute amount of energy.
/// Construction clamps the amount to the physical range of the battery.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct StateOfCharge {
    absolute: EnergyAmount,
}

impl StateOfCharge {
    /// Creates a state of charge from an absolute amount of energy,
    /// clamped to between an empty and a full battery.
    ///
    /// # Arguments
    ///
    /// * 'absolute' - the absolute amount of energy in the battery
    /// * 'capacity' - the total capacity of the battery
    pub fn new(absolute: EnergyAmount, capacity: EnergyAmount) -> StateOfCharge {
        let clamped = absolute.watt_hours().clamp(0.0, capacity.watt_hours());

        StateOfCharge { absolute: EnergyAmount::from_watt_hours(clamped) }
    }

    /// Creates a state of charge from a percentage of the battery capacity.
    ///
    /// # Arguments
    ///
    /// * 'percentage' - the state of charge in percent
    /// * 'capacity' - the total capacity of the battery
    pub fn from_percentage(percentage: f64, capacity: EnergyAmount) -> StateOfCharge {
        let absolute = EnergyAmount::from_watt_hours(capacity.watt_hours() * percentage / 100.0);

        StateOfCharge::new(absolute, capacity)
    }

    pub fn absolute(&self) -> EnergyAmount {
        self.absolute
    }

    pub fn percentage(&self, capacity: EnergyAmount) -> f64 {
        self.absolute.watt_hours() / capacity.watt_hours() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_energy_conversions() {
        assert_abs_diff_eq!(EnergyAmount::from_kilo_watt_hours(1.5).watt_hours(), 1500.0);
        assert_abs_diff_eq!(EnergyAmount::from_watt_hours(2.0).watt_seconds(), 7200.0);
        assert_abs_diff_eq!(EnergyAmount::from_watt_seconds(7200.0).watt_hours(), 2.0);
        assert_abs_diff_eq!(EnergyAmount::from_watt_hours(500.0).kilo_watt_hours(), 0.5);
    }

    #[test]
    fn test_energy_arithmetic() {
        let a = EnergyAmount::from_watt_hours(300.0);
        let b = EnergyAmount::from_watt_hours(100.0);

        assert_abs_diff_eq!((a + b).watt_hours(), 400.0);
        assert_abs_diff_eq!((a - b).watt_hours(), 200.0);
        assert_abs_diff_eq!((-a).watt_hours(), -300.0);
    }

    #[test]
    fn test_power_times_duration() {
        let energy = Power::from_watts(200.0) * TimeDelta::hours(5);

        assert_abs_diff_eq!(energy.watt_hours(), 1000.0);
    }

    #[test]
    fn test_power_scaling() {
        assert_abs_diff_eq!((Power::from_watts(400.0) * 1.2).watts(), 480.0);
        assert_abs_diff_eq!(Power::from_kilo_watts(1.2).watts(), 1200.0);
        assert_abs_diff_eq!((Power::from_watts(100.0) + Power::from_watts(50.0)).watts(), 150.0);
    }

    #[test]
    fn test_soc_clamping() {
        let capacity = EnergyAmount::from_watt_hours(10000.0);

        let over = StateOfCharge::new(EnergyAmount::from_watt_hours(12000.0), capacity);
        assert_abs_diff_eq!(over.percentage(capacity), 100.0);

        let under = StateOfCharge::new(EnergyAmount::from_watt_hours(-500.0), capacity);
        assert_abs_diff_eq!(under.percentage(capacity), 0.0);
    }

    #[test]
    fn test_soc_percentage() {
        let capacity = EnergyAmount::from_watt_hours(10000.0);
        let soc = StateOfCharge::from_percentage(50.0, capacity);

        assert_abs_diff_eq!(soc.absolute().watt_hours(), 5000.0);
        assert_abs_diff_eq!(soc.percentage(capacity), 50.0);
    }
}
