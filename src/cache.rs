use crate::envelope::SolarTimeslot;
use crate::minima::EnergyRate;
use crate::quantity::Power;

/// Remembers what an evaluation cycle already fetched so a re-run of the
/// same cycle after a backoff does not hit the remote services again.
/// A new cycle starts from a fresh instance, nothing in here survives it.
#[derive(Default)]
pub struct IterationCache {
    pub upcoming_rates: Option<Vec<EnergyRate>>,
    pub average_consumption: Option<Power>,
    pub solar_data: Option<Vec<SolarTimeslot>>,
}
