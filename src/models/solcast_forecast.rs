use chrono::{DateTime, Local};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ForecastResponse {
    pub forecasts: Vec<ForecastEntry>,
}

#[derive(Deserialize, Debug)]
pub struct ForecastEntry {
    pub pv_estimate: f64,
    pub period_end: DateTime<Local>,
    pub period: String,
}
