pub mod errors;

use std::time::Duration;
use chrono::{DurationRound, Local, TimeDelta};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::json;
use crate::config::TibberParameters;
use crate::manager_tibber::errors::TibberError;
use crate::minima::EnergyRate;
use crate::models::tibber_price::PriceResponse;

const REQUEST_URL: &str = "https://api.tibber.com/v1-beta/gql";

const PRICE_QUERY: &str = "{ viewer { homes { currentSubscription { priceInfo { \
    today { total startsAt } tomorrow { total startsAt } } } } } }";

pub struct Tibber {
    client: Client,
    api_token: String,
}

impl Tibber {
    /// Returns a new instance of the Tibber struct
    ///
    /// # Arguments
    ///
    /// * 'config' - Tibber related configuration
    pub fn new(config: &TibberParameters) -> Result<Tibber, TibberError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Tibber { client, api_token: config.api_token.to_string() })
    }

    /// Retrieves the upcoming energy rates, i.e. the rest of today and,
    /// once published around 13:00, all of tomorrow. The rates are returned
    /// at whatever granularity the market trades in.
    pub fn get_upcoming_rates(&self) -> Result<Vec<EnergyRate>, TibberError> {
        let body = json!({"query": PRICE_QUERY});

        let res = self.client
            .post(REQUEST_URL)
            .header("Authorization", self.api_token.as_str())
            .json(&body)
            .send()?;

        if res.status() != StatusCode::OK {
            return Err(TibberError(format!("http error: {}", res.status().to_string())));
        }

        let json = res.text()?;
        let response: PriceResponse = serde_json::from_str(&json)?;

        let home = response.data.viewer.homes.into_iter().next()
            .ok_or(TibberError("no home found for the given api token".to_string()))?;
        let price_info = home.current_subscription.price_info;

        let horizon = Local::now()
            .duration_trunc(TimeDelta::hours(1))
            .map_err(|e| TibberError(e.to_string()))?;

        let rates: Vec<EnergyRate> = price_info.today.into_iter()
            .chain(price_info.tomorrow)
            .filter(|e| e.starts_at > horizon)
            .map(|e| EnergyRate::new(e.total, e.starts_at))
            .collect();

        if rates.is_empty() {
            return Err(TibberError("no upcoming energy rates received".to_string()));
        }

        Ok(rates)
    }
}
