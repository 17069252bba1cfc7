use chrono::{DateTime, Local};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct PriceResponse {
    pub data: PriceData,
}

#[derive(Deserialize, Debug)]
pub struct PriceData {
    pub viewer: Viewer,
}

#[derive(Deserialize, Debug)]
pub struct Viewer {
    pub homes: Vec<Home>,
}

#[derive(Deserialize, Debug)]
pub struct Home {
    #[serde(rename = "currentSubscription")]
    pub current_subscription: Subscription,
}

#[derive(Deserialize, Debug)]
pub struct Subscription {
    #[serde(rename = "priceInfo")]
    pub price_info: PriceInfo,
}

#[derive(Deserialize, Debug)]
pub struct PriceInfo {
    pub today: Vec<PriceEntry>,
    #[serde(default)]
    pub tomorrow: Vec<PriceEntry>,
}

#[derive(Deserialize, Debug)]
pub struct PriceEntry {
    pub total: f64,
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Local>,
}
