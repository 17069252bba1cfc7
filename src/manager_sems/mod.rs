pub mod errors;

use std::time::Duration;
use chrono::Local;
use serde_json::json;
use ureq::Agent;
use crate::config::SemsParameters;
use crate::manager_sems::errors::SemsError;
use crate::models::sems_portal::{ChartPoint, ChartResponse, LoginResponse, SemsResponse};
use crate::quantity::{EnergyAmount, Power};

const LOGIN_URL: &str = "https://www.semsportal.com/api/v1/Common/CrossLogin";
const CHART_URL: &str = "https://eu.semsportal.com/api/v2/Charts/GetChartByPlant";
const LOGIN_TOKEN: &str = r#"{"version":"v2.1.0","client":"ios","language":"en"}"#;

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

pub struct Sems {
    agent: Agent,
    account: String,
    password: String,
    powerstation_id: String,
}

impl Sems {
    /// Returns a new instance of the Sems struct
    ///
    /// # Arguments
    ///
    /// * 'config' - SEMS portal related configuration
    pub fn new(config: &SemsParameters) -> Sems {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = agent_config.into();

        Sems {
            agent,
            account: config.account.to_string(),
            password: config.password.to_string(),
            powerstation_id: config.powerstation_id.to_string(),
        }
    }

    /// Average power the household drew over the last seven full days.
    /// Today and the trailing partial day of the portal data are left out.
    pub fn get_average_consumption(&self) -> Result<Power, SemsError> {
        let points = self.get_line_points("Consumption")?;
        if points.len() < 9 {
            return Err(SemsError("not enough consumption history in portal response".to_string()));
        }

        let window = &points[points.len() - 9..points.len() - 2];
        let mean_kwh_per_day = window.iter().map(|p| p.y).sum::<f64>() / window.len() as f64;

        let day = EnergyAmount::from_kilo_watt_hours(mean_kwh_per_day);

        Ok(Power::from_watts(day.watt_seconds() / SECONDS_PER_DAY))
    }

    /// Energy bought from the grid over one day.
    ///
    /// # Arguments
    ///
    /// * 'days_in_past' - which day to report, 0 meaning today
    pub fn get_energy_bought(&self, days_in_past: usize) -> Result<EnergyAmount, SemsError> {
        let points = self.get_line_points("buy")?;
        if points.len() <= days_in_past {
            return Err(SemsError(format!(
                "no buy data {} days back in portal response", days_in_past
            )));
        }

        let kwh = points[points.len() - 1 - days_in_past].y;

        Ok(EnergyAmount::from_kilo_watt_hours(kwh))
    }

    /// Logs in to the portal and returns the token header value for
    /// subsequent data requests.
    fn login(&self) -> Result<String, SemsError> {
        let body = json!({"account": self.account, "pwd": self.password});

        let mut res = self.agent
            .post(LOGIN_URL)
            .header("Token", LOGIN_TOKEN)
            .send_json(&body)?;

        let json = res.body_mut().read_to_string()?;

        let envelope: SemsResponse = serde_json::from_str(&json)?;
        if envelope.code != 0 {
            return Err(SemsError(format!("code: {}, msg: {}", envelope.code, envelope.msg)));
        }

        let login: LoginResponse = serde_json::from_str(&json)?;

        let token = json!({
            "version": "v2.1.0",
            "client": "ios",
            "language": "en",
            "timestamp": login.data.timestamp,
            "uid": login.data.uid,
            "token": login.data.token,
        });

        Ok(token.to_string())
    }

    /// Fetches the month chart for the plant and returns the points of the
    /// line whose label contains the given needle, sorted by date.
    ///
    /// # Arguments
    ///
    /// * 'label_needle' - part of the line label to look for, case insensitive
    fn get_line_points(&self, label_needle: &str) -> Result<Vec<ChartPoint>, SemsError> {
        let token = self.login()?;

        let body = json!({
            "id": self.powerstation_id,
            "range": 2,
            "chartIndexId": "8",
            "date": Local::now().format("%Y-%m-%d").to_string(),
        });

        let mut res = self.agent
            .post(CHART_URL)
            .header("Token", token)
            .send_json(&body)?;

        let json = res.body_mut().read_to_string()?;

        let envelope: SemsResponse = serde_json::from_str(&json)?;
        if envelope.code != 0 {
            return Err(SemsError(format!("code: {}, msg: {}", envelope.code, envelope.msg)));
        }

        let chart: ChartResponse = serde_json::from_str(&json)?;

        let needle = label_needle.to_lowercase();
        let line = chart.data.lines.into_iter()
            .find(|l| l.label.to_lowercase().contains(&needle))
            .ok_or(SemsError(format!("no '{}' line in portal response", label_needle)))?;

        let mut points = line.xy;
        points.sort_by(|a, b| a.x.cmp(&b.x));

        Ok(points)
    }
}
