use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use crate::absence::AbsenceWindow;
use crate::errors::ConfigError;
use crate::quantity::EnergyAmount;

fn default_snapshot_interval() -> i64 {
    180
}

fn default_absence_power() -> f64 {
    150.0
}

#[derive(Deserialize, Clone)]
pub struct GeoRef {
    pub lat: f64,
    pub long: f64,
}

#[derive(Deserialize, Clone)]
pub struct Battery {
    pub capacity_wh: f64,
    pub target_min_soc: u8,
    pub target_max_soc: u8,
}

impl Battery {
    /// Returns the usable battery capacity as an energy amount
    pub fn capacity(&self) -> EnergyAmount {
        EnergyAmount::from_watt_hours(self.capacity_wh)
    }
}

#[derive(Deserialize, Clone)]
pub struct AbsenceParameters {
    #[serde(default)]
    pub timeframe: String,
    #[serde(default = "default_absence_power")]
    pub power_watts: f64,
}

#[derive(Deserialize, Clone)]
pub struct TibberParameters {
    pub api_token: String,
}

#[derive(Deserialize, Clone)]
pub struct SolcastParameters {
    pub api_key: String,
    pub rooftop_id: String,
    pub rooftop_id_2: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct SemsParameters {
    pub account: String,
    pub password: String,
    pub powerstation_id: String,
}

#[derive(Deserialize, Clone)]
pub struct InverterParameters {
    pub gateway_url: String,
}

#[derive(Deserialize, Clone)]
pub struct InfluxParameters {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

#[derive(Deserialize, Clone)]
pub struct MailParameters {
    pub smtp_user: String,
    pub smtp_password: String,
    pub smtp_endpoint: String,
    pub from: String,
    pub to: String,
}

#[derive(Deserialize, Clone)]
pub struct Files {
    pub backup_dir: String,
}

#[derive(Deserialize, Clone)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    pub debug_mode: bool,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_minutes: i64,
}

#[derive(Deserialize, Clone)]
pub struct Config {
    pub geo_ref: GeoRef,
    pub battery: Battery,
    pub absence: AbsenceParameters,
    pub tibber: TibberParameters,
    pub solcast: SolcastParameters,
    pub sems: SemsParameters,
    pub inverter: InverterParameters,
    pub influx: InfluxParameters,
    pub mail: MailParameters,
    pub files: Files,
    pub general: General,
    #[serde(skip)]
    pub absence_window: Option<AbsenceWindow>,
}

/// Loads and validates the configuration file
///
/// # Arguments
///
/// * 'config_path' - path to the toml configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml_doc = fs::read_to_string(config_path)?;

    parse_config(&toml_doc)
}

fn parse_config(toml_doc: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(toml_doc)?;

    if config.battery.capacity_wh <= 0.0 {
        return Err(ConfigError::from("battery capacity must be greater than zero"));
    }
    if config.battery.target_min_soc >= config.battery.target_max_soc {
        return Err(ConfigError::from("target_min_soc must be less than target_max_soc"));
    }
    if config.battery.target_max_soc > 100 {
        return Err(ConfigError::from("target_max_soc must not exceed 100"));
    }
    if config.general.snapshot_interval_minutes <= 0 {
        return Err(ConfigError::from("snapshot_interval_minutes must be greater than zero"));
    }

    config.absence_window = AbsenceWindow::parse(&config.absence.timeframe)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(absence: &str, min_soc: u8) -> String {
        format!(
            r#"
            [geo_ref]
            lat = 59.3293
            long = 18.0686

            [battery]
            capacity_wh = 10000.0
            target_min_soc = {}
            target_max_soc = 95

            [absence]
            timeframe = "{}"

            [tibber]
            api_token = "tibber-token"

            [solcast]
            api_key = "solcast-key"
            rooftop_id = "aaaa-bbbb"

            [sems]
            account = "user@example.com"
            password = "secret"
            powerstation_id = "cccc-dddd"

            [inverter]
            gateway_url = "http://192.168.1.10:8080"

            [influx]
            url = "http://192.168.1.11:8086"
            token = "influx-token"
            org = "home"
            bucket = "energy"

            [mail]
            smtp_user = "mailer"
            smtp_password = "mail-secret"
            smtp_endpoint = "smtp.example.com"
            from = "Gridmin <gridmin@example.com>"
            to = "Owner <owner@example.com>"

            [files]
            backup_dir = "/var/lib/gridmin"

            [general]
            log_path = "/var/log/gridmin/gridmin.log"
            log_level = "INFO"
            log_to_stdout = false
            debug_mode = false
            "#,
            min_soc, absence
        )
    }

    #[test]
    fn test_parses_full_document_with_defaults() {
        let config = parse_config(&fixture("", 30)).unwrap();

        assert_eq!(config.battery.target_min_soc, 30);
        assert_eq!(config.battery.target_max_soc, 95);
        assert_eq!(config.general.snapshot_interval_minutes, 180);
        assert_eq!(config.absence.power_watts, 150.0);
        assert!(config.absence_window.is_none());
        assert!(config.solcast.rooftop_id_2.is_none());
    }

    #[test]
    fn test_parses_absence_timeframe() {
        let config = parse_config(&fixture(
            "2026-07-01T00:00:00+02:00;2026-07-14T00:00:00+02:00",
            30,
        ))
        .unwrap();

        assert!(config.absence_window.is_some());
    }

    #[test]
    fn test_rejects_inverted_soc_targets() {
        assert!(parse_config(&fixture("", 95)).is_err());
    }

    #[test]
    fn test_rejects_malformed_absence_timeframe() {
        assert!(parse_config(&fixture("not a timeframe", 30)).is_err());
    }
}
