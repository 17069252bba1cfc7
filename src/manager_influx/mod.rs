use std::time::Duration;
use chrono::{DateTime, Local};
use thiserror::Error;
use ureq::Agent;
use crate::config::InfluxParameters;

#[derive(Error, Debug)]
#[error("error in communication with InfluxDB: {0}")]
pub struct InfluxError(pub String);
impl From<ureq::Error> for InfluxError {
    fn from(e: ureq::Error) -> InfluxError {
        InfluxError(format!("http request error: {}", e.to_string()))
    }
}

pub struct Influx {
    agent: Agent,
    url: String,
    token: String,
    org: String,
    bucket: String,
}

impl Influx {
    /// Returns a new instance of the Influx struct
    ///
    /// # Arguments
    ///
    /// * 'config' - InfluxDB related configuration
    pub fn new(config: &InfluxParameters) -> Influx {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = agent_config.into();

        Influx {
            agent,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token.to_string(),
            org: config.org.to_string(),
            bucket: config.bucket.to_string(),
        }
    }

    /// Writes a measurement stamped with now. Metrics are best effort, a
    /// failed write is logged and otherwise ignored.
    ///
    /// # Arguments
    ///
    /// * 'measurement' - the measurement name
    /// * 'fields' - field names and values to write
    pub fn record(&self, measurement: &str, fields: &[(&str, f64)]) {
        self.record_at(measurement, fields, Local::now());
    }

    /// Writes a measurement stamped with the given time. Metrics are best
    /// effort, a failed write is logged and otherwise ignored.
    ///
    /// # Arguments
    ///
    /// * 'measurement' - the measurement name
    /// * 'fields' - field names and values to write
    /// * 'timestamp' - the time to stamp the point with
    pub fn record_at(&self, measurement: &str, fields: &[(&str, f64)], timestamp: DateTime<Local>) {
        if let Err(e) = self.write_point(measurement, fields, timestamp) {
            log::error!("failed to write to influxdb: {}", e);
        }
    }

    fn write_point(&self, measurement: &str, fields: &[(&str, f64)], timestamp: DateTime<Local>) -> Result<(), InfluxError> {
        let url = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=s",
            self.url, self.org, self.bucket
        );
        let line = build_line(measurement, fields, timestamp);

        self.agent
            .post(&url)
            .header("Authorization", format!("Token {}", self.token))
            .send(line)?;

        Ok(())
    }
}

/// Builds one point in influx line protocol with second precision.
///
/// # Arguments
///
/// * 'measurement' - the measurement name
/// * 'fields' - field names and values
/// * 'timestamp' - the time of the point
fn build_line(measurement: &str, fields: &[(&str, f64)], timestamp: DateTime<Local>) -> String {
    let fields_part = fields.iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<String>>()
        .join(",");

    format!("{} {} {}", measurement, fields_part, timestamp.timestamp())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_build_line() {
        let timestamp = Local.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        let line = build_line("energy_bought", &[("watt_hours", 1250.0)], timestamp);

        assert_eq!(line, format!("energy_bought watt_hours=1250 {}", timestamp.timestamp()));
    }

    #[test]
    fn test_build_line_joins_fields() {
        let timestamp = Local.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        let line = build_line("m", &[("a", 1.5), ("b", 2.0)], timestamp);

        assert!(line.starts_with("m a=1.5,b=2 "));
    }
}
