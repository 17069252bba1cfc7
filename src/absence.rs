use chrono::{DateTime, Local};
use anyhow::Result;

use crate::errors::ConfigError;

const DELIMITER: char = ';';

/// One time window during which nobody is home and the household only
/// draws its standby power.
#[derive(Clone, Copy, Debug)]
pub struct AbsenceWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl AbsenceWindow {
    /// Parses an absence timeframe of the form "start;end" where both parts
    /// are RFC 3339 date times with an explicit utc offset. An empty string
    /// means no absence is planned.
    ///
    /// # Arguments
    ///
    /// * 'timeframe' - the configured timeframe string
    pub fn parse(timeframe: &str) -> Result<Option<AbsenceWindow>, ConfigError> {
        let timeframe = timeframe.trim();
        if timeframe.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = timeframe.split(DELIMITER).collect();
        if parts.len() != 2 {
            return Err(ConfigError(format!(
                "absence timeframe must contain exactly one '{}': {}",
                DELIMITER, timeframe
            )));
        }

        let start = parse_bound(parts[0])?;
        let end = parse_bound(parts[1])?;
        if start >= end {
            return Err(ConfigError(format!(
                "absence start must lie before its end: {}",
                timeframe
            )));
        }

        Ok(Some(AbsenceWindow { start, end }))
    }

    /// True while the given time is strictly inside the window.
    pub fn is_active(&self, now: DateTime<Local>) -> bool {
        self.start < now && now < self.end
    }
}

fn parse_bound(bound: &str) -> Result<DateTime<Local>, ConfigError> {
    let bound = bound.trim();

    DateTime::parse_from_rfc3339(bound)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| ConfigError(format!("invalid absence bound '{}': {}", bound, e)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn test_empty_timeframe_means_no_absence() {
        assert!(AbsenceWindow::parse("").unwrap().is_none());
        assert!(AbsenceWindow::parse("   ").unwrap().is_none());
    }

    #[test]
    fn test_parses_and_reports_activity() {
        let window = AbsenceWindow::parse("2026-09-01T08:00:00+02:00 ; 2026-09-05T18:00:00+02:00")
            .unwrap()
            .unwrap();

        assert!(!window.is_active(window.start));
        assert!(window.is_active(window.start + TimeDelta::minutes(1)));
        assert!(window.is_active(window.end - TimeDelta::minutes(1)));
        assert!(!window.is_active(window.end));
        assert!(!window.is_active(window.end + TimeDelta::days(1)));
    }

    #[test]
    fn test_rejects_missing_delimiter() {
        assert!(AbsenceWindow::parse("2026-09-01T08:00:00+02:00").is_err());
    }

    #[test]
    fn test_rejects_extra_delimiter() {
        assert!(AbsenceWindow::parse("2026-09-01T08:00:00+02:00;2026-09-02T08:00:00+02:00;").is_err());
    }

    #[test]
    fn test_rejects_bound_without_offset() {
        assert!(AbsenceWindow::parse("2026-09-01T08:00:00;2026-09-05T18:00:00+02:00").is_err());
    }

    #[test]
    fn test_rejects_reversed_window() {
        assert!(AbsenceWindow::parse("2026-09-05T18:00:00+02:00;2026-09-01T08:00:00+02:00").is_err());
    }
}
