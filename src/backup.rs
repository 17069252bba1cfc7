use std::fs;
use std::path::Path;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use glob::glob;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::coordinator::CycleReport;
use crate::minima::EnergyRate;

const STATE_FILE: &str = "controller_state.json";
const REPORT_RETENTION_HOURS: i64 = 48;

/// Error while reading or writing files in the backup directory.
#[derive(Error, Debug)]
#[error("error while persisting state: {0}")]
pub struct BackupError(pub String);

impl From<std::io::Error> for BackupError {
    fn from(e: std::io::Error) -> BackupError {
        BackupError(format!("file error: {}", e.to_string()))
    }
}
impl From<serde_json::Error> for BackupError {
    fn from(e: serde_json::Error) -> BackupError {
        BackupError(format!("json document error: {}", e.to_string()))
    }
}
impl From<glob::PatternError> for BackupError {
    fn from(e: glob::PatternError) -> BackupError {
        BackupError(format!("file pattern error: {}", e.to_string()))
    }
}
impl From<chrono::ParseError> for BackupError {
    fn from(e: chrono::ParseError) -> BackupError {
        BackupError(format!("file timestamp error: {}", e.to_string()))
    }
}

/// State needed to resume waiting for an already chosen price minimum
/// after a restart.
#[derive(Serialize, Deserialize)]
pub struct ControllerState {
    pub upcoming: EnergyRate,
}

/// Saves the controller state to file
///
/// # Arguments
///
/// * 'backup_dir' - the directory to save the file to
/// * 'state' - the state to save
pub fn save_controller_state(backup_dir: &str, state: &ControllerState) -> Result<(), BackupError> {
    let file_path = format!("{}{}", backup_dir, STATE_FILE);

    let json = serde_json::to_string_pretty(state)?;
    fs::write(file_path, json)?;

    Ok(())
}

/// Loads the controller state from file if one is present
///
/// A missing or unreadable file yields no state and the caller starts
/// a fresh search instead.
///
/// # Arguments
///
/// * 'backup_dir' - the directory to load the file from
pub fn load_controller_state(backup_dir: &str) -> Result<Option<ControllerState>, BackupError> {
    let file_path = format!("{}{}", backup_dir, STATE_FILE);

    if Path::new(&file_path).exists() {
        let json = fs::read_to_string(file_path)?;
        match serde_json::from_str::<ControllerState>(&json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                log::warn!("discarding unreadable controller state: {}", e);
                Ok(None)
            }
        }
    } else {
        Ok(None)
    }
}

/// Saves a charge cycle report to a timestamped file
///
/// # Arguments
///
/// * 'backup_dir' - the directory to save the file to
/// * 'report' - the report of the completed cycle
pub fn save_cycle_report(backup_dir: &str, report: &CycleReport) -> Result<(), BackupError> {
    let file_path = format!("{}{}_cycle_report.json", backup_dir, Utc::now().format("%Y%m%d%H%M%S"));

    let json = serde_json::to_string_pretty(report)?;
    fs::write(file_path, json)?;

    // Remove cycle reports older than 48 hours
    let pattern = format!("{}*_cycle_report.json", backup_dir);
    for entry in glob(&pattern)? {
        if let Ok(path) = entry {
            if let Some(os_name) = path.file_name() {
                if let Some(filename) = os_name.to_str() {
                    let datetime: DateTime<Utc> = NaiveDateTime::parse_from_str(&filename[0..14], "%Y%m%d%H%M%S")?.and_utc();
                    if Utc::now() - datetime > TimeDelta::hours(REPORT_RETENTION_HOURS) {
                        fs::remove_file(path)?;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn temp_backup_dir(tag: &str) -> String {
        let dir = std::env::temp_dir().join(format!("gridmin_{}_{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        format!("{}/", dir.display())
    }

    #[test]
    fn test_controller_state_survives_restart() {
        let dir = temp_backup_dir("state");

        assert!(load_controller_state(&dir).unwrap().is_none());

        let state = ControllerState {
            upcoming: EnergyRate::new(0.42, Local::now()),
        };
        save_controller_state(&dir, &state).unwrap();

        let loaded = load_controller_state(&dir).unwrap().unwrap();
        assert_eq!(loaded.upcoming, state.upcoming);

        fs::remove_dir_all(dir.trim_end_matches('/')).unwrap();
    }

    #[test]
    fn test_corrupt_state_is_discarded() {
        let dir = temp_backup_dir("corrupt");
        fs::write(format!("{}{}", dir, STATE_FILE), "not json").unwrap();

        assert!(load_controller_state(&dir).unwrap().is_none());

        fs::remove_dir_all(dir.trim_end_matches('/')).unwrap();
    }
}
