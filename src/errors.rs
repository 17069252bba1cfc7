use std::sync::PoisonError;
use chrono::RoundingError;
use thiserror::Error;

use crate::backup::BackupError;
use crate::envelope::EnvelopeError;
use crate::manager_goodwe::errors::GoodWeError;
use crate::manager_mail::errors::MailError;
use crate::manager_sems::errors::SemsError;
use crate::manager_solcast::errors::SolcastError;
use crate::manager_tibber::errors::TibberError;
use crate::minima::MinimaError;

/// Error in the configuration file, fatal at start up.
#[derive(Error, Debug)]
#[error("error in configuration: {0}")]
pub struct ConfigError(pub String);

impl From<&str> for ConfigError {
    fn from(e: &str) -> ConfigError {
        ConfigError(e.to_string())
    }
}
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> ConfigError {
        ConfigError(format!("config file error: {}", e.to_string()))
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError(format!("toml document error: {}", e.to_string()))
    }
}

/// Error while setting up logging, state and managers, fatal at start up.
#[derive(Error, Debug)]
#[error("error while initializing: {0}")]
pub struct GridMinInitError(pub String);

impl From<std::io::Error> for GridMinInitError {
    fn from(e: std::io::Error) -> GridMinInitError {
        GridMinInitError(e.to_string())
    }
}
impl From<log4rs::config::runtime::ConfigErrors> for GridMinInitError {
    fn from(e: log4rs::config::runtime::ConfigErrors) -> GridMinInitError {
        GridMinInitError(format!("log config error: {}", e.to_string()))
    }
}
impl From<log::SetLoggerError> for GridMinInitError {
    fn from(e: log::SetLoggerError) -> GridMinInitError {
        GridMinInitError(format!("log config error: {}", e.to_string()))
    }
}
impl From<TibberError> for GridMinInitError {
    fn from(e: TibberError) -> GridMinInitError {
        GridMinInitError(e.to_string())
    }
}
impl From<MailError> for GridMinInitError {
    fn from(e: MailError) -> GridMinInitError {
        GridMinInitError(e.to_string())
    }
}
/// What went wrong in the worker, split by how the run loop should react.
///
/// Remote errors are waited out and the failing step is re-run, device
/// errors additionally alert the operator, fatal errors stop the process.
#[derive(Error, Debug)]
pub enum GridMinWorkerError {
    #[error("remote service error: {0}")]
    Remote(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("unexpected error: {0}")]
    Fatal(String),
}

impl From<TibberError> for GridMinWorkerError {
    fn from(e: TibberError) -> GridMinWorkerError {
        GridMinWorkerError::Remote(e.to_string())
    }
}
impl From<SolcastError> for GridMinWorkerError {
    fn from(e: SolcastError) -> GridMinWorkerError {
        GridMinWorkerError::Remote(e.to_string())
    }
}
impl From<SemsError> for GridMinWorkerError {
    fn from(e: SemsError) -> GridMinWorkerError {
        GridMinWorkerError::Remote(e.to_string())
    }
}
impl From<MinimaError> for GridMinWorkerError {
    fn from(e: MinimaError) -> GridMinWorkerError {
        GridMinWorkerError::Remote(e.to_string())
    }
}
impl From<GoodWeError> for GridMinWorkerError {
    fn from(e: GoodWeError) -> GridMinWorkerError {
        GridMinWorkerError::Device(e.to_string())
    }
}
impl From<EnvelopeError> for GridMinWorkerError {
    fn from(e: EnvelopeError) -> GridMinWorkerError {
        GridMinWorkerError::Fatal(e.to_string())
    }
}
impl From<BackupError> for GridMinWorkerError {
    fn from(e: BackupError) -> GridMinWorkerError {
        GridMinWorkerError::Fatal(e.to_string())
    }
}
impl From<serde_json::Error> for GridMinWorkerError {
    fn from(e: serde_json::Error) -> GridMinWorkerError {
        GridMinWorkerError::Fatal(format!("json document error: {}", e.to_string()))
    }
}
impl From<RoundingError> for GridMinWorkerError {
    fn from(e: RoundingError) -> GridMinWorkerError {
        GridMinWorkerError::Fatal(format!("time rounding error: {}", e.to_string()))
    }
}
impl<T> From<PoisonError<T>> for GridMinWorkerError {
    fn from(e: PoisonError<T>) -> GridMinWorkerError {
        GridMinWorkerError::Fatal(format!("poisoned lock: {}", e.to_string()))
    }
}
