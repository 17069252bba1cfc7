use thiserror::Error;

use crate::models::goodwe_gateway::OperationMode;

#[derive(Error, Debug)]
pub enum GoodWeError {
    #[error("error in communication with the inverter gateway: {0}")]
    Gateway(String),
    #[error("inverter reports mode {actual} after setting {expected}")]
    ModeMismatch {
        expected: OperationMode,
        actual: OperationMode,
    },
}

impl From<serde_json::Error> for GoodWeError {
    fn from(e: serde_json::Error) -> GoodWeError {
        GoodWeError::Gateway(format!("json document error: {}", e.to_string()))
    }
}
impl From<ureq::Error> for GoodWeError {
    fn from(e: ureq::Error) -> GoodWeError {
        GoodWeError::Gateway(format!("http request error: {}", e.to_string()))
    }
}
