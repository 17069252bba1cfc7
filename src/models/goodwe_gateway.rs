use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct GatewayResponse {
    pub code: i64,
    pub msg: String,
}

#[derive(Deserialize, Debug)]
pub struct RuntimeResponse {
    pub data: RuntimeData,
}

#[derive(Deserialize, Debug)]
pub struct RuntimeData {
    pub soc: u8,
    pub operation_mode: OperationMode,
}

/// The inverter operation modes the controller cares about. Anything else
/// the inverter can be in maps to Other and means somebody else took over.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum OperationMode {
    #[serde(rename = "general")]
    Normal,
    #[serde(rename = "eco_charge")]
    BoostCharge,
    #[serde(other)]
    Other,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationMode::Normal => write!(f, "normal"),
            OperationMode::BoostCharge => write!(f, "boost charge"),
            OperationMode::Other => write!(f, "other"),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ModeRequest {
    pub mode: OperationMode,
}
