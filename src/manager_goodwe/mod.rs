pub mod errors;

use std::time::Duration;
use ureq::Agent;
use crate::config::InverterParameters;
use crate::manager_goodwe::errors::GoodWeError;
use crate::models::goodwe_gateway::{GatewayResponse, ModeRequest, OperationMode, RuntimeData, RuntimeResponse};

pub struct GoodWe {
    agent: Agent,
    base_url: String,
}

impl GoodWe {
    /// Returns a new instance of the GoodWe struct talking to the local
    /// gateway that fronts the inverter
    ///
    /// # Arguments
    ///
    /// * 'config' - inverter related configuration
    pub fn new(config: &InverterParameters) -> GoodWe {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = agent_config.into();

        GoodWe { agent, base_url: config.gateway_url.trim_end_matches('/').to_string() }
    }

    /// Obtain the battery current soc (state of charge)
    pub fn get_current_soc(&self) -> Result<u8, GoodWeError> {
        let runtime = self.get_runtime()?;

        Ok(runtime.soc)
    }

    /// Obtain the operation mode the inverter currently runs in
    pub fn get_operation_mode(&self) -> Result<OperationMode, GoodWeError> {
        let runtime = self.get_runtime()?;

        Ok(runtime.operation_mode)
    }

    /// Sets the inverter operation mode and verifies the change by reading
    /// it back, since the gateway acknowledges before the inverter settles.
    ///
    /// # Arguments
    ///
    /// * 'mode' - the operation mode to set
    pub fn set_operation_mode(&self, mode: OperationMode) -> Result<(), GoodWeError> {
        let url = format!("{}/operation_mode", self.base_url);
        let req = ModeRequest { mode };
        let body = serde_json::to_string(&req)?;

        let mut res = self.agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body)?;

        let json = res.body_mut().read_to_string()?;
        check_envelope(&json)?;

        let actual = self.get_operation_mode()?;
        if actual != mode {
            return Err(GoodWeError::ModeMismatch { expected: mode, actual });
        }

        Ok(())
    }

    fn get_runtime(&self) -> Result<RuntimeData, GoodWeError> {
        let url = format!("{}/runtime", self.base_url);

        let mut res = self.agent
            .get(&url)
            .call()?;

        let json = res.body_mut().read_to_string()?;
        check_envelope(&json)?;

        let runtime: RuntimeResponse = serde_json::from_str(&json)?;

        Ok(runtime.data)
    }
}

fn check_envelope(json: &str) -> Result<(), GoodWeError> {
    let envelope: GatewayResponse = serde_json::from_str(json)?;
    if envelope.code != 0 {
        return Err(GoodWeError::Gateway(format!("code: {}, msg: {}", envelope.code, envelope.msg)));
    }

    Ok(())
}
