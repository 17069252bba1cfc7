use thiserror::Error;

#[derive(Error, Debug)]
#[error("error in communication with Tibber: {0}")]
pub struct TibberError(pub String);
impl From<serde_json::Error> for TibberError {
    fn from(e: serde_json::Error) -> TibberError {
        TibberError(format!("json document error: {}", e.to_string()))
    }
}
impl From<reqwest::Error> for TibberError {
    fn from(e: reqwest::Error) -> TibberError {
        TibberError(format!("http request error: {}", e.to_string()))
    }
}
