use thiserror::Error;

#[derive(Error, Debug)]
#[error("error in communication with Solcast: {0}")]
pub struct SolcastError(pub String);
impl From<serde_json::Error> for SolcastError {
    fn from(e: serde_json::Error) -> SolcastError {
        SolcastError(format!("json document error: {}", e.to_string()))
    }
}
impl From<ureq::Error> for SolcastError {
    fn from(e: ureq::Error) -> SolcastError {
        SolcastError(format!("http request error: {}", e.to_string()))
    }
}
