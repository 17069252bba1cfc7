use thiserror::Error;

#[derive(Error, Debug)]
#[error("error in communication with SEMS portal: {0}")]
pub struct SemsError(pub String);
impl From<serde_json::Error> for SemsError {
    fn from(e: serde_json::Error) -> SemsError {
        SemsError(format!("json document error: {}", e.to_string()))
    }
}
impl From<ureq::Error> for SemsError {
    fn from(e: ureq::Error) -> SemsError {
        SemsError(format!("http request error: {}", e.to_string()))
    }
}
