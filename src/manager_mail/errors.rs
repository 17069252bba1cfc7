use thiserror::Error;

#[derive(Error, Debug)]
#[error("error while sending mail: {0}")]
pub struct MailError(pub String);
impl From<lettre::address::AddressError> for MailError {
    fn from(e: lettre::address::AddressError) -> MailError {
        MailError(format!("invalid email address: {}", e.to_string()))
    }
}
impl From<lettre::error::Error> for MailError {
    fn from(e: lettre::error::Error) -> MailError {
        MailError(format!("message build error: {}", e.to_string()))
    }
}
impl From<lettre::transport::smtp::Error> for MailError {
    fn from(e: lettre::transport::smtp::Error) -> MailError {
        MailError(format!("smtp error: {}", e.to_string()))
    }
}
