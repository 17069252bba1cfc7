pub mod errors;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use crate::config::MailParameters;
use crate::manager_mail::errors::MailError;

pub struct Mail {
    transport: SmtpTransport,
    from: String,
    to: String,
}

impl Mail {
    /// Returns a new instance of the Mail struct
    ///
    /// # Arguments
    ///
    /// * 'config' - mail related configuration
    pub fn new(config: &MailParameters) -> Result<Mail, MailError> {
        let credentials = Credentials::new(config.smtp_user.to_string(), config.smtp_password.to_string());

        let transport = SmtpTransport::relay(&config.smtp_endpoint)?
            .credentials(credentials)
            .build();

        Ok(Mail {
            transport,
            from: config.from.to_string(),
            to: config.to.to_string(),
        })
    }

    /// Sends a mail with the given subject and body
    ///
    /// # Arguments
    ///
    /// * 'subject' - the subject of the mail
    /// * 'body' - the body of the mail
    pub fn send_mail(&self, subject: String, body: String) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(self.to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(&email)?;

        Ok(())
    }
}
