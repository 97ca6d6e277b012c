//! SMTP mail transport over lettre.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, warn};

use loopline_core::config::MailerConfig;
use loopline_core::error::AppError;
use loopline_core::result::AppResult;

use crate::transport::{Email, MailTransport};

/// Sends emails through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    /// Build the transport from configuration. Credentials are only
    /// attached when both username and password are set.
    pub fn new(config: &MailerConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| {
                AppError::configuration(format!("Invalid SMTP relay configuration: {e}"))
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &Email) -> AppResult<()> {
        let message = Message::builder()
            .from(self.sender.parse().map_err(|e| {
                AppError::configuration(format!("Invalid sender address: {e}"))
            })?)
            .to(email.to.parse().map_err(|e| {
                AppError::validation(format!("Invalid recipient address: {e}"))
            })?)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| AppError::internal(format!("Failed to build email: {e}")))?;

        match self.transport.send(message).await {
            Ok(_) => {
                debug!(to = %email.to, subject = %email.subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                warn!(to = %email.to, error = %e, "SMTP send failed");
                Err(AppError::external_service(format!("SMTP send failed: {e}")))
            }
        }
    }
}
