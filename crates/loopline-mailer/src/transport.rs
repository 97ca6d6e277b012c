//! The outbound mail seam.

use async_trait::async_trait;

use loopline_core::result::AppResult;

/// A fully rendered outbound email.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

/// Sends rendered emails. Job handlers depend on this trait so tests
/// can record sends instead of talking to an SMTP relay.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one email. A transport failure is an `ExternalService`
    /// error; callers decide whether it is retryable.
    async fn send(&self, email: &Email) -> AppResult<()>;
}
