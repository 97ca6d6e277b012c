//! Outbound email configuration.

use serde::{Deserialize, Serialize};

/// SMTP transport and email link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// SMTP relay hostname.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username (omit for unauthenticated relays).
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Sender address for all notification emails.
    pub sender: String,
    /// Base URL of the web frontend, used to build links in emails.
    pub frontend_url: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}
