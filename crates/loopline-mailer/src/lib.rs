//! # loopline-mailer
//!
//! Outbound email: the `MailTransport` seam, the SMTP implementation
//! over `lettre`, and the HTML templates for the three notification
//! emails.

pub mod smtp;
pub mod templates;
pub mod transport;

pub use smtp::SmtpMailer;
pub use transport::{Email, MailTransport};
