//! HTML templates for the notification emails.
//!
//! Each function renders a complete email for a recipient that is
//! already known to have an address.

use crate::transport::Email;

const FOOTER: &str = "Loopline - Stay in the Loop<br>\
    &copy; 2026 Loopline. All rights reserved.";

fn wrap(inner: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; padding: 20px; max-width: 600px; \
         margin: 0 auto; border: 1px solid #e0e0e0; border-radius: 8px;\">\
         {inner}\
         <hr style=\"border: none; border-top: 1px solid #e0e0e0; margin: 20px 0;\">\
         <p style=\"color: #888; font-size: 12px; text-align: center; margin: 0;\">{FOOTER}</p>\
         </div>"
    )
}

fn button(href: &str, color: &str, label: &str) -> String {
    format!(
        "<p style=\"text-align: center; margin-bottom: 20px;\">\
         <a href=\"{href}\" style=\"background-color: {color}; color: white; \
         padding: 10px 20px; text-decoration: none; border-radius: 5px; \
         display: inline-block;\">{label}</a></p>"
    )
}

/// The initial connection-request email.
pub fn connection_request(
    to_email: &str,
    to_name: &str,
    from_name: &str,
    from_username: &str,
    frontend_url: &str,
) -> Email {
    let link = button(&format!("{frontend_url}/connections"), "#10b981", "View Request");
    let inner = format!(
        "<div style=\"text-align: center; margin-bottom: 20px;\">\
         <h2 style=\"color: #333; margin: 0 0 10px 0;\">Hi {to_name},</h2></div>\
         <div style=\"background-color: #f9f9f9; padding: 15px; border-radius: 5px; \
         margin-bottom: 20px;\">\
         <p style=\"margin: 0 0 10px 0; color: #555;\"><strong>{from_name}</strong> \
         (@{from_username}) sent you a connection request</p></div>\
         {link}"
    );
    Email {
        to: to_email.to_string(),
        subject: "New Connection Request".to_string(),
        html_body: wrap(&inner),
    }
}

/// The 24-hour reminder for a still-pending connection request.
pub fn connection_reminder(
    to_email: &str,
    to_name: &str,
    from_name: &str,
    from_username: &str,
    frontend_url: &str,
) -> Email {
    let link = button(
        &format!("{frontend_url}/connections"),
        "#10b981",
        "Accept or Reject",
    );
    let inner = format!(
        "<div style=\"text-align: center; margin-bottom: 20px;\">\
         <h2 style=\"color: #333; margin: 0 0 10px 0;\">Hi {to_name},</h2></div>\
         <div style=\"background-color: #fff3cd; padding: 15px; border-radius: 5px; \
         margin-bottom: 20px; border-left: 4px solid #ffc107;\">\
         <p style=\"margin: 0 0 10px 0; color: #555;\">You have a pending connection \
         request from <strong>{from_name}</strong> (@{from_username})</p>\
         <p style=\"margin: 0; color: #555; font-size: 14px;\">This request was sent \
         24 hours ago.</p></div>\
         {link}"
    );
    Email {
        to: to_email.to_string(),
        subject: "Reminder: Connection Request Pending".to_string(),
        html_body: wrap(&inner),
    }
}

/// The daily unseen-message digest.
pub fn unseen_digest(to_email: &str, to_name: &str, count: i64, frontend_url: &str) -> Email {
    let noun = if count == 1 {
        "unseen message"
    } else {
        "unseen messages"
    };
    let link = button(&format!("{frontend_url}/messages"), "#2196F3", "View Messages");
    let inner = format!(
        "<div style=\"text-align: center; margin-bottom: 20px;\">\
         <h2 style=\"color: #333; margin: 0 0 10px 0;\">Hi {to_name},</h2></div>\
         <div style=\"background-color: #e3f2fd; padding: 15px; border-radius: 5px; \
         margin-bottom: 20px; border-left: 4px solid #2196F3;\">\
         <p style=\"margin: 0; color: #1976d2; font-size: 16px; font-weight: bold;\">\
         You have {count} {noun}</p></div>\
         {link}"
    );
    Email {
        to: to_email.to_string(),
        subject: format!("You have {count} {noun}"),
        html_body: wrap(&inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_email_names_the_requester() {
        let email = connection_request(
            "aki@example.com",
            "Aki",
            "Mika Tanaka",
            "mika",
            "https://app.example.com",
        );
        assert_eq!(email.to, "aki@example.com");
        assert_eq!(email.subject, "New Connection Request");
        assert!(email.html_body.contains("Mika Tanaka"));
        assert!(email.html_body.contains("@mika"));
        assert!(email
            .html_body
            .contains("https://app.example.com/connections"));
    }

    #[test]
    fn reminder_email_mentions_pending_request() {
        let email = connection_reminder(
            "aki@example.com",
            "Aki",
            "Mika Tanaka",
            "mika",
            "https://app.example.com",
        );
        assert_eq!(email.subject, "Reminder: Connection Request Pending");
        assert!(email.html_body.contains("pending connection"));
        assert!(email.html_body.contains("24 hours ago"));
    }

    #[test]
    fn digest_subject_pluralizes() {
        let one = unseen_digest("aki@example.com", "Aki", 1, "https://app.example.com");
        assert_eq!(one.subject, "You have 1 unseen message");

        let three = unseen_digest("aki@example.com", "Aki", 3, "https://app.example.com");
        assert_eq!(three.subject, "You have 3 unseen messages");
        assert!(three.html_body.contains("https://app.example.com/messages"));
    }
}
