//! Outbound transactional mail and the username-reminder endpoint handler.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::MailSettings;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail API key is not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Mail API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl EmailMessage {
    pub fn username_reminder(email: &str, username: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "Your Account Username".to_string(),
            text: format!("Your username is: {}", username),
            html: format!("<strong>Your username is:</strong> {}", username),
        }
    }

    pub fn password_reset(email: &str, username: &str, token: &str, valid_minutes: i64) -> Self {
        Self {
            to: email.to_string(),
            subject: "Reset your password".to_string(),
            text: format!(
                "Hi {username}, use this code to reset your password: {token}\n\
                 It expires in {valid_minutes} minutes."
            ),
            html: format!(
                "<p>Hi {username}, use this code to reset your password:</p>\
                 <p><strong>{token}</strong></p><p>It expires in {valid_minutes} minutes.</p>"
            ),
        }
    }
}

pub trait Mailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Sends through the SendGrid v3 `mail/send` API
pub struct SendGridMailer {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl SendGridMailer {
    pub fn new(api_url: String, api_key: String, sender: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_url,
            api_key,
            sender,
        }
    }

    /// Build from config, reading the key from the configured environment variable
    pub fn from_settings(settings: &MailSettings) -> Result<Self, MailError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| MailError::MissingApiKey(settings.api_key_env.clone()))?;
        Ok(Self::new(settings.api_url.clone(), api_key, settings.sender.clone()))
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.sender },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        })
    }
}

impl Mailer for SendGridMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(to = %message.to, subject = %message.subject, "mail sent");
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(MailError::Rejected { status: status.as_u16(), body })
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsernameEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Status code plus JSON body, independent of any HTTP server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl MailResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Handle a `{email, username}` request by mailing the username to the address
pub fn handle_username_email(body: &str, mailer: &dyn Mailer) -> MailResponse {
    let request: UsernameEmailRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "malformed username email request");
            return MailResponse {
                status: 400,
                body: json!({ "error": "Invalid JSON body" }),
            };
        }
    };

    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let username = request.username.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() || username.is_empty() {
        return MailResponse {
            status: 400,
            body: json!({ "error": "Missing required fields" }),
        };
    }

    match mailer.send(&EmailMessage::username_reminder(email, username)) {
        Ok(()) => MailResponse {
            status: 200,
            body: json!({ "success": true }),
        },
        Err(e) => {
            tracing::error!(error = %e, "error sending username email");
            MailResponse {
                status: 500,
                body: json!({ "error": "Failed to send username email", "details": e.to_string() }),
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records messages instead of sending them; optionally fails every send
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: RefCell<Vec<EmailMessage>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }
    }

    impl Mailer for RecordingMailer {
        fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Rejected { status: 503, body: "unavailable".into() });
            }
            self.sent.borrow_mut().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;

    #[test]
    fn sends_username_and_answers_success() {
        let mailer = RecordingMailer::default();
        let response =
            handle_username_email(r#"{"email":"ana@example.com","username":"ana"}"#, &mailer);

        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({ "success": true }));
        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
        assert_eq!(sent[0].subject, "Your Account Username");
        assert_eq!(sent[0].text, "Your username is: ana");
    }

    #[test]
    fn missing_fields_are_a_bad_request() {
        let mailer = RecordingMailer::default();
        let response = handle_username_email(r#"{"email":"ana@example.com"}"#, &mailer);

        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], "Missing required fields");
        assert!(mailer.sent.borrow().is_empty());

        let response = handle_username_email("not json", &mailer);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn send_failure_is_a_server_error_with_details() {
        let mailer = RecordingMailer::failing();
        let response =
            handle_username_email(r#"{"email":"ana@example.com","username":"ana"}"#, &mailer);

        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"], "Failed to send username email");
        assert!(response.body["details"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn sendgrid_payload_carries_both_bodies() {
        let mailer = SendGridMailer::new("http://localhost".into(), "key".into(), "from@x.io".into());
        let payload = mailer.payload(&EmailMessage::username_reminder("to@x.io", "ana"));

        assert_eq!(payload["from"]["email"], "from@x.io");
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "to@x.io");
        assert_eq!(payload["content"].as_array().unwrap().len(), 2);
    }
}
