use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use casewatch_common::error::AppError;
use casewatch_common::types::OutgoingEmail;

use crate::Mailer;

pub const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sender for the SendGrid v3 `mail/send` API.
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(client: Client, api_key: String, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
            endpoint: SENDGRID_SEND_URL.to_string(),
        }
    }

    /// Send through a different host (regional endpoint, local relay).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Build the JSON body for one message.
    pub fn payload<'a>(&'a self, email: &'a OutgoingEmail) -> MailSend<'a> {
        MailSend {
            personalizations: vec![Personalization {
                to: vec![Address { email: &email.to }],
            }],
            from: Address { email: &self.from },
            subject: &email.subject,
            content: vec![Content {
                kind: "text/html",
                value: &email.html_body,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await
            .map_err(|e| AppError::Send(format!("to {}: {}", email.to, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(AppError::Send(format!(
                "to {}: SendGrid returned {}: {}",
                email.to, status, body
            )));
        }

        tracing::info!(
            to = %email.to,
            status = status.as_u16(),
            "Email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let mailer = SendGridMailer::new(
            Client::new(),
            "SG.key".to_string(),
            "tracker@example.com".to_string(),
        );
        let email = OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "Status changed".to_string(),
            html_body: "<p>Approved</p>".to_string(),
        };

        assert_eq!(
            serde_json::to_value(mailer.payload(&email)).unwrap(),
            serde_json::json!({
                "personalizations": [{ "to": [{ "email": "alice@example.com" }] }],
                "from": { "email": "tracker@example.com" },
                "subject": "Status changed",
                "content": [{ "type": "text/html", "value": "<p>Approved</p>" }]
            })
        );
    }
}
