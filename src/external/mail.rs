use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::ExternalError;
use crate::config::MailConfig;

#[derive(Debug, Clone, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outgoing mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), ExternalError>;
}

/// Delivers mail through an HTTP relay that accepts `{from, to, subject, text}`.
pub struct HttpMailer {
    api_url: String,
    api_key: Option<String>,
    client: Client,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: &str, config: &MailConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_url: api_url.to_string(),
            api_key: config.api_key.clone(),
            client,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), ExternalError> {
        let mut request = self.client.post(&self.api_url).json(&RelayRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
        });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ExternalError::from_reqwest("mail relay", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExternalError::Upstream {
                service: "mail relay",
                message: format!("status {status}: {body}"),
            });
        }

        tracing::debug!(subject = %message.subject, "Mail handed to relay");
        Ok(())
    }
}

/// Used when no relay is configured. Drops the message after logging who it was for.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), ExternalError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Mail delivery is not configured, message dropped"
        );
        Ok(())
    }
}
