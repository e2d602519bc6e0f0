//! Third-party services the portal calls over HTTP: mail delivery and a
//! chat-completion API. Both are reached through traits so tests can swap
//! them out.

mod llm;
mod mail;

pub use llm::{CompletionClient, OpenRouterClient};
pub use mail::{HttpMailer, LogMailer, MailMessage, Mailer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Request to {0} timed out")]
    Timeout(&'static str),
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}

impl ExternalError {
    fn from_reqwest(service: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExternalError::Timeout(service)
        } else {
            ExternalError::Upstream {
                service,
                message: e.to_string(),
            }
        }
    }
}
