use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound mail delivery. Implementations either deliver the message or
/// return an error so the caller can roll back any OTP state it persisted.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Local dev mailer: logs the message instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.html,
            "mail delivery stub"
        );
        Ok(())
    }
}

/// Delivers mail through an HTTP mail-provider API.
pub struct HttpApiMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpApiMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpApiMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": message.to,
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await
            .context("mail api request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("mail api answered {}", response.status());
        }
        Ok(())
    }
}

/// Pick the mailer for this deployment: the HTTP API sender when credentials
/// are configured, the logging stub otherwise.
pub fn from_config(mail: &MailConfig) -> Arc<dyn Mailer> {
    match (&mail.api_url, &mail.api_key) {
        (Some(url), Some(key)) => Arc::new(HttpApiMailer::new(
            url.clone(),
            key.clone(),
            mail.from.clone(),
        )),
        _ => {
            warn!("MAIL_API_URL/MAIL_API_KEY not set; emails will be logged, not sent");
            Arc::new(LogMailer)
        }
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    /// Test mailer that records every message and can be told to fail.
    #[derive(Default)]
    pub struct MockMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub fail: bool,
    }

    impl MockMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Mailer for MockMailer {
        async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("mock delivery failure");
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
