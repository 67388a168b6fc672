//! Signup notifications
//!
//! When an account is created the backend posts an announcement to a chat
//! channel. `SlackNotifier` does this through Slack's `chat.postMessage`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::identity::Identity;

/// Receives new-account events
#[async_trait]
pub trait SignupNotifier: Send + Sync {
    async fn notify_signup(&self, identity: &Identity) -> Result<(), NotifyError>;
}

/// Notifier that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl SignupNotifier for NoopNotifier {
    async fn notify_signup(&self, _identity: &Identity) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    mrkdwn: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts signup announcements to a Slack channel
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    endpoint: String,
    channel: String,
    token: String,
}

impl SlackNotifier {
    pub fn new(
        endpoint: impl Into<String>,
        channel: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            channel: channel.into(),
            token: token.into(),
        }
    }

    /// Build a notifier from configuration
    ///
    /// Fails with `NotConfigured` unless both channel and token are set.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        match (&config.channel, &config.token) {
            (Some(channel), Some(token)) => Ok(Self::new(&config.endpoint, channel, token)),
            _ => Err(NotifyError::NotConfigured),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Post `text` to the configured channel
    pub async fn post(&self, text: &str) -> Result<(), NotifyError> {
        let body = PostMessage {
            channel: &self.channel,
            text,
            mrkdwn: true,
        };

        let response: PostMessageResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.ok {
            let reason = response.error.unwrap_or_else(|| "unknown error".into());
            error!(channel = %self.channel, "Slack API error: {}", reason);
            return Err(NotifyError::Rejected(reason));
        }

        Ok(())
    }
}

#[async_trait]
impl SignupNotifier for SlackNotifier {
    async fn notify_signup(&self, identity: &Identity) -> Result<(), NotifyError> {
        let text = signup_message(identity, Utc::now());
        self.post(&text).await?;

        info!(
            uid = %identity.uid,
            channel = %self.channel,
            "signup notification sent"
        );
        Ok(())
    }
}

/// Format the announcement for a new account
pub fn signup_message(identity: &Identity, registered_at: DateTime<Utc>) -> String {
    let email = identity.email.as_deref().unwrap_or("No email provided");
    let name = identity
        .display_name
        .as_deref()
        .unwrap_or("No name provided");
    let uid = if identity.uid.is_empty() {
        "Unknown ID"
    } else {
        identity.uid.as_str()
    };

    format!(
        "🎉 *New User Registration!*\n\n\
         📧 *Email:* {}\n\
         👤 *Name:* {}\n\
         🆔 *User ID:* {}\n\
         ⏰ *Registration Time:* {}\n\n\
         Welcome to the platform! 🚀",
        email,
        name,
        uid,
        registered_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signup_message() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let identity = Identity::new("u-42")
            .with_email("ada@example.com")
            .with_display_name("Ada");

        let text = signup_message(&identity, at);
        assert!(text.starts_with("🎉 *New User Registration!*"));
        assert!(text.contains("*Email:* ada@example.com"));
        assert!(text.contains("*Name:* Ada"));
        assert!(text.contains("*User ID:* u-42"));
        assert!(text.contains("2025-01-02T03:04:05.000Z"));
    }

    #[test]
    fn test_signup_message_placeholders() {
        let text = signup_message(&Identity::new(""), Utc::now());
        assert!(text.contains("No email provided"));
        assert!(text.contains("No name provided"));
        assert!(text.contains("Unknown ID"));
    }

    #[test]
    fn test_from_config_requires_channel_and_token() {
        let mut config = NotifyConfig::default();
        assert!(matches!(
            SlackNotifier::from_config(&config),
            Err(NotifyError::NotConfigured)
        ));

        config.channel = Some("C123".into());
        config.token = Some("xoxb-test".into());
        let notifier = SlackNotifier::from_config(&config).unwrap();
        assert_eq!(notifier.channel(), "C123");
    }

    #[tokio::test]
    async fn test_noop_notifier() {
        assert!(NoopNotifier
            .notify_signup(&Identity::new("u1"))
            .await
            .is_ok());
    }
}
