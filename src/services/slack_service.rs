use serde_json::{json, Value};

use crate::config::EnvReader;
use crate::error::Result;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Thin wrapper over the Slack Web API for service notifications.
///
/// Sends are fire-and-forget: a missing channel, transport failure, or
/// rejected API call is logged and swallowed, never surfaced to the caller.
/// A disabled wrapper accepts messages and drops them, so call sites stay
/// identical across environments.
#[derive(Clone)]
pub struct SlackService {
    client: reqwest::Client,
    auth_token: String,
    enabled: bool,
    slack_channel: Option<String>,
}

impl SlackService {
    /// Create a new SlackService instance.
    ///
    /// `slack_channel` is the default target; individual sends may override.
    pub fn new(auth_token: impl Into<String>, enabled: bool, slack_channel: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_token: auth_token.into(),
            enabled,
            slack_channel,
        }
    }

    /// Build from `SLACK_TOKEN`, `SLACK_ENABLED` and `SLACK_CHANNEL`.
    pub fn from_env() -> Result<Self> {
        let reader = EnvReader::from_env()?;

        Ok(Self::new(
            reader.get("SLACK_TOKEN:__EMPTY__")?,
            reader.get_bool("SLACK_ENABLED:__FALSE__")?,
            reader.get_opt("SLACK_CHANNEL:__NONE__")?,
        ))
    }

    /// Send a batch of messages as one post, joined with newlines.
    pub async fn post_messages(&self, messages: &[&str], slack_channel: Option<&str>) {
        self.post_message(&messages.join("\n"), slack_channel).await;
    }

    /// Send a message to the given channel, or the configured default.
    pub async fn post_message(&self, message: &str, slack_channel: Option<&str>) {
        let channel = match slack_channel.or(self.slack_channel.as_deref()) {
            Some(channel) => channel,
            None => {
                tracing::error!("Error sending message, no slack channel provided");
                return;
            }
        };

        if !self.enabled {
            tracing::debug!("Slack messaging disabled, ignoring slack message");
            return;
        }

        let response = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.auth_token)
            .json(&json!({
                "channel": channel,
                "text": message,
            }))
            .send()
            .await;

        let body: Value = match response {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Error sending message to channel {}: {}", channel, e);
                    return;
                }
            },
            Err(e) => {
                tracing::error!("Error sending message to channel {}: {}", channel, e);
                return;
            }
        };

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            tracing::error!(
                "Error sending message to channel {}: response {}",
                channel,
                body
            );
        }
    }
}
