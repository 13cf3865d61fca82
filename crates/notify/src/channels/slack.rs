//! Slack Web API gateway.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ChatGateway, PostedMessage};
use crate::blocks::{MessageContent, ModalView};
use crate::error::ChannelError;

/// Environment variable for the Slack bot token.
const ENV_SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";

/// Environment variable overriding the Slack API base URL.
const ENV_SLACK_API_URL: &str = "SLACK_API_URL";

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Fallback wait when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Slack Web API gateway authenticated with a bot token.
pub struct SlackGateway {
    token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl SlackGateway {
    /// Create a new Slack gateway from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let token = std::env::var(ENV_SLACK_BOT_TOKEN).ok();
        let base_url =
            std::env::var(ENV_SLACK_API_URL).unwrap_or_else(|_| DEFAULT_SLACK_API_URL.to_string());

        if token.is_some() {
            debug!("Slack gateway configured");
        } else {
            debug!("Slack gateway disabled (SLACK_BOT_TOKEN not set)");
        }

        Self {
            token,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Create a Slack gateway with a specific bot token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            base_url: DEFAULT_SLACK_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the gateway at a different API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check if a bot token is configured.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Call a Web API method and return the decoded response.
    async fn call(&self, method: &'static str, body: &Value) -> Result<Value, ChannelError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_SLACK_BOT_TOKEN.to_string()))?;

        debug!(channel = "slack", method, "Calling Slack API");

        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(channel = "slack", method, retry_after_secs, "Slack rate limit hit");
            return Err(ChannelError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                channel = "slack",
                method,
                status = %status,
                body = %body,
                "Slack API request failed"
            );
            return Err(ChannelError::Other(format!("Slack returned {status}: {body}")));
        }

        let parsed: Value = response.json().await?;
        if parsed.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = parsed
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            warn!(channel = "slack", method, error = %error, "Slack API returned an error");
            return Err(ChannelError::Api { method, error });
        }

        Ok(parsed)
    }

    /// Extract `(channel, ts)` from a `chat.*` response.
    fn posted_message(method: &'static str, response: &Value) -> Result<PostedMessage, ChannelError> {
        let field = |name: &str| {
            response
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ChannelError::Api {
                    method,
                    error: format!("response missing `{name}`"),
                })
        };

        Ok(PostedMessage {
            channel: field("channel")?,
            ts: field("ts")?,
        })
    }
}

#[async_trait]
impl ChatGateway for SlackGateway {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn post_message(
        &self,
        channel: &str,
        content: &MessageContent,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, ChannelError> {
        let mut body = serde_json::to_value(content)?;
        body["channel"] = json!(channel);
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }

        let response = self.call("chat.postMessage", &body).await?;
        Self::posted_message("chat.postMessage", &response)
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &MessageContent,
    ) -> Result<PostedMessage, ChannelError> {
        let mut body = serde_json::to_value(content)?;
        body["channel"] = json!(channel);
        body["ts"] = json!(ts);

        let response = self.call("chat.update", &body).await?;
        Self::posted_message("chat.update", &response)
    }

    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), ChannelError> {
        let body = json!({ "trigger_id": trigger_id, "view": view });
        self.call("views.open", &body).await?;
        Ok(())
    }
}
