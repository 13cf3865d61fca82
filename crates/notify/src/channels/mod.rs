//! Chat gateway implementations.

pub mod slack;

use async_trait::async_trait;

use crate::blocks::{MessageContent, ModalView};
use crate::error::ChannelError;

/// Identifier of a message returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// Channel the message lives in, as reported by the platform
    pub channel: String,
    /// Message timestamp (Slack's message id)
    pub ts: String,
}

/// Trait for chat platforms the diary can talk to.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Get the name of this gateway.
    fn name(&self) -> &'static str;

    /// Post a message, optionally as a threaded reply under `thread_ts`.
    async fn post_message(
        &self,
        channel: &str,
        content: &MessageContent,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, ChannelError>;

    /// Replace the content of an existing message.
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &MessageContent,
    ) -> Result<PostedMessage, ChannelError>;

    /// Open a modal form for the user behind `trigger_id`.
    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), ChannelError>;
}
