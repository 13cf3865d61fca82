//! Chat gateway for the incident diary.
//!
//! This crate is the boundary between the diary and the chat platform. It
//! provides the [`ChatGateway`] trait (post, update, reply in thread, open
//! modal), a Slack Web API implementation, the Block Kit types messages are
//! built from, and the inbound interactivity payloads Slack posts back.
//!
//! # Usage
//!
//! ```no_run
//! use diary_notify::{Block, ChatGateway, MessageContent, SlackGateway};
//!
//! # async fn run() -> Result<(), diary_notify::ChannelError> {
//! let gateway = SlackGateway::new("xoxb-token");
//! let content = MessageContent::new(
//!     "[New Relic:critical:] CPU high",
//!     "https://alerts.example/1",
//!     "#E01E5A",
//!     vec![Block::section("*Status :* open")],
//! );
//! let root = gateway.post_message("C0123", &content, None).await?;
//! gateway
//!     .post_message("C0123", &content, Some(root.ts.as_str()))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `SLACK_BOT_TOKEN`: bot token used by [`SlackGateway::from_env`]
//! - `SLACK_API_URL`: API base URL override (defaults to `https://slack.com/api`)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blocks;
pub mod channels;
pub mod error;
pub mod interaction;

pub use blocks::{
    Attachment, Block, BlockElement, MessageContent, ModalView, OptionObject, TextObject,
};
pub use channels::slack::SlackGateway;
pub use channels::{ChatGateway, PostedMessage};
pub use error::ChannelError;
pub use interaction::{
    BlockActionsPayload, FieldValue, InteractionPayload, SelectedOption, TriggeredAction,
    ViewState, ViewSubmissionPayload,
};
