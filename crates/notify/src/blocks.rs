//! Block Kit message and modal types.
//!
//! Only the subset of Block Kit the diary renders is modelled: mrkdwn
//! sections, button rows, static selects and plain-text inputs, wrapped in
//! colored attachments.

use serde::Serialize;

/// Side-bar color of the title attachment.
pub const TITLE_ATTACHMENT_COLOR: &str = "#FFFFFF";

/// A Block Kit text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    /// Markdown-formatted text
    Mrkdwn { text: String },
    /// Plain text (labels, button captions, options)
    PlainText { text: String },
}

impl TextObject {
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    /// Raw text regardless of formatting.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Mrkdwn { text } | Self::PlainText { text } => text,
        }
    }
}

/// Option of a static select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
}

impl OptionObject {
    #[must_use]
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: TextObject::plain(text),
            value: value.into(),
        }
    }
}

/// Interactive element inside an `actions` or `input` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button {
        action_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "String::is_empty")]
        value: String,
    },
    StaticSelect {
        action_id: String,
        options: Vec<OptionObject>,
    },
    PlainTextInput {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
}

impl BlockElement {
    #[must_use]
    pub fn button(action_id: &str, caption: &str, value: &str) -> Self {
        Self::Button {
            action_id: action_id.to_string(),
            text: TextObject::plain(caption),
            value: value.to_string(),
        }
    }

    /// Action id of the element.
    #[must_use]
    pub fn action_id(&self) -> &str {
        match self {
            Self::Button { action_id, .. }
            | Self::StaticSelect { action_id, .. }
            | Self::PlainTextInput { action_id, .. } => action_id,
        }
    }
}

/// A layout block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: TextObject,
    },
    Actions {
        elements: Vec<BlockElement>,
    },
    Input {
        block_id: String,
        label: TextObject,
        element: BlockElement,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        optional: bool,
    },
}

impl Block {
    /// A mrkdwn section block.
    #[must_use]
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: TextObject::mrkdwn(text),
        }
    }
}

/// Legacy attachment carrying a colored side bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

/// Content of a posted or updated message.
///
/// Messages are laid out as two attachments: a white title attachment linking
/// to the incident, and a colored attachment holding the body blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageContent {
    /// Notification fallback text
    pub text: String,
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replace_original: bool,
}

impl MessageContent {
    /// Build message content from a title, its link, a side-bar color and body blocks.
    #[must_use]
    pub fn new(title: &str, title_link: &str, color: &str, blocks: Vec<Block>) -> Self {
        let title_attachment = Attachment {
            color: TITLE_ATTACHMENT_COLOR.to_string(),
            title: Some(title.to_string()),
            title_link: (!title_link.is_empty()).then(|| title_link.to_string()),
            blocks: vec![],
        };
        let body_attachment = Attachment {
            color: color.to_string(),
            title: None,
            title_link: None,
            blocks,
        };

        Self {
            text: title.to_string(),
            attachments: vec![title_attachment, body_attachment],
            replace_original: false,
        }
    }

    /// Mark the content as a replacement of the original message.
    #[must_use]
    pub fn replacing_original(mut self) -> Self {
        self.replace_original = true;
        self
    }

    /// Title of the title attachment.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.attachments.first().and_then(|a| a.title.as_deref())
    }

    /// Side-bar color of the body attachment.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.attachments.get(1).map(|a| a.color.as_str())
    }

    /// Body blocks of the colored attachment.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        self.attachments.get(1).map_or(&[], |a| a.blocks.as_slice())
    }

    /// Action ids of every button in the body.
    #[must_use]
    pub fn button_action_ids(&self) -> Vec<&str> {
        self.blocks()
            .iter()
            .filter_map(|b| match b {
                Block::Actions { elements } => Some(elements),
                _ => None,
            })
            .flatten()
            .map(BlockElement::action_id)
            .collect()
    }
}

/// A modal view opened with `views.open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    kind: &'static str,
    pub callback_id: String,
    /// Opaque context echoed back on submission
    pub private_metadata: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

impl ModalView {
    #[must_use]
    pub fn new(callback_id: &str, title: &str, private_metadata: String, blocks: Vec<Block>) -> Self {
        Self {
            kind: "modal",
            callback_id: callback_id.to_string(),
            private_metadata,
            title: TextObject::plain(title),
            submit: TextObject::plain("Submit"),
            close: TextObject::plain("Close"),
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_layout() {
        let content = MessageContent::new(
            "[New Relic:critical:] CPU high",
            "https://alerts.example/1",
            "#E01E5A",
            vec![
                Block::section("*Status :* open"),
                Block::Actions {
                    elements: vec![BlockElement::button("reason_btn", "Acknowledge", "")],
                },
            ],
        );

        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value["attachments"][0],
            json!({
                "color": "#FFFFFF",
                "title": "[New Relic:critical:] CPU high",
                "title_link": "https://alerts.example/1"
            })
        );
        assert_eq!(value["attachments"][1]["color"], "#E01E5A");
        assert_eq!(
            value["attachments"][1]["blocks"][0],
            json!({"type": "section", "text": {"type": "mrkdwn", "text": "*Status :* open"}})
        );
        assert_eq!(
            value["attachments"][1]["blocks"][1]["elements"][0],
            json!({
                "type": "button",
                "action_id": "reason_btn",
                "text": {"type": "plain_text", "text": "Acknowledge"}
            })
        );
        assert!(value.get("replace_original").is_none());
        assert_eq!(content.button_action_ids(), vec!["reason_btn"]);
    }

    #[test]
    fn test_empty_title_link_is_omitted() {
        let content = MessageContent::new("title", "", "#2EB67D", vec![]).replacing_original();
        let value = serde_json::to_value(&content).unwrap();
        assert!(value["attachments"][0].get("title_link").is_none());
        assert_eq!(value["replace_original"], true);
    }

    #[test]
    fn test_modal_serialization() {
        let view = ModalView::new(
            "ack_reason_form",
            "Incident Diary",
            "C1:1700000000.000100".to_string(),
            vec![Block::Input {
                block_id: "reason_other".to_string(),
                label: TextObject::plain("Other Reason"),
                element: BlockElement::PlainTextInput {
                    action_id: "reason_other".to_string(),
                    placeholder: None,
                },
                optional: true,
            }],
        );

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["type"], "modal");
        assert_eq!(value["private_metadata"], "C1:1700000000.000100");
        assert_eq!(value["blocks"][0]["type"], "input");
        assert_eq!(value["blocks"][0]["optional"], true);
        assert_eq!(value["blocks"][0]["element"]["type"], "plain_text_input");
    }
}
