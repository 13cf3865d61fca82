//! The acknowledgment reason form.

use diary_notify::{Block, BlockElement, ModalView, OptionObject, TextObject, ViewState};

/// Callback id of the reason form, echoed back on submission.
pub const ACK_FORM_CALLBACK_ID: &str = "ack_reason_form";

pub const REASON_OPTION_BLOCK: &str = "reason_option";
pub const REASON_OTHER_BLOCK: &str = "reason_other";

/// Option value that asks for a free-text reason instead.
pub const OTHERS_OPTION: &str = "others";

const FORM_TITLE: &str = "Cloud Platform Diary";
const FORM_HEADER: &str = "Please select the cause of the warning";

/// Build the reason form for a message.
///
/// `private_metadata` carries `"<channel>:<message_ts>"` so the submission
/// can find the message again.
#[must_use]
pub fn reason_form(options: &[String], channel: &str, message_ts: &str) -> ModalView {
    let mut select_options: Vec<OptionObject> = options
        .iter()
        .map(|option| OptionObject::new(option.as_str(), option.as_str()))
        .collect();
    select_options.push(OptionObject::new(
        OTHERS_OPTION,
        "others (provide the reason in the next field)",
    ));

    let blocks = vec![
        Block::section(FORM_HEADER),
        Block::Input {
            block_id: REASON_OPTION_BLOCK.to_string(),
            label: TextObject::plain("Reason"),
            element: BlockElement::StaticSelect {
                action_id: REASON_OPTION_BLOCK.to_string(),
                options: select_options,
            },
            optional: false,
        },
        Block::Input {
            block_id: REASON_OTHER_BLOCK.to_string(),
            label: TextObject::plain("Other Reason"),
            element: BlockElement::PlainTextInput {
                action_id: REASON_OTHER_BLOCK.to_string(),
                placeholder: Some(TextObject::plain(
                    "Only fill this if you select others in Reason",
                )),
            },
            optional: true,
        },
    ];

    ModalView::new(
        ACK_FORM_CALLBACK_ID,
        FORM_TITLE,
        format!("{channel}:{message_ts}"),
        blocks,
    )
}

/// Value chosen in a submitted form.
///
/// The last non-empty free-text value, overridden by the last non-empty
/// selected option. Fields are visited in block id, then action id order.
#[must_use]
pub fn chosen_value(state: &ViewState) -> Option<String> {
    let mut text = None;
    let mut selected = None;

    for field in state.values.values().flat_map(|fields| fields.values()) {
        if let Some(value) = field.value.as_deref().filter(|v| !v.trim().is_empty()) {
            text = Some(value.to_string());
        }
        if let Some(option) = field
            .selected_option
            .as_ref()
            .filter(|o| !o.value.trim().is_empty())
        {
            selected = Some(option.value.clone());
        }
    }

    selected.or(text)
}
