//! Block Kit payloads and user-facing texts for the confirmation prompt.

use serde_json::{Value, json};

use crate::core::models::ThreadRef;

/// `action_id` of the "Yes, create a canvas" button.
pub const CONFIRM_ACTION_ID: &str = "create_canvas_from_mention_yes";

/// `action_id` of the "No, cancel" button.
pub const CANCEL_ACTION_ID: &str = "create_canvas_from_mention_no";

pub const PROMPT_FALLBACK_TEXT: &str = "Create a canvas from this thread?";
pub const PROMPT_CONFIRMED_TEXT: &str = "✅ Confirmed. Creating a canvas from this thread…";
pub const PROMPT_CANCELLED_TEXT: &str = "👍 Canvas creation cancelled.";
pub const PROMPT_EXPIRED_TEXT: &str =
    "⌛ This prompt has expired. Mention me again to create a canvas from this thread.";
pub const PROMPT_UNKNOWN_TEXT: &str =
    "This prompt is no longer active. Mention me again to create a canvas from this thread.";
pub const ALREADY_PENDING_TEXT: &str =
    "A confirmation is already pending for this thread. Use the buttons on the earlier prompt.";

/// Encode the thread identity into a button `value` (`channel|thread_ts`).
#[must_use]
pub fn encode_button_value(thread: &ThreadRef) -> String {
    format!("{}|{}", thread.channel_id, thread.thread_ts)
}

/// Inverse of [`encode_button_value`].
#[must_use]
pub fn decode_button_value(value: &str) -> Option<ThreadRef> {
    let mut parts = value.split('|');
    let channel = parts.next().filter(|c| !c.is_empty())?;
    let thread_ts = parts.next().filter(|t| !t.is_empty())?;
    Some(ThreadRef::new(channel, thread_ts))
}

/// Build the Yes/No confirmation prompt posted for ambiguous mentions.
///
/// The prompt warns that the operation consumes model tokens, mirroring the
/// confirmation shown before any run that was not explicitly requested.
#[must_use]
pub fn build_confirmation_blocks(thread: &ThreadRef) -> Value {
    let value = encode_button_value(thread);
    json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": "📝 Turn this thread into a canvas?\n\n⚠️ This sends the thread to the AI service and consumes tokens."
            }
        },
        {
            "type": "actions",
            "block_id": "create_canvas_confirmation",
            "elements": [
                {
                    "type": "button",
                    "text": { "type": "plain_text", "text": "Yes - create canvas", "emoji": true },
                    "style": "primary",
                    "action_id": CONFIRM_ACTION_ID,
                    "value": value
                },
                {
                    "type": "button",
                    "text": { "type": "plain_text", "text": "No - cancel", "emoji": true },
                    "action_id": CANCEL_ACTION_ID,
                    "value": value
                }
            ]
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_blocks_carry_both_actions_and_thread() {
        let thread = ThreadRef::new("C1", "1700000000.000100");
        let blocks = build_confirmation_blocks(&thread);

        let elements = blocks[1]["elements"].as_array().cloned().unwrap_or_default();
        let ids: Vec<&str> = elements
            .iter()
            .filter_map(|e| e["action_id"].as_str())
            .collect();
        assert_eq!(ids, vec![CONFIRM_ACTION_ID, CANCEL_ACTION_ID]);
        assert_eq!(
            elements[0]["value"].as_str().and_then(decode_button_value),
            Some(thread)
        );
    }

    #[test]
    fn decode_rejects_incomplete_values() {
        assert_eq!(decode_button_value("C1|"), None);
        assert_eq!(decode_button_value(""), None);
    }
}
