//! Turns the four inbound Slack payload shapes into handler inputs.
//!
//! Payloads are read as JSON so the same code serves Socket Mode envelopes,
//! serialized slack-morphism events, and test fixtures.

use serde_json::Value;
use tracing::debug;

use super::handler::ActionPayload;
use super::parsing::{mentions_user, strip_user_mentions, v_array, v_str, v_str_any};
use crate::core::models::{TriggerEvent, TriggerSource};
use crate::errors::SlackError;
use crate::slack::response_builder::decode_button_value;

#[derive(Debug, Clone, Default)]
pub struct EventNormalizer {
    bot_user_id: Option<String>,
}

impl EventNormalizer {
    #[must_use]
    pub fn new(bot_user_id: Option<String>) -> Self {
        Self { bot_user_id }
    }

    /// Slash command payload (`command`, `text`, `channel_id`, `user_id`).
    ///
    /// # Errors
    ///
    /// Returns [`SlackError::ParseError`] when the channel or user is missing.
    pub fn from_slash_command(&self, payload: &Value) -> Result<TriggerEvent, SlackError> {
        let channel_id = v_str(payload, &["channel_id"])
            .ok_or_else(|| SlackError::ParseError("slash command without channel_id".to_string()))?;
        let actor_id = v_str(payload, &["user_id"])
            .ok_or_else(|| SlackError::ParseError("slash command without user_id".to_string()))?;

        Ok(TriggerEvent {
            source: TriggerSource::SlashCommand,
            channel_id: channel_id.to_string(),
            // Only present when the command was invoked from a thread.
            thread_ts: v_str(payload, &["thread_ts"]).map(str::to_string),
            text: v_str(payload, &["text"]).unwrap_or_default().trim().to_string(),
            actor_id: actor_id.to_string(),
            action_id: None,
            message_ts: None,
        })
    }

    /// Events API callback (or its bare `event`) for `app_mention` and `message`.
    ///
    /// Returns `None` for event types and messages that never trigger anything:
    /// bot posts, edits and other subtypes, blank text, and plain messages that also
    /// mention the bot (those arrive again as `app_mention`).
    #[must_use]
    pub fn from_push_event(&self, payload: &Value) -> Option<TriggerEvent> {
        let event = payload.get("event").unwrap_or(payload);
        let source = match v_str(event, &["type"])? {
            "app_mention" => TriggerSource::Mention,
            "message" => TriggerSource::Message,
            other => {
                debug!(event_type = other, "Ignoring push event");
                return None;
            }
        };

        if v_str(event, &["bot_id"]).is_some() {
            return None;
        }
        if source == TriggerSource::Message
            && v_str(event, &["subtype"]).is_some_and(|s| s != "thread_broadcast")
        {
            return None;
        }

        let raw_text = v_str(event, &["text"]).unwrap_or_default();
        if source == TriggerSource::Message
            && let Some(bot) = &self.bot_user_id
            && mentions_user(raw_text, bot)
        {
            return None;
        }
        let actor_id = v_str(event, &["user"])?;
        if self.bot_user_id.as_deref() == Some(actor_id) {
            return None;
        }

        let text = strip_user_mentions(raw_text);
        if source == TriggerSource::Message && text.is_empty() {
            return None;
        }

        Some(TriggerEvent {
            source,
            channel_id: v_str(event, &["channel"])?.to_string(),
            thread_ts: v_str(event, &["thread_ts"])
                .filter(|ts| !ts.is_empty())
                .map(str::to_string),
            text,
            actor_id: actor_id.to_string(),
            action_id: None,
            message_ts: v_str(event, &["ts"]).map(str::to_string),
        })
    }

    /// `block_actions` interaction: the first clicked action id and its context.
    ///
    /// The thread comes from the container, then the message, then the button value.
    #[must_use]
    pub fn from_interaction(&self, payload: &Value) -> Option<(String, ActionPayload)> {
        if v_str(payload, &["type"]) != Some("block_actions") {
            return None;
        }
        let action = v_array(payload, &["actions"])?.first()?;
        let action_id = v_str(action, &["action_id"])?;
        let from_value = v_str(action, &["value"]).and_then(decode_button_value);

        let channel_id = v_str_any(
            payload,
            &[&["channel", "id"], &["container", "channel_id"]],
        )
        .map(str::to_string)
        .or_else(|| from_value.as_ref().map(|t| t.channel_id.clone()))?;
        let thread_ts = v_str_any(
            payload,
            &[&["container", "thread_ts"], &["message", "thread_ts"]],
        )
        .map(str::to_string)
        .or_else(|| from_value.map(|t| t.thread_ts));
        let message_ts = v_str_any(payload, &[&["container", "message_ts"], &["message", "ts"]])?;

        Some((
            action_id.to_string(),
            ActionPayload {
                channel_id,
                thread_ts,
                message_ts: message_ts.to_string(),
                actor_id: v_str(payload, &["user", "id"])?.to_string(),
            },
        ))
    }
}
